//! Unit Test: Enrichment Properties
//!
//! 公開APIレベルでのエンリッチ特性をテスト

use premd::reconciler::{enrich_all, enrich_one, RuntimeObservation};
use premd::runtime::{LocalImage, RunningContainer};
use prem_daemon_common::types::{ModelInfo, ServiceDescriptor};

fn descriptor(id: &str, image: &str, port: u16) -> ServiceDescriptor {
    ServiceDescriptor {
        id: id.to_string(),
        name: id.to_string(),
        description: None,
        interfaces: vec!["chat".to_string()],
        docker_image: image.to_string(),
        default_port: port,
        model_info: ModelInfo::default(),
        volume_path: None,
    }
}

fn image(tags: &[&str]) -> LocalImage {
    LocalImage {
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

#[test]
fn test_blank_host_yields_base_state() {
    // ローカルイメージ無し・稼働コンテナ無しのホスト
    let descriptor = descriptor("svc1", "repo/x:1.0", 8000);
    let observation = RuntimeObservation::new(vec![], vec![], 4096, 8192);

    let state = enrich_one(&descriptor, &observation);
    assert!(!state.running);
    assert!(!state.downloaded);
    assert!(state.enough_memory);
    assert!(state.enough_system_memory);
    assert!(state.needs_update.is_none());
}

#[test]
fn test_exact_local_tag_resolves_image() {
    let descriptor = descriptor("svc1", "repo/x:1.0", 8000);
    let observation =
        RuntimeObservation::new(vec![], vec![image(&["repo/x:1.0"])], 4096, 8192);

    let state = enrich_one(&descriptor, &observation);
    assert!(state.downloaded);
    assert_eq!(state.needs_update, Some(false));
    assert_eq!(state.downloaded_docker_image.as_deref(), Some("repo/x:1.0"));
}

#[test]
fn test_repository_match_ignores_tag() {
    // 同リポジトリの別タグのみが存在 → downloaded だが要更新
    let descriptor = descriptor("svc1", "repo/x:2.0", 8000);
    let observation =
        RuntimeObservation::new(vec![], vec![image(&["repo/x:1.9"])], 4096, 8192);

    let state = enrich_one(&descriptor, &observation);
    assert!(state.downloaded);
    assert_eq!(state.needs_update, Some(true));
    assert!(state.downloaded_docker_image.is_none());
}

#[test]
fn test_memory_requirement_uses_byte_unit() {
    // 要求量はバイト、観測値はMiB。8 GiB 要求に対して 7 GiB 空きは不足。
    let mut descriptor = descriptor("svc1", "repo/x:1.0", 8000);
    descriptor.model_info.memory_requirements = Some(8 * 1024 * 1024 * 1024);

    let short = RuntimeObservation::new(vec![], vec![], 7168, 16384);
    assert!(!enrich_one(&descriptor, &short).enough_memory);

    let exact = RuntimeObservation::new(vec![], vec![], 8192, 16384);
    assert!(enrich_one(&descriptor, &exact).enough_memory);
}

#[test]
fn test_bulk_enrich_filters_by_interface() {
    let chat = descriptor("chat-svc", "repo/c:1.0", 8000);
    let mut vision = descriptor("vision-svc", "repo/v:1.0", 8001);
    vision.interfaces = vec!["vision".to_string()];
    let observation = RuntimeObservation::new(vec![], vec![], 4096, 8192);

    let filtered = enrich_all(&[chat, vision], Some("vision"), &observation);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id(), "vision-svc");
}

#[test]
fn test_enrichment_output_is_stable() {
    let descriptor = descriptor("svc1", "repo/x:1.0", 8000);
    let observation = RuntimeObservation::new(
        vec![RunningContainer {
            name: "svc1".to_string(),
            host_port: Some(8001),
            volume_name: Some("prem-svc1-data".to_string()),
        }],
        vec![image(&["repo/x:1.0"])],
        4096,
        8192,
    );

    let first = serde_json::to_vec(&enrich_one(&descriptor, &observation)).unwrap();
    let second = serde_json::to_vec(&enrich_one(&descriptor, &observation)).unwrap();
    assert_eq!(first, second);
}
