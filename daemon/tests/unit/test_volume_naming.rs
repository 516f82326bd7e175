//! Unit Test: Volume Naming and Image Reference Parsing
//!
//! ボリューム名の決定性とイメージ参照の分解をテスト

use prem_daemon_common::types::{ModelInfo, ServiceDescriptor};

fn descriptor(id: &str, image: &str) -> ServiceDescriptor {
    ServiceDescriptor {
        id: id.to_string(),
        name: id.to_string(),
        description: None,
        interfaces: vec![],
        docker_image: image.to_string(),
        default_port: 8000,
        model_info: ModelInfo::default(),
        volume_path: None,
    }
}

#[test]
fn test_volume_name_is_deterministic() {
    // id "whisper" のボリューム名は常に "prem-whisper-data"
    let whisper = descriptor("whisper", "repo/whisper:1.0");
    assert_eq!(whisper.volume_name(), "prem-whisper-data");
    assert_eq!(whisper.volume_name(), whisper.volume_name());
}

#[test]
fn test_volume_name_embeds_service_id() {
    for id in ["vicuna-7b", "stable-diffusion", "a"] {
        let expected = format!("prem-{id}-data");
        assert_eq!(descriptor(id, "repo/x:1").volume_name(), expected);
    }
}

#[test]
fn test_image_repository_is_prefix_before_first_colon() {
    assert_eq!(
        descriptor("s", "ghcr.io/premai-io/whisper:1.0.1").image_repository(),
        "ghcr.io/premai-io/whisper"
    );
    assert_eq!(descriptor("s", "repo/x").image_repository(), "repo/x");
    // タグ中にさらに `:` があっても最初の `:` で切る
    assert_eq!(descriptor("s", "repo/x:1.0:beta").image_repository(), "repo/x");
}
