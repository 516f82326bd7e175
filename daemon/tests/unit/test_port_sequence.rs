//! Unit Test: Port Allocation Sequence
//!
//! 起動プロトコルのポート探索順序をテスト

use premd::launcher::LAUNCH_ATTEMPTS;

#[test]
fn test_candidate_ports_start_at_default_plus_one() {
    let default_port: u16 = 8000;
    let candidates: Vec<u16> = (0..LAUNCH_ATTEMPTS as u16)
        .map(|offset| default_port + 1 + offset)
        .collect();

    assert_eq!(candidates.first(), Some(&8001));
    // 3回失敗した後の4回目の候補は defaultPort + 4
    assert_eq!(candidates[3], 8004);
    assert_eq!(candidates.last(), Some(&8010));
}

#[test]
fn test_attempt_limit_is_ten() {
    assert_eq!(LAUNCH_ATTEMPTS, 10);
}
