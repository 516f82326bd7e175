//! Prem Daemon
//!
//! ローカルホスト上でMLモデルサービスのコンテナ群を管理するコントロールプレーン

#![warn(missing_docs)]

/// サービスカタログ（読み取り専用、起動時ロード）
pub mod catalog;

/// コンテナランタイムゲートウェイ（Docker連携）
pub mod runtime;

/// ホストリソースプローブ（メモリ/ディスク/GPU）
pub mod probe;

/// サービス状態リコンサイラ
pub mod reconciler;

/// コンテナ起動コーディネータ（ポート再試行プロトコル）
pub mod launcher;

/// フリート操作（全停止・プルーン）
pub mod fleet;

/// リソース統計レポート
pub mod stats;

/// HTTP APIエンドポイント
pub mod api;

/// ロギング初期化
pub mod logging;
