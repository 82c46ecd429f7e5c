/// 共有エラー型とエラーハンドリング
pub mod errors;

/// 共有データベース接続管理
pub mod database;

/// 共有設定管理
pub mod config;

/// 汎用HTTP APIクライアント
pub mod api_client;

/// 共有ユーティリティ関数
pub mod utils;

// 便利な再エクスポート
pub use api_client::{ApiClient, ApiClientConfig};
pub use config::{
    get_environment, initialize_application, initialize_logging_system,
    load_environment_variables, Environment, EnvironmentConfig, InitializationResult,
};
pub use database::{create_in_memory_connection, create_tables, open_database};
pub use errors::{AppError, AppResult, ErrorSeverity};
