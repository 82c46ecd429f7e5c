/// 環境設定関連のモジュール
pub mod environment;

/// アプリケーション初期化
pub mod initialization;

// 便利な再エクスポート
pub use environment::{
    get_data_dir, get_database_filename, get_environment, get_session_file_path,
    initialize_logging_system, load_environment_variables, ApiConfig, AuthConfig, Environment,
    EnvironmentConfig, LocalConfig, StorageMode,
};
pub use initialization::{initialize_application, InitializationResult};
