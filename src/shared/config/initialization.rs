use super::environment::{
    get_data_dir, get_database_filename, get_environment, initialize_logging_system,
    load_environment_variables, Environment, StorageMode,
};
use crate::shared::errors::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// アプリケーション初期化の結果を表す構造体
#[derive(Debug)]
pub struct InitializationResult {
    /// 初回起動かどうか（ローカルモードのみ意味を持つ）
    pub is_first_run: bool,
    /// アプリケーションデータディレクトリのパス
    pub app_data_dir: PathBuf,
    /// 実行環境
    pub environment: Environment,
    /// データの保存先
    pub storage_mode: StorageMode,
}

/// アプリケーションの初期化を実行する
///
/// # 処理内容
/// 1. 環境変数の読み込み
/// 2. ログシステムの初期化
/// 3. アプリケーションデータディレクトリの作成
/// 4. 保存先モードの決定
pub fn initialize_application() -> AppResult<InitializationResult> {
    load_environment_variables();
    initialize_logging_system();

    let environment = get_environment();
    let storage_mode = std::env::var("STORAGE_MODE")
        .unwrap_or_default()
        .parse::<StorageMode>()?;

    let app_data_dir = get_data_dir()?;
    ensure_app_data_directory(&app_data_dir)?;

    let database_path = app_data_dir.join(get_database_filename(environment.clone()));
    let is_first_run = storage_mode == StorageMode::Local && !database_path.exists();

    if is_first_run {
        log_first_run_initialization(&environment, &app_data_dir, &database_path);
    }

    log_initialization_complete(&environment, storage_mode);

    Ok(InitializationResult {
        is_first_run,
        app_data_dir,
        environment,
        storage_mode,
    })
}

/// アプリケーションデータディレクトリを確実に作成する
pub fn ensure_app_data_directory(app_data_dir: &Path) -> AppResult<()> {
    if !app_data_dir.exists() {
        fs::create_dir_all(app_data_dir).map_err(|e| {
            AppError::configuration(format!("アプリデータディレクトリの作成に失敗しました: {e}"))
        })?;
        log::info!("アプリケーションデータディレクトリを作成しました: {app_data_dir:?}");
    }
    Ok(())
}

fn log_first_run_initialization(environment: &Environment, app_data_dir: &Path, database_path: &Path) {
    log::info!("=== 初回起動 ===");
    log::info!("環境: {environment:?}");
    log::info!("データディレクトリ: {app_data_dir:?}");
    log::info!("データベース: {database_path:?}");
}

/// 初期化完了ログを出力する
pub fn log_initialization_complete(environment: &Environment, storage_mode: StorageMode) {
    log::info!("アプリケーション初期化が完了しました: environment={environment:?}, storage_mode={storage_mode:?}");
}
