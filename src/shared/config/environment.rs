use crate::shared::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// デバッグモードの有効/無効
    pub debug_mode: bool,
    /// ログレベル
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        let environment = get_environment();
        let debug_mode = environment == Environment::Development;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            debug_mode,
            log_level,
        }
    }
}

/// 現在の実行環境を判定する
///
/// # 判定ロジック
/// 1. 実行時環境変数 ENVIRONMENT を確認
/// 2. デバッグビルドの場合は Development
/// 3. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_subscriptions.db"
/// - プロダクション環境: "subscriptions.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_subscriptions.db",
        Environment::Production => "subscriptions.db",
    }
}

/// 環境に応じた.envファイルを読み込む
pub fn load_environment_variables() {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    log::info!("環境: {environment}, 読み込み対象: {env_file}");

    match dotenv::from_filename(env_file) {
        Ok(_) => {
            log::info!("{env_file}ファイルを読み込みました");
        }
        Err(_) => {
            // 環境固有のファイルがない場合は、デフォルトの.envを試行
            if env_file != ".env" && dotenv::dotenv().is_ok() {
                log::warn!("{env_file}が見つからないため、デフォルトの.envファイルを読み込みました");
            } else {
                log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// 二回目以降の呼び出しは警告を出して無視する。
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init();

    if initialized.is_err() {
        log::warn!("ログシステムは既に初期化されています");
        return;
    }

    log::info!(
        "ログシステムを初期化しました: level={}, environment={}",
        env_config.log_level,
        env_config.environment
    );
}

/// データの保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// REST API サーバー経由
    Rest,
    /// 行ストア（PostgREST互換）への直接アクセス
    RowStore,
    /// ローカルSQLite
    Local,
}

impl FromStr for StorageMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "rest" | "" => Ok(StorageMode::Rest),
            "row_store" | "rowstore" => Ok(StorageMode::RowStore),
            "local" => Ok(StorageMode::Local),
            other => Err(AppError::configuration(format!(
                "不明なSTORAGE_MODEです: {other}"
            ))),
        }
    }
}

/// 通信失敗時の最大リトライ回数の上限
pub const MAX_API_RETRIES: u32 = 10;

/// データAPIの接続設定
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// ベースURL（例: http://localhost:3000/api）
    pub base_url: String,
    /// リクエストタイムアウト（秒）
    pub timeout_seconds: u64,
    /// 通信失敗時の最大リトライ回数
    pub max_retries: u32,
    /// `apikey` ヘッダーで送るキー
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            api_key: None,
        }
    }
}

impl ApiConfig {
    /// 環境変数からAPI設定を読み込む
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("API_BASE_URL").unwrap_or_else(|_| {
            log::debug!("API_BASE_URL が設定されていないため、デフォルト値を使用");
            defaults.base_url.clone()
        });

        let timeout_seconds = std::env::var("API_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_seconds);

        let max_retries = std::env::var("API_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_retries);

        let api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
            max_retries,
            api_key,
        }
    }

    /// 設定を検証する
    pub fn validate(&self) -> AppResult<()> {
        validate_http_url(&self.base_url, "API_BASE_URL")?;
        if self.timeout_seconds == 0 {
            return Err(AppError::configuration(
                "API_TIMEOUT_SECONDS は1以上である必要があります",
            ));
        }
        if self.max_retries > MAX_API_RETRIES {
            return Err(AppError::configuration(format!(
                "API_MAX_RETRIES は{MAX_API_RETRIES}以下である必要があります: {}",
                self.max_retries
            )));
        }
        Ok(())
    }
}

/// 認証サーバーの接続設定
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// 認証APIのベースURL（例: http://localhost:54321/auth/v1）
    pub auth_url: String,
    /// `apikey` ヘッダーで送るキー
    pub api_key: Option<String>,
    /// リクエストタイムアウト（秒）
    pub timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:54321/auth/v1".to_string(),
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

impl AuthConfig {
    /// 環境変数から認証設定を読み込む
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let auth_url = std::env::var("AUTH_URL").unwrap_or(defaults.auth_url);
        let api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());
        let timeout_seconds = std::env::var("API_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_seconds);

        Self {
            auth_url: auth_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_seconds,
        }
    }

    /// 設定を検証する
    pub fn validate(&self) -> AppResult<()> {
        validate_http_url(&self.auth_url, "AUTH_URL")
    }
}

/// ローカルモードの設定
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// データディレクトリ
    pub data_dir: PathBuf,
    /// ローカル認証用メールアドレス
    pub email: String,
    /// ローカル認証用パスワード
    pub password: String,
}

impl LocalConfig {
    /// 環境変数からローカル設定を読み込む
    ///
    /// # 戻り値
    /// ローカル設定、または認証情報が設定されていない場合は設定エラー
    pub fn from_env() -> AppResult<Self> {
        Self::from_env_in(get_data_dir()?)
    }

    /// データディレクトリを指定して環境変数から認証情報を読み込む
    pub fn from_env_in(data_dir: PathBuf) -> AppResult<Self> {
        let email = std::env::var("LOCAL_AUTH_EMAIL")
            .map_err(|_| AppError::configuration("LOCAL_AUTH_EMAIL が設定されていません"))?;
        let password = std::env::var("LOCAL_AUTH_PASSWORD")
            .map_err(|_| AppError::configuration("LOCAL_AUTH_PASSWORD が設定されていません"))?;

        Ok(Self {
            data_dir,
            email,
            password,
        })
    }

    /// 環境に応じたデータベースファイルのパス
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(get_database_filename(get_environment()))
    }
}

/// データディレクトリを取得する
///
/// `DATA_DIR` が設定されていればそれを使い、なければOS標準のデータディレクトリ配下を使う。
pub fn get_data_dir() -> AppResult<PathBuf> {
    if let Ok(dir) = std::env::var("DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }

    dirs::data_dir()
        .map(|dir| dir.join("subscription-memo"))
        .ok_or_else(|| AppError::configuration("データディレクトリを特定できません"))
}

/// データディレクトリ配下のセッションファイルのパス
pub fn get_session_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session.json")
}

fn validate_http_url(value: &str, name: &str) -> AppResult<()> {
    let url = Url::parse(value)
        .map_err(|e| AppError::configuration(format!("{name} の形式が正しくありません: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::configuration(format!(
            "{name} はhttpまたはhttpsである必要があります: {scheme}"
        ))),
    }
}
