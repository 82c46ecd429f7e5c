use super::controller::AppController;
use crate::features::auth::{LocalAuthGate, RemoteAuthGate, SessionFile, SessionObservable};
use crate::features::subscriptions::{
    LocalSubscriptionStore, RestSubscriptionClient, RowStoreSubscriptionClient,
};
use crate::shared::api_client::ApiClient;
use crate::shared::config::environment::{
    get_session_file_path, ApiConfig, AuthConfig, LocalConfig, StorageMode,
};
use crate::shared::config::initialization::InitializationResult;
use crate::shared::database::open_database;
use crate::shared::errors::AppResult;
use std::sync::{Arc, Mutex};

pub type RestApp = AppController<RestSubscriptionClient, RemoteAuthGate>;
pub type RowStoreApp = AppController<RowStoreSubscriptionClient, RemoteAuthGate>;
pub type LocalApp = AppController<LocalSubscriptionStore, LocalAuthGate>;

/// 保存先ごとに組み立てたコントローラー
pub enum App {
    Rest(RestApp),
    RowStore(RowStoreApp),
    Local(LocalApp),
}

/// 初期化結果の保存先に応じてコントローラーを組み立てる
///
/// 接続設定は環境変数から読み込む。リモート認証のセッションは
/// データディレクトリ配下のファイルに保存する。
///
/// # 引数
/// * `init` - `initialize_application` の結果
///
/// # 戻り値
/// 組み立てたコントローラー、または設定が不正な場合はエラー
pub fn build_app_from_env(init: &InitializationResult) -> AppResult<App> {
    let session_file = || Some(SessionFile::new(get_session_file_path(&init.app_data_dir)));

    match init.storage_mode {
        StorageMode::Rest => {
            build_rest_app(ApiConfig::from_env(), AuthConfig::from_env(), session_file())
                .map(App::Rest)
        }
        StorageMode::RowStore => {
            build_row_store_app(ApiConfig::from_env(), AuthConfig::from_env(), session_file())
                .map(App::RowStore)
        }
        StorageMode::Local => {
            let config = LocalConfig::from_env_in(init.app_data_dir.clone())?;
            build_local_app(&config).map(App::Local)
        }
    }
}

/// REST APIサーバーとリモート認証を使うコントローラーを組み立てる
///
/// # 引数
/// * `api` - データAPIの接続設定
/// * `auth` - 認証サーバーの接続設定
/// * `session_file` - セッションの保存先
pub fn build_rest_app(
    api: ApiConfig,
    auth: AuthConfig,
    session_file: Option<SessionFile>,
) -> AppResult<RestApp> {
    api.validate()?;
    let session = SessionObservable::new();
    let gate = RemoteAuthGate::new(auth, session.clone(), session_file)?;
    let store = RestSubscriptionClient::new(ApiClient::new_with_config(api.into())?, session);

    log::info!("REST APIモードで構成しました");
    Ok(AppController::new(store, gate))
}

/// 行ストアとリモート認証を使うコントローラーを組み立てる
pub fn build_row_store_app(
    api: ApiConfig,
    auth: AuthConfig,
    session_file: Option<SessionFile>,
) -> AppResult<RowStoreApp> {
    api.validate()?;
    let session = SessionObservable::new();
    let gate = RemoteAuthGate::new(auth, session.clone(), session_file)?;
    let store = RowStoreSubscriptionClient::new(ApiClient::new_with_config(api.into())?, session);

    log::info!("行ストアモードで構成しました");
    Ok(AppController::new(store, gate))
}

/// ローカルSQLiteとローカル認証を使うコントローラーを組み立てる
pub fn build_local_app(config: &LocalConfig) -> AppResult<LocalApp> {
    let conn = Arc::new(Mutex::new(open_database(&config.database_path())?));
    let session = SessionObservable::new();
    let gate = LocalAuthGate::new(Arc::clone(&conn), session.clone(), config);
    let store = LocalSubscriptionStore::new(conn, session);

    log::info!("ローカルモードで構成しました: {:?}", config.database_path());
    Ok(AppController::new(store, gate))
}
