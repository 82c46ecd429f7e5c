/// アプリケーション全体の状態管理
pub mod builder;
pub mod controller;
pub mod state;

pub use builder::{
    build_app_from_env, build_local_app, build_rest_app, build_row_store_app, App, LocalApp,
    RestApp, RowStoreApp,
};
pub use controller::AppController;
pub use state::{AppPhase, AppState, Modal};
