//! サブスクリプション・固定費メモのコア
//!
//! 認証ゲート、サブスクリプションの保存先、入力検証、一覧と合計の表示内容、
//! それらをまとめるアプリケーションコントローラーを提供する。
//! 画面描画は呼び出し側が `AppController::state()` をもとに行う。

pub mod features;
pub mod shared;

pub use features::app::{
    build_app_from_env, build_local_app, build_rest_app, build_row_store_app, App,
    AppController, AppPhase, AppState, LocalApp, Modal, RestApp, RowStoreApp,
};
pub use features::auth::{
    AuthChange, AuthError, AuthEvent, AuthGate, Session, SessionFile, SessionObservable,
    SessionSubscription, User,
};
pub use features::subscriptions::{
    Confirm, FormController, FormField, FormMode, Subscription, SubscriptionFormData,
    SubscriptionListView, SubscriptionPatch, SubscriptionStore, ValidationErrors,
};
pub use shared::config::{initialize_application, InitializationResult, StorageMode};
pub use shared::errors::{AppError, AppResult, ErrorSeverity};
