/// サブスクリプション機能モジュール
///
/// このモジュールは、サブスクリプション管理に関連するすべての機能を提供します：
/// - 入力フォームと検証スキーマ
/// - 保存先（REST API・行ストア・ローカルSQLite）への作成、読み取り、更新、削除
/// - 一覧表示と月額合計の計算
pub mod api_client;
pub mod form;
pub mod local_store;
pub mod models;
pub mod repository;
pub mod row_store;
pub mod store;
pub mod validation;
pub mod view_model;

// 公開インターフェース
pub use api_client::RestSubscriptionClient;
pub use form::{FormController, FormMode};
pub use local_store::LocalSubscriptionStore;
pub use models::{Subscription, SubscriptionFormData, SubscriptionPatch};
pub use row_store::RowStoreSubscriptionClient;
pub use store::SubscriptionStore;
pub use validation::{
    validate, FieldError, FieldErrorKind, FormField, SubscriptionDraft, ValidationErrors,
};
pub use view_model::{
    delete_intent, edit_intent, monthly_total, Confirm, ListIntent, SubscriptionCard,
    SubscriptionListView, DELETE_CONFIRMATION_MESSAGE, SIGN_OUT_CONFIRMATION_MESSAGE,
};
