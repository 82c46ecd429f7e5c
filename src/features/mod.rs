/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するすべてのコード（モデル、保存先、状態管理）
/// を含む自己完結型のユニットです。
pub mod app;
pub mod auth;
pub mod subscriptions;
