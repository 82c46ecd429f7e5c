use super::models::{Subscription, SubscriptionFormData, SubscriptionPatch};
use crate::shared::errors::AppResult;

/// データ境界
///
/// 現在のセッションのユーザーが所有するレコードのみを扱う。
/// セッションがない場合はすべての操作が `Unauthorized` で失敗する。
/// キャッシュは持たず、`list` は毎回保存先から取得する。
#[allow(async_fn_in_trait)]
pub trait SubscriptionStore {
    /// 所有するレコードを作成日時の新しい順に取得する
    async fn list(&self) -> AppResult<Vec<Subscription>>;

    /// レコードを作成する（ID・所有者・日時は保存先が設定する）
    async fn create(&self, data: SubscriptionFormData) -> AppResult<Subscription>;

    /// 所有するレコードを部分更新する
    async fn update(&self, id: &str, patch: SubscriptionPatch) -> AppResult<Subscription>;

    /// 所有するレコードを削除する
    async fn delete(&self, id: &str) -> AppResult<()>;
}
