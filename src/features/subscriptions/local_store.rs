use super::models::{Subscription, SubscriptionFormData, SubscriptionPatch};
use super::repository;
use super::store::SubscriptionStore;
use crate::features::auth::SessionObservable;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::MonotonicIdGenerator;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// ローカルSQLiteのサブスクリプションストア
pub struct LocalSubscriptionStore {
    conn: Arc<Mutex<Connection>>,
    session: SessionObservable,
    ids: MonotonicIdGenerator,
}

impl LocalSubscriptionStore {
    /// 新しいLocalSubscriptionStoreを作成する
    ///
    /// # 引数
    /// * `conn` - データベース接続（ローカル認証と共有）
    /// * `session` - 所有者IDの取得元
    pub fn new(conn: Arc<Mutex<Connection>>, session: SessionObservable) -> Self {
        Self {
            conn,
            session,
            ids: MonotonicIdGenerator::new(),
        }
    }

    fn owner(&self) -> AppResult<String> {
        self.session
            .current()
            .map(|session| session.user.id)
            .ok_or_else(|| AppError::unauthorized("ログインしていません"))
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得エラー: {e}")))
    }
}

impl SubscriptionStore for LocalSubscriptionStore {
    async fn list(&self) -> AppResult<Vec<Subscription>> {
        let owner = self.owner()?;
        let conn = self.lock()?;
        let subscriptions = repository::find_all(&conn, &owner)?;

        log::info!("サブスクリプション一覧を取得しました: count={}", subscriptions.len());
        Ok(subscriptions)
    }

    async fn create(&self, data: SubscriptionFormData) -> AppResult<Subscription> {
        let owner = self.owner()?;
        let id = self.ids.next_id();
        let conn = self.lock()?;
        let subscription = repository::create(&conn, &owner, &id, &data)?;

        log::info!("サブスクリプションを作成しました: id={}", subscription.id);
        Ok(subscription)
    }

    async fn update(&self, id: &str, patch: SubscriptionPatch) -> AppResult<Subscription> {
        let owner = self.owner()?;
        let conn = self.lock()?;
        let subscription = repository::update(&conn, &owner, id, &patch)?;

        log::info!("サブスクリプションを更新しました: id={id}");
        Ok(subscription)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let owner = self.owner()?;
        let conn = self.lock()?;
        repository::delete(&conn, &owner, id)?;

        log::info!("サブスクリプションを削除しました: id={id}");
        Ok(())
    }
}
