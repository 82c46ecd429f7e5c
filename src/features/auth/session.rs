use crate::features::auth::models::{AuthChange, AuthEvent, Session};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

type Listener = Arc<dyn Fn(&AuthChange) + Send + Sync>;

/// 現在のセッションと変更通知の購読者を保持する
///
/// 認証ゲートが書き込み、データクライアントが所有者IDとトークンを読み出す。
/// クローンは同じ状態を共有する。
#[derive(Clone, Default)]
pub struct SessionObservable {
    inner: Arc<ObservableInner>,
}

#[derive(Default)]
struct ObservableInner {
    current: RwLock<Option<Session>>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_id: AtomicU64,
}

impl SessionObservable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在のセッションを取得する
    pub fn current(&self) -> Option<Session> {
        self.inner
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// 通知せずにセッションを置き換える（起動時の復元用）
    pub fn restore(&self, session: Option<Session>) {
        *self
            .inner
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    /// セッションを更新し、購読者に通知する
    pub fn publish(&self, event: AuthEvent, session: Option<Session>) {
        self.restore(session.clone());

        // コールバック中の購読解除でデッドロックしないよう、ロック外で呼び出す
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();

        log::debug!(
            "セッション変更を通知します: event={event:?}, listeners={}",
            listeners.len()
        );

        let change = AuthChange { event, session };
        for listener in listeners {
            listener(&change);
        }
    }

    /// セッション変更の購読を開始する
    ///
    /// 返されたハンドルを解放（`unsubscribe` またはdrop）すると通知が止まる。
    pub fn subscribe<F>(&self, handler: F) -> SessionSubscription
    where
        F: Fn(&AuthChange) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, Arc::new(handler));

        log::debug!("セッション変更の購読を開始しました: id={id}");

        SessionSubscription {
            id,
            inner: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// 現在の購読者数
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// セッション変更購読のハンドル
///
/// 解放は一度だけ行われる。明示的に `unsubscribe` しなかった場合はdrop時に解放する。
#[must_use = "ハンドルをdropすると購読が即座に解除されます"]
pub struct SessionSubscription {
    id: u64,
    inner: Weak<ObservableInner>,
    released: bool,
}

impl SessionSubscription {
    /// 購読を解除する
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Some(inner) = self.inner.upgrade() {
            inner
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(&self.id);
            log::debug!("セッション変更の購読を解除しました: id={}", self.id);
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
