use crate::features::auth::User;
use crate::features::subscriptions::{FormController, Subscription, SubscriptionListView};

/// 画面全体の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    /// セッション確認中
    Loading,
    /// サインイン画面
    Unauthenticated,
    /// 一覧画面
    Authenticated,
}

/// 登録・編集モーダル
#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    Closed,
    Open(FormController),
}

/// アプリケーションの表示状態
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub phase: AppPhase,
    pub user: Option<User>,
    /// 保存先から返された順序のまま保持する
    pub subscriptions: Vec<Subscription>,
    pub modal: Modal,
    /// サインインフォームに表示するエラー
    pub sign_in_error: Option<String>,
    /// 保存先エラーなどユーザーに知らせるメッセージ
    pub notice: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            phase: AppPhase::Loading,
            user: None,
            subscriptions: Vec::new(),
            modal: Modal::Closed,
            sign_in_error: None,
            notice: None,
        }
    }
}

impl AppState {
    pub fn is_loading(&self) -> bool {
        self.phase == AppPhase::Loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == AppPhase::Authenticated
    }

    pub fn is_modal_open(&self) -> bool {
        matches!(self.modal, Modal::Open(_))
    }

    /// 開いているフォーム
    pub fn form(&self) -> Option<&FormController> {
        match &self.modal {
            Modal::Open(form) => Some(form),
            Modal::Closed => None,
        }
    }

    /// 編集中のレコード
    pub fn editing(&self) -> Option<&Subscription> {
        self.form().and_then(FormController::editing)
    }

    pub fn find(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|subscription| subscription.id == id)
    }

    /// 一覧と合計の表示内容
    pub fn list_view(&self) -> SubscriptionListView {
        SubscriptionListView::build(&self.subscriptions)
    }
}
