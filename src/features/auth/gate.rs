use crate::features::auth::models::{AuthChange, AuthError, Session};
use crate::features::auth::session::SessionSubscription;
use crate::shared::errors::AppResult;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("メールアドレスの正規表現が不正です")
});

/// 認証境界
///
/// セッションの確立・監視・破棄を行う。実装はリモート認証サーバー版と
/// ローカル版がある。
#[allow(async_fn_in_trait)]
pub trait AuthGate {
    /// 現在のセッションを取得する（起動直後は古い可能性がある）
    async fn current_session(&self) -> AppResult<Option<Session>>;

    /// セッション変更の購読を開始する
    ///
    /// 返されたハンドルを解放すると通知が止まる。
    fn on_session_change<F>(&self, handler: F) -> SessionSubscription
    where
        F: Fn(&AuthChange) + Send + Sync + 'static;

    /// メールアドレスとパスワードでサインインする
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// サインアウトする
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// 現在のセッションを更新する
    ///
    /// 更新できた場合は `TokenRefreshed` を通知する。
    ///
    /// # 戻り値
    /// 更新後のセッション（更新できるセッションがない場合はNone）
    async fn refresh_session(&self) -> Result<Option<Session>, AuthError>;
}

/// サインインフォームの入力を検証する
///
/// # 引数
/// * `email` - メールアドレス
/// * `password` - パスワード
///
/// # 戻り値
/// 検証結果（失敗時はフォームに表示するメッセージを持つ `InvalidCredentials`）
pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::InvalidCredentials(
            "メールアドレスを入力してください".to_string(),
        ));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(AuthError::InvalidCredentials(
            "メールアドレスの形式が正しくありません".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidCredentials(
            "パスワードを入力してください".to_string(),
        ));
    }
    Ok(())
}
