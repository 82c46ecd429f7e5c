use crate::shared::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ユーザー情報を表す構造体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// ユーザーID（レコードの所有者ID）
    pub id: String,
    /// メールアドレス
    #[serde(default)]
    pub email: String,
}

/// セッション情報を表す構造体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// ログイン中のユーザー
    pub user: User,
    /// APIリクエストに付与するアクセストークン
    pub access_token: String,
    /// アクセストークン更新用のトークン
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// 有効期限
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// 所有者ID
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// 指定時刻の時点で期限切れかどうか
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// 現在時刻の時点で期限切れかどうか
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// セッション遷移の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEvent {
    /// サインイン
    SignedIn,
    /// サインアウト（期限切れ含む）
    SignedOut,
    /// トークン更新
    TokenRefreshed,
}

/// セッション変更通知
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// 認証エラーの種類
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// メールアドレスまたはパスワードが正しくない
    #[error("{0}")]
    InvalidCredentials(String),

    /// 認証サーバーとの通信エラー
    #[error("認証サーバーとの通信でエラーが発生しました: {0}")]
    Store(String),

    /// 設定エラー
    #[error("認証設定エラー: {0}")]
    Configuration(String),

    /// セッション期限切れエラー
    #[error("セッションが期限切れです")]
    SessionExpired,

    /// 認証が必要エラー
    #[error("認証が必要です")]
    AuthenticationRequired,
}

impl AuthError {
    /// サインインフォームに表示するメッセージ
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials(msg) => msg.clone(),
            AuthError::Store(_) => "認証サーバーとの通信でエラーが発生しました".to_string(),
            AuthError::Configuration(_) => "認証設定エラーが発生しました".to_string(),
            AuthError::SessionExpired => "セッションが期限切れです。再度ログインしてください".to_string(),
            AuthError::AuthenticationRequired => "ログインしてください".to_string(),
        }
    }
}

impl From<AppError> for AuthError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::InvalidCredentials(msg) => AuthError::InvalidCredentials(msg),
            AppError::Unauthorized(_) => AuthError::AuthenticationRequired,
            AppError::Configuration(msg) => AuthError::Configuration(msg),
            other => AuthError::Store(other.details()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials(msg) => AppError::InvalidCredentials(msg),
            AuthError::Store(msg) => AppError::Store(msg),
            AuthError::Configuration(msg) => AppError::Configuration(msg),
            AuthError::SessionExpired | AuthError::AuthenticationRequired => {
                AppError::Unauthorized(error.to_string())
            }
        }
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(error: rusqlite::Error) -> Self {
        AuthError::Store(format!("データベースエラー: {error}"))
    }
}
