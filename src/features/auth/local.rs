/// ローカル認証ゲート
///
/// 設定された単一ユーザーの認証情報で照合し、セッションを
/// SQLiteの `sessions` テーブルに保存する。
use crate::features::auth::gate::{validate_credentials, AuthGate};
use crate::features::auth::models::{AuthChange, AuthError, AuthEvent, Session, User};
use crate::features::auth::session::{SessionObservable, SessionSubscription};
use crate::shared::config::environment::LocalConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::get_current_jst_timestamp;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// セッションの有効期間（日）
const SESSION_DURATION_DAYS: i64 = 30;

/// ローカル認証ゲート
pub struct LocalAuthGate {
    conn: Arc<Mutex<Connection>>,
    session: SessionObservable,
    email: String,
    password: String,
}

impl LocalAuthGate {
    /// 新しいLocalAuthGateを作成する
    ///
    /// # 引数
    /// * `conn` - サブスクリプションストアと共有するデータベース接続
    /// * `session` - データクライアントと共有するセッション
    /// * `config` - ローカル認証情報
    pub fn new(conn: Arc<Mutex<Connection>>, session: SessionObservable, config: &LocalConfig) -> Self {
        Self {
            conn,
            session,
            email: config.email.trim().to_string(),
            password: config.password.clone(),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得エラー: {e}")))
    }

    /// 期限内の最新セッションをデータベースから読み込む
    fn load_active_session(&self, now: DateTime<Utc>) -> AppResult<Option<Session>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, user_id, email, expires_at FROM sessions
                 WHERE expires_at > ?1
                 ORDER BY created_at DESC
                 LIMIT 1",
                params![format_expiry(now)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, user_id, email, expires_at)) = row else {
            return Ok(None);
        };

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map(|value| value.with_timezone(&Utc))
            .map_err(|e| AppError::store(format!("セッション有効期限の解析に失敗: {e}")))?;

        Ok(Some(Session {
            user: User { id: user_id, email },
            access_token: id,
            refresh_token: None,
            expires_at: Some(expires_at),
        }))
    }

    fn insert_session(&self, email: &str, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let session = Session {
            user: User {
                id: local_user_id(email),
                email: email.to_string(),
            },
            access_token: Uuid::new_v4().to_string(),
            refresh_token: None,
            expires_at: Some(now + Duration::days(SESSION_DURATION_DAYS)),
        };
        let expires_at = session
            .expires_at
            .map(format_expiry)
            .unwrap_or_default();

        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![format_expiry(now)],
        )?;
        conn.execute(
            "INSERT INTO sessions (id, user_id, email, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.access_token,
                session.user.id,
                session.user.email,
                expires_at,
                get_current_jst_timestamp(),
            ],
        )?;

        Ok(session)
    }
}

impl AuthGate for LocalAuthGate {
    async fn current_session(&self) -> AppResult<Option<Session>> {
        if let Some(current) = self.session.current() {
            if !current.is_expired() {
                return Ok(Some(current));
            }
            self.session.publish(AuthEvent::SignedOut, None);
        }

        let restored = self.load_active_session(Utc::now())?;
        if let Some(session) = &restored {
            log::info!("ローカルセッションを復元しました: user_id={}", session.user_id());
        }
        self.session.restore(restored.clone());
        Ok(restored)
    }

    fn on_session_change<F>(&self, handler: F) -> SessionSubscription
    where
        F: Fn(&AuthChange) + Send + Sync + 'static,
    {
        self.session.subscribe(handler)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validate_credentials(email, password)?;
        let email = email.trim();

        if !email.eq_ignore_ascii_case(&self.email) || password != self.password {
            log::warn!("ローカルサインインに失敗しました: email={email}");
            return Err(AuthError::InvalidCredentials(
                "メールアドレスまたはパスワードが正しくありません".to_string(),
            ));
        }

        let session = self.insert_session(&self.email, Utc::now())?;
        self.session.publish(AuthEvent::SignedIn, Some(session.clone()));

        log::info!("ローカルサインインしました: user_id={}", session.user_id());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(current) = self.session.current() {
            let conn = self.lock()?;
            conn.execute(
                "DELETE FROM sessions WHERE id = ?1",
                params![current.access_token],
            )?;
        }

        self.session.publish(AuthEvent::SignedOut, None);
        log::info!("ローカルサインアウトしました");
        Ok(())
    }

    /// ローカルセッションは更新できないため常にNone
    async fn refresh_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(None)
    }
}

/// ローカルユーザーの所有者ID
fn local_user_id(email: &str) -> String {
    format!("local:{}", email.to_lowercase())
}

/// 文字列比較で前後関係が判定できるよう、UTC・ミリ秒固定で書式化する
fn format_expiry(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
