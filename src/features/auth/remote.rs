/// リモート認証ゲート
///
/// パスワードグラント方式の認証サーバーと通信し、取得したセッションを
/// `SessionObservable` とセッションファイルに反映する。
use crate::features::auth::gate::{validate_credentials, AuthGate};
use crate::features::auth::models::{AuthChange, AuthError, AuthEvent, Session, User};
use crate::features::auth::session::{SessionObservable, SessionSubscription};
use crate::features::auth::storage::SessionFile;
use crate::shared::api_client::ApiClient;
use crate::shared::config::environment::AuthConfig;
use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

const INVALID_CREDENTIALS_MESSAGE: &str = "メールアドレスまたはパスワードが正しくありません";

#[derive(Debug, Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrantRequest<'a> {
    refresh_token: &'a str,
}

/// 認証サーバーのトークンレスポンス
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// 有効期間（秒）
    #[serde(default)]
    expires_in: Option<i64>,
    /// 有効期限（UNIX秒）
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .or_else(|| self.expires_in.map(|seconds| now + Duration::seconds(seconds)));

        Session {
            user: self.user,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// リモート認証ゲート
pub struct RemoteAuthGate {
    client: ApiClient,
    session: SessionObservable,
    session_file: Option<SessionFile>,
}

impl RemoteAuthGate {
    /// 新しいRemoteAuthGateを作成する
    ///
    /// # 引数
    /// * `config` - 認証サーバーの接続設定
    /// * `session` - データクライアントと共有するセッション
    /// * `session_file` - セッションの保存先（Noneの場合は永続化しない）
    ///
    /// # 戻り値
    /// RemoteAuthGate、または設定が不正な場合はエラー
    pub fn new(
        config: AuthConfig,
        session: SessionObservable,
        session_file: Option<SessionFile>,
    ) -> AppResult<Self> {
        config.validate()?;
        let client = ApiClient::new_with_config(config.into())?;

        Ok(Self {
            client,
            session,
            session_file,
        })
    }

    /// 共有セッション
    pub fn session(&self) -> &SessionObservable {
        &self.session
    }

    /// リフレッシュトークンでセッションを更新し、購読者に通知する
    async fn refresh_and_publish(&self) -> Result<Session, AuthError> {
        let current = self.session.current().ok_or(AuthError::AuthenticationRequired)?;
        let refreshed = self.request_refresh(&current).await?;
        self.persist(&refreshed);
        self.session
            .publish(AuthEvent::TokenRefreshed, Some(refreshed.clone()));
        Ok(refreshed)
    }

    async fn request_refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(AuthError::SessionExpired)?;

        log::debug!("セッションを更新します: user_id={}", session.user_id());

        let response: TokenResponse = self
            .client
            .post(
                "/token?grant_type=refresh_token",
                &RefreshGrantRequest { refresh_token },
                None,
            )
            .await
            .map_err(|e| match e {
                AppError::Unauthorized(_)
                | AppError::ValidationRejected(_)
                | AppError::NotFound(_) => AuthError::SessionExpired,
                other => AuthError::from(other),
            })?;

        log::info!("セッションを更新しました: user_id={}", response.user.id);
        Ok(response.into_session(Utc::now()))
    }

    /// セッションファイルに保存する（失敗してもサインイン自体は継続する）
    fn persist(&self, session: &Session) {
        if let Some(file) = &self.session_file {
            if let Err(e) = file.save(session) {
                log::warn!("セッションの保存に失敗しました: {e}");
            }
        }
    }

    fn forget(&self) {
        if let Some(file) = &self.session_file {
            if let Err(e) = file.clear() {
                log::warn!("セッションファイルの削除に失敗しました: {e}");
            }
        }
    }

    /// 保存済みセッションを復元する（通知はしない）
    async fn restore_saved_session(&self) -> AppResult<Option<Session>> {
        let Some(file) = &self.session_file else {
            return Ok(None);
        };
        let Some(saved) = file.load()? else {
            log::debug!("保存済みセッションはありません");
            return Ok(None);
        };

        if !saved.is_expired() {
            log::info!("保存済みセッションを復元しました: user_id={}", saved.user_id());
            self.session.restore(Some(saved.clone()));
            return Ok(Some(saved));
        }

        match self.request_refresh(&saved).await {
            Ok(refreshed) => {
                self.persist(&refreshed);
                self.session.restore(Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(AuthError::SessionExpired) => {
                log::info!("保存済みセッションの期限が切れています");
                self.forget();
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl AuthGate for RemoteAuthGate {
    async fn current_session(&self) -> AppResult<Option<Session>> {
        let Some(current) = self.session.current() else {
            return self.restore_saved_session().await;
        };

        if !current.is_expired() {
            return Ok(Some(current));
        }

        match self.refresh_and_publish().await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(AuthError::SessionExpired) => {
                self.forget();
                self.session.publish(AuthEvent::SignedOut, None);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
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

        log::info!("サインインを開始します: email={email}");

        let response: TokenResponse = self
            .client
            .post(
                "/token?grant_type=password",
                &PasswordGrantRequest { email, password },
                None,
            )
            .await
            .map_err(|e| match e {
                AppError::Unauthorized(_) | AppError::ValidationRejected(_) => {
                    log::warn!("サインインに失敗しました: email={email}");
                    AuthError::InvalidCredentials(INVALID_CREDENTIALS_MESSAGE.to_string())
                }
                other => {
                    log::error!("サインイン中にエラーが発生しました: {other}");
                    AuthError::from(other)
                }
            })?;

        let session = response.into_session(Utc::now());
        self.persist(&session);
        self.session.publish(AuthEvent::SignedIn, Some(session.clone()));

        log::info!("サインインしました: user_id={}", session.user_id());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(current) = self.session.current() {
            let request = self
                .client
                .request(Method::POST, "/logout", Some(&current.access_token));

            // サーバー側の失効に失敗してもローカルのセッションは破棄する
            if let Err(e) = self.client.send_empty(request, "POST", "/logout").await {
                log::warn!("サーバー側のサインアウトに失敗しました: {e}");
            }
        }

        self.forget();
        self.session.publish(AuthEvent::SignedOut, None);

        log::info!("サインアウトしました");
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Option<Session>, AuthError> {
        match self.refresh_and_publish().await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(AuthError::SessionExpired | AuthError::AuthenticationRequired) => {
                log::info!("更新できるセッションがありません");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
