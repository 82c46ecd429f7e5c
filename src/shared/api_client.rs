/// 汎用APIクライアント
///
/// データAPI・認証APIとの通信を行う汎用的なクライアント。
/// ベアラートークンの付与、タイムアウト、通信失敗時のリトライ、
/// HTTPステータスからAppErrorへの変換を担当する。
use crate::shared::config::environment::{ApiConfig, AuthConfig};
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// APIクライアント設定
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub api_key: Option<String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        ApiConfig::default().into()
    }
}

impl From<ApiConfig> for ApiClientConfig {
    fn from(config: ApiConfig) -> Self {
        Self {
            base_url: config.base_url,
            timeout_seconds: config.timeout_seconds,
            max_retries: config.max_retries,
            api_key: config.api_key,
        }
    }
}

impl From<AuthConfig> for ApiClientConfig {
    fn from(config: AuthConfig) -> Self {
        // 認証リクエストは冪等でないためリトライしない
        Self {
            base_url: config.auth_url,
            timeout_seconds: config.timeout_seconds,
            max_retries: 0,
            api_key: config.api_key,
        }
    }
}

/// APIサーバーからの構造化エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    #[serde(default, rename = "requestId")]
    pub request_id: Option<String>,
}

/// 行ストアや認証サーバーが返すフラットなエラーレスポンス
#[derive(Debug, Deserialize)]
struct FlatErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl FlatErrorResponse {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.message)
            .or(self.msg)
            .or(self.error)
    }
}

/// 汎用APIクライアント
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
}

impl ApiClient {
    /// 設定を指定してAPIクライアントを作成
    pub fn new_with_config(config: ApiClientConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let value = HeaderValue::from_str(api_key)
                .map_err(|e| AppError::configuration(format!("API_KEY が不正です: {e}")))?;
            headers.insert("apikey", value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self { client, config })
    }

    /// ベースURL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// 認証ヘッダー付きのリクエストを組み立てる
    pub fn request(&self, method: Method, endpoint: &str, auth_token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{endpoint}", self.config.base_url);
        let request = self.client.request(method, url);

        match auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GETリクエストを送信
    pub async fn get<T>(&self, endpoint: &str, auth_token: Option<&str>) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let request = self.request(Method::GET, endpoint, auth_token);
        self.send_json(request, "GET", endpoint).await
    }

    /// POSTリクエストを送信
    pub async fn post<B, T>(&self, endpoint: &str, body: &B, auth_token: Option<&str>) -> AppResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, endpoint, auth_token).json(body);
        self.send_json(request, "POST", endpoint).await
    }

    /// PATCHリクエストを送信
    pub async fn patch<B, T>(&self, endpoint: &str, body: &B, auth_token: Option<&str>) -> AppResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, endpoint, auth_token).json(body);
        self.send_json(request, "PATCH", endpoint).await
    }

    /// DELETEリクエストを送信（レスポンスボディは読まない）
    pub async fn delete(&self, endpoint: &str, auth_token: Option<&str>) -> AppResult<()> {
        let request = self.request(Method::DELETE, endpoint, auth_token);
        self.send_empty(request, "DELETE", endpoint).await
    }

    /// リクエストを送信し、JSONレスポンスを解析する
    pub async fn send_json<T>(&self, request: RequestBuilder, method: &str, endpoint: &str) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send_with_retry(request, method, endpoint).await?;
        let result: T = response
            .json()
            .await
            .map_err(|e| AppError::store(format!("レスポンス解析エラー: {e}")))?;

        info!("{method}リクエスト成功: endpoint={endpoint}");
        Ok(result)
    }

    /// リクエストを送信し、成功ステータスのみを確認する
    pub async fn send_empty(&self, request: RequestBuilder, method: &str, endpoint: &str) -> AppResult<()> {
        self.send_with_retry(request, method, endpoint).await?;
        info!("{method}リクエスト成功: endpoint={endpoint}");
        Ok(())
    }

    /// リトライ機能付きでリクエストを送信
    ///
    /// GETは通信エラー全般を、それ以外は接続確立前の失敗のみを指数バックオフで
    /// リトライする。送信済みの作成・更新をもう一度送ると重複するため。
    /// サーバーが応答した場合はステータスに応じて即座に成功またはエラーを返す。
    async fn send_with_retry(&self, request: RequestBuilder, method: &str, endpoint: &str) -> AppResult<Response> {
        debug!("{method}リクエスト送信: endpoint={endpoint}");

        let mut attempts = 0;
        loop {
            let cloned_request = request
                .try_clone()
                .ok_or_else(|| AppError::store("リクエストのクローンに失敗しました"))?;

            match cloned_request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => return Err(self.error_from_response(response).await),
                Err(e) if attempts < self.config.max_retries && is_retryable(method, &e) => {
                    attempts += 1;
                    let delay = retry_delay(attempts);
                    warn!(
                        "APIリクエスト失敗、リトライします: attempt={attempts}/{}, delay={delay:?}, error={e}",
                        self.config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(AppError::store(format!(
                        "APIサーバーへの接続に失敗しました: {e}"
                    )));
                }
            }
        }
    }

    /// エラーレスポンスをAppErrorに変換する
    async fn error_from_response(&self, response: Response) -> AppError {
        let status = response.status();
        let response_text = response
            .text()
            .await
            .unwrap_or_else(|_| "レスポンス読み取り失敗".to_string());

        let message = extract_error_message(&response_text)
            .unwrap_or_else(|| default_error_message(status).to_string());

        warn!("APIサーバーエラー: status={}, message={message}", status.as_u16());
        debug!("APIサーバーエラー本文: {response_text}");

        error_for_status(status, message)
    }
}

/// リトライ間隔の上限（秒）
const MAX_RETRY_DELAY_SECONDS: u64 = 30;

/// 通信エラーをリトライしてよいかどうか
fn is_retryable(method: &str, error: &reqwest::Error) -> bool {
    method == "GET" || error.is_connect()
}

/// attempt回目のリトライまでの待ち時間（2^attempt秒、上限あり）
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(
        2_u64
            .saturating_pow(attempt)
            .min(MAX_RETRY_DELAY_SECONDS),
    )
}

/// レスポンス本文からエラーメッセージを取り出す
fn extract_error_message(body: &str) -> Option<String> {
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        return Some(format!(
            "{} - {}",
            error_response.error.code, error_response.error.message
        ));
    }

    serde_json::from_str::<FlatErrorResponse>(body)
        .ok()
        .and_then(FlatErrorResponse::into_message)
}

fn default_error_message(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "リクエストの形式が正しくありません",
        401 => "認証に失敗しました。再度ログインしてください",
        403 => "この操作を実行する権限がありません",
        404 => "指定されたリソースが見つかりません",
        409 => "データが競合しています",
        422 => "入力内容が受け付けられませんでした",
        429 => "リクエストが多すぎます。しばらく待ってから再試行してください",
        500 => "サーバー内部エラーが発生しました",
        502 => "APIサーバーとの通信でエラーが発生しました",
        503 => "APIサーバーが一時的に利用できません",
        504 => "APIサーバーからの応答がタイムアウトしました",
        _ => "不明なエラーが発生しました",
    }
}

/// HTTPステータスをエラー種別に対応付ける
fn error_for_status(status: StatusCode, message: String) -> AppError {
    match status.as_u16() {
        401 | 403 => AppError::Unauthorized(message),
        404 => AppError::NotFound(message),
        400 | 409 | 422 => AppError::ValidationRejected(message),
        code => AppError::Store(format!("APIサーバーエラー: {code} - {message}")),
    }
}
