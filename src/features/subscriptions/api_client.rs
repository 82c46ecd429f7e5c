/// REST APIサーバー経由のサブスクリプションクライアント
///
/// `/subscriptions` リソースに対してベアラートークン付きでリクエストする。
/// 所有者の絞り込みはサーバー側がトークンから行う。
use super::models::{Subscription, SubscriptionFormData, SubscriptionPatch};
use super::store::SubscriptionStore;
use crate::features::auth::SessionObservable;
use crate::shared::api_client::ApiClient;
use crate::shared::errors::{AppError, AppResult};
use serde::Deserialize;

/// 一覧取得レスポンス（エンベロープ形式と配列形式の両方に対応）
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Envelope {
        subscriptions: Vec<Subscription>,
        #[serde(default)]
        count: Option<usize>,
    },
    Bare(Vec<Subscription>),
}

impl ListResponse {
    fn into_subscriptions(self) -> Vec<Subscription> {
        match self {
            ListResponse::Envelope {
                subscriptions,
                count,
            } => {
                if let Some(count) = count.filter(|count| *count != subscriptions.len()) {
                    log::warn!(
                        "件数が一致しません: count={count}, actual={}",
                        subscriptions.len()
                    );
                }
                subscriptions
            }
            ListResponse::Bare(subscriptions) => subscriptions,
        }
    }
}

/// 単一レコードのレスポンス
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordResponse {
    Envelope { subscription: Subscription },
    Bare(Subscription),
}

impl From<RecordResponse> for Subscription {
    fn from(response: RecordResponse) -> Self {
        match response {
            RecordResponse::Envelope { subscription } => subscription,
            RecordResponse::Bare(subscription) => subscription,
        }
    }
}

/// REST APIサーバーのサブスクリプションクライアント
pub struct RestSubscriptionClient {
    client: ApiClient,
    session: SessionObservable,
}

impl RestSubscriptionClient {
    /// 新しいRestSubscriptionClientを作成する
    ///
    /// # 引数
    /// * `client` - データAPI用のHTTPクライアント
    /// * `session` - アクセストークンの取得元
    pub fn new(client: ApiClient, session: SessionObservable) -> Self {
        Self { client, session }
    }

    fn access_token(&self) -> AppResult<String> {
        self.session
            .current()
            .map(|session| session.access_token)
            .ok_or_else(|| AppError::unauthorized("ログインしていません"))
    }
}

impl SubscriptionStore for RestSubscriptionClient {
    async fn list(&self) -> AppResult<Vec<Subscription>> {
        let token = self.access_token()?;
        let response: ListResponse = self.client.get("/subscriptions", Some(&token)).await?;
        let subscriptions = response.into_subscriptions();

        log::info!("サブスクリプション一覧を取得しました: count={}", subscriptions.len());
        Ok(subscriptions)
    }

    async fn create(&self, data: SubscriptionFormData) -> AppResult<Subscription> {
        let token = self.access_token()?;
        let response: RecordResponse = self
            .client
            .post("/subscriptions", &data, Some(&token))
            .await?;
        let subscription = Subscription::from(response);

        log::info!("サブスクリプションを作成しました: id={}", subscription.id);
        Ok(subscription)
    }

    async fn update(&self, id: &str, patch: SubscriptionPatch) -> AppResult<Subscription> {
        let token = self.access_token()?;
        let endpoint = record_path(id);
        let response: RecordResponse = self.client.patch(&endpoint, &patch, Some(&token)).await?;

        log::info!("サブスクリプションを更新しました: id={id}");
        Ok(response.into())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let token = self.access_token()?;
        self.client
            .delete(&record_path(id), Some(&token))
            .await?;

        log::info!("サブスクリプションを削除しました: id={id}");
        Ok(())
    }
}

/// レコード単位のパス（IDはパーセントエンコードする）
fn record_path(id: &str) -> String {
    format!("/subscriptions/{}", urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::{Session, User};
    use crate::shared::api_client::ApiClientConfig;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": "user-1",
            "name": name,
            "monthly_price": 1500,
            "start_date": "2024-01-01",
            "memo": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    fn client_for(server: &MockServer, signed_in: bool) -> RestSubscriptionClient {
        let api = ApiClient::new_with_config(ApiClientConfig {
            base_url: server.uri(),
            timeout_seconds: 5,
            max_retries: 0,
            api_key: None,
        })
        .unwrap();
        let session = SessionObservable::new();
        if signed_in {
            session.restore(Some(Session {
                user: User {
                    id: "user-1".to_string(),
                    email: "user@example.com".to_string(),
                },
                access_token: "token-1".to_string(),
                refresh_token: None,
                expires_at: None,
            }));
        }
        RestSubscriptionClient::new(api, session)
    }

    #[tokio::test]
    async fn test_list_accepts_envelope_and_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .and(bearer_token("token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "subscriptions": [record("2", "Spotify"), record("1", "Netflix")],
                "count": 2,
                "timestamp": "2024-01-01T00:00:00Z"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([record("3", "Hulu")])))
            .mount(&server)
            .await;

        let client = client_for(&server, true);
        let first = client.list().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "Spotify");

        let second = client.list().await.unwrap();
        assert_eq!(second[0].id, "3");
    }

    #[tokio::test]
    async fn test_create_posts_form_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subscriptions"))
            .and(body_json(json!({
                "name": "Netflix",
                "monthly_price": 1500.0,
                "start_date": "2024-01-01"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "subscription": record("10", "Netflix"),
                "timestamp": "2024-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server, true)
            .create(SubscriptionFormData {
                name: "Netflix".to_string(),
                monthly_price: 1500.0,
                start_date: "2024-01-01".to_string(),
                memo: None,
            })
            .await
            .unwrap();
        assert_eq!(created.id, "10");
    }

    #[tokio::test]
    async fn test_update_and_delete_paths() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/subscriptions/abc"))
            .and(body_json(json!({"monthly_price": 1980.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(record("abc", "Netflix")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/subscriptions/abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/subscriptions/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server, true);
        let patch = SubscriptionPatch {
            monthly_price: Some(1980.0),
            ..Default::default()
        };
        assert_eq!(client.update("abc", patch).await.unwrap().id, "abc");
        client.delete("abc").await.unwrap();
        assert!(matches!(
            client.delete("missing").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_record_id_is_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/subscriptions/a%2Fb%3Fc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server, true).delete("a/b?c").await.unwrap();
        assert_eq!(record_path("a b"), "/subscriptions/a%20b");
    }

    #[tokio::test]
    async fn test_no_session_never_calls_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, false).list().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server, true).list().await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
