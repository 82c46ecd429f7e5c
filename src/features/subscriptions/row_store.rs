/// 行ストア（PostgREST互換）のサブスクリプションクライアント
///
/// テーブルに直接アクセスするため、所有者の絞り込みをクエリで明示する。
/// 更新・削除は `Prefer: return=representation` で結果の行を受け取り、
/// 空の場合は該当レコードなしとして扱う。
use super::models::{Subscription, SubscriptionFormData, SubscriptionPatch};
use super::store::SubscriptionStore;
use crate::features::auth::{Session, SessionObservable};
use crate::shared::api_client::ApiClient;
use crate::shared::errors::{AppError, AppResult};
use reqwest::Method;
use serde::Serialize;

const TABLE: &str = "/subscriptions";
const RETURN_REPRESENTATION: &str = "return=representation";

/// 作成リクエストのボディ（所有者を含む）
#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    data: &'a SubscriptionFormData,
}

/// 行ストアのサブスクリプションクライアント
pub struct RowStoreSubscriptionClient {
    client: ApiClient,
    session: SessionObservable,
}

impl RowStoreSubscriptionClient {
    /// 新しいRowStoreSubscriptionClientを作成する
    ///
    /// # 引数
    /// * `client` - 行ストア用のHTTPクライアント（`apikey` 設定済み）
    /// * `session` - 所有者IDとアクセストークンの取得元
    pub fn new(client: ApiClient, session: SessionObservable) -> Self {
        Self { client, session }
    }

    fn current_session(&self) -> AppResult<Session> {
        self.session
            .current()
            .ok_or_else(|| AppError::unauthorized("ログインしていません"))
    }

    /// 所有者と対象IDで絞り込むエンドポイント
    fn owned_row(id: &str, owner: &str) -> String {
        format!("{TABLE}?id=eq.{}&user_id=eq.{}", encode(id), encode(owner))
    }

    /// 返された行から1件を取り出す（空ならNotFound）
    fn single(rows: Vec<Subscription>, id: &str) -> AppResult<Subscription> {
        rows.into_iter().next().ok_or_else(|| {
            AppError::NotFound(format!("ID {id} のサブスクリプションが見つかりません"))
        })
    }
}

impl SubscriptionStore for RowStoreSubscriptionClient {
    async fn list(&self) -> AppResult<Vec<Subscription>> {
        let session = self.current_session()?;
        let endpoint = format!(
            "{TABLE}?select=*&user_id=eq.{}&order=created_at.desc",
            encode(session.user_id())
        );
        let subscriptions: Vec<Subscription> = self
            .client
            .get(&endpoint, Some(&session.access_token))
            .await?;

        log::info!("サブスクリプション一覧を取得しました: count={}", subscriptions.len());
        Ok(subscriptions)
    }

    async fn create(&self, data: SubscriptionFormData) -> AppResult<Subscription> {
        let session = self.current_session()?;
        let request = self
            .client
            .request(Method::POST, TABLE, Some(&session.access_token))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&InsertRow {
                user_id: session.user_id(),
                data: &data,
            });

        let rows: Vec<Subscription> = self.client.send_json(request, "POST", TABLE).await?;
        let subscription = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::store("作成したレコードが返されませんでした"))?;

        log::info!("サブスクリプションを作成しました: id={}", subscription.id);
        Ok(subscription)
    }

    async fn update(&self, id: &str, patch: SubscriptionPatch) -> AppResult<Subscription> {
        let session = self.current_session()?;
        let endpoint = Self::owned_row(id, session.user_id());
        let request = self
            .client
            .request(Method::PATCH, &endpoint, Some(&session.access_token))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch);

        let rows: Vec<Subscription> = self.client.send_json(request, "PATCH", &endpoint).await?;
        let subscription = Self::single(rows, id)?;

        log::info!("サブスクリプションを更新しました: id={id}");
        Ok(subscription)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let session = self.current_session()?;
        let endpoint = Self::owned_row(id, session.user_id());
        let request = self
            .client
            .request(Method::DELETE, &endpoint, Some(&session.access_token))
            .header("Prefer", RETURN_REPRESENTATION);

        let rows: Vec<Subscription> = self.client.send_json(request, "DELETE", &endpoint).await?;
        Self::single(rows, id)?;

        log::info!("サブスクリプションを削除しました: id={id}");
        Ok(())
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
