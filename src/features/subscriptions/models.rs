use serde::{Deserialize, Deserializer, Serialize};

/// サブスクリプションデータモデル
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Subscription {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String, // 保存先が採番、以後不変
    #[serde(default)]
    pub user_id: String, // 所有者（セッションのユーザーID）
    pub name: String, // サービス名
    #[serde(default, deserialize_with = "lenient_price")]
    pub monthly_price: f64, // 月額（円）、0以上
    pub start_date: String, // YYYY-MM-DD形式
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default)]
    pub created_at: String, // 保存先が設定
    #[serde(default)]
    pub updated_at: String, // 保存先が設定
}

/// フォームから送信される検証済みデータ
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubscriptionFormData {
    pub name: String,
    pub monthly_price: f64,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// サブスクリプションの部分更新
///
/// `memo` は `None` で変更なし、`Some(None)` でメモを消去する。
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_nullable"
    )]
    pub memo: Option<Option<String>>,
}

impl SubscriptionPatch {
    /// 変更対象のフィールドが一つもないかどうか
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.monthly_price.is_none()
            && self.start_date.is_none()
            && self.memo.is_none()
    }

    /// 既存レコードに部分更新を適用した結果を返す
    pub fn apply_to(&self, existing: &Subscription) -> Subscription {
        Subscription {
            name: self.name.clone().unwrap_or_else(|| existing.name.clone()),
            monthly_price: self.monthly_price.unwrap_or(existing.monthly_price),
            start_date: self
                .start_date
                .clone()
                .unwrap_or_else(|| existing.start_date.clone()),
            memo: self.memo.clone().unwrap_or_else(|| existing.memo.clone()),
            ..existing.clone()
        }
    }
}

impl From<SubscriptionFormData> for SubscriptionPatch {
    fn from(data: SubscriptionFormData) -> Self {
        Self {
            name: Some(data.name),
            monthly_price: Some(data.monthly_price),
            start_date: Some(data.start_date),
            memo: Some(data.memo),
        }
    }
}

/// 数値IDを返す保存先にも対応するため、文字列・数値のどちらも受け付ける
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

/// 数値型カラムが文字列やnullで返ってきても0として扱う
fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let price = match value {
        Some(serde_json::Value::Number(number)) => number.as_f64(),
        Some(serde_json::Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(match price {
        Some(price) if price.is_finite() => price,
        _ => {
            log::warn!("月額が数値ではないため0として扱います");
            0.0
        }
    })
}

/// キーが存在する場合は `Some(値)`（nullなら `Some(None)`）にする
fn present_nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
