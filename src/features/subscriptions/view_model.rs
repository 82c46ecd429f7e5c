use super::models::Subscription;
use crate::shared::utils::{format_japanese_date, format_yen};
use serde::Serialize;

pub const DELETE_CONFIRMATION_MESSAGE: &str = "このサブスクリプションを削除してもよろしいですか？";
pub const SIGN_OUT_CONFIRMATION_MESSAGE: &str = "ログアウトしてもよろしいですか？";

/// 月額合計を計算する
///
/// 数値でない（非有限の）月額は0として扱う。空の場合は0。
pub fn monthly_total(subscriptions: &[Subscription]) -> f64 {
    subscriptions
        .iter()
        .map(|subscription| subscription.monthly_price)
        .filter(|price| price.is_finite())
        .sum()
}

/// 一覧の1行分の表示内容
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionCard {
    pub id: String,
    pub name: String,
    /// 例: `¥1,500/月`
    pub price_label: String,
    /// 例: `開始日: 2024年1月1日`
    pub start_date_label: String,
    /// 例: `メモ: 家族プラン`
    pub memo_label: Option<String>,
}

impl From<&Subscription> for SubscriptionCard {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id.clone(),
            name: subscription.name.clone(),
            price_label: format!("{}/月", format_yen(subscription.monthly_price)),
            start_date_label: format!("開始日: {}", format_japanese_date(&subscription.start_date)),
            memo_label: subscription
                .memo
                .as_deref()
                .filter(|memo| !memo.is_empty())
                .map(|memo| format!("メモ: {memo}")),
        }
    }
}

/// 一覧と合計の表示内容
///
/// 並び順は保持しているコレクションの順序のまま（再ソートしない）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionListView {
    pub cards: Vec<SubscriptionCard>,
    pub total: f64,
    /// 例: `¥3,000`
    pub total_label: String,
}

impl SubscriptionListView {
    pub fn build(subscriptions: &[Subscription]) -> Self {
        let total = monthly_total(subscriptions);
        Self {
            cards: subscriptions.iter().map(SubscriptionCard::from).collect(),
            total,
            total_label: format_yen(total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// 一覧の行に対する操作
#[derive(Debug, Clone, PartialEq)]
pub enum ListIntent {
    /// 編集（レコード全体を渡す）
    Edit(Subscription),
    /// 削除（確認済みのID）
    Delete(String),
}

/// 削除・サインアウト前の確認ダイアログ
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// 編集の操作を作る
pub fn edit_intent(subscription: &Subscription) -> ListIntent {
    ListIntent::Edit(subscription.clone())
}

/// 確認が得られた場合のみ削除の操作を作る
pub fn delete_intent(subscription: &Subscription, confirm: &impl Confirm) -> Option<ListIntent> {
    if confirm.confirm(DELETE_CONFIRMATION_MESSAGE) {
        Some(ListIntent::Delete(subscription.id.clone()))
    } else {
        log::debug!("削除がキャンセルされました: id={}", subscription.id);
        None
    }
}
