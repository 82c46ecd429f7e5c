/// サブスクリプション登録・編集フォーム
///
/// 入力値を保持し、送信時にスキーマで検証する。検証に失敗した場合は
/// フィールドごとのエラーを保持したまま同じモードにとどまる。
use super::models::{Subscription, SubscriptionFormData};
use super::validation::{validate, FormField, SubscriptionDraft, ValidationErrors};
use crate::shared::utils::{format_iso_date, normalize_instant_in_zone, normalize_picker_date};
use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};

/// フォームのモード
#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    /// 新規登録
    Create,
    /// 既存レコードの編集
    Edit(Subscription),
}

/// フォームの状態
#[derive(Debug, Clone, PartialEq)]
pub struct FormController {
    mode: FormMode,
    draft: SubscriptionDraft,
    errors: ValidationErrors,
}

impl FormController {
    /// 新規登録フォーム（開始日は今日）
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            draft: SubscriptionDraft {
                start_date: format_iso_date(Local::now().date_naive()),
                ..SubscriptionDraft::default()
            },
            errors: ValidationErrors::new(),
        }
    }

    /// 既存レコードの値で埋めた編集フォーム
    pub fn edit(subscription: Subscription) -> Self {
        let draft = SubscriptionDraft {
            name: subscription.name.clone(),
            monthly_price: format_price_input(subscription.monthly_price),
            start_date: subscription.start_date.clone(),
            memo: subscription.memo.clone(),
        };
        Self {
            mode: FormMode::Edit(subscription),
            draft,
            errors: ValidationErrors::new(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    /// 編集中のレコード
    pub fn editing(&self) -> Option<&Subscription> {
        match &self.mode {
            FormMode::Edit(subscription) => Some(subscription),
            FormMode::Create => None,
        }
    }

    pub fn draft(&self) -> &SubscriptionDraft {
        &self.draft
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// フィールドのエラーメッセージ
    pub fn error_for(&self, field: FormField) -> Option<&str> {
        self.errors.message(field)
    }

    /// モーダルのタイトル
    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "サブスクリプション登録",
            FormMode::Edit(_) => "サブスクリプション編集",
        }
    }

    /// 送信ボタンのラベル
    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "登録",
            FormMode::Edit(_) => "更新",
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    pub fn set_monthly_price(&mut self, monthly_price: impl Into<String>) {
        self.draft.monthly_price = monthly_price.into();
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) {
        self.draft.memo = Some(memo.into());
    }

    /// 日付ピッカーの選択値を開始日に設定する
    ///
    /// 選択値のタイムゾーンでの暦日を使う。
    pub fn select_start_date(&mut self, selected: &DateTime<FixedOffset>) {
        self.draft.start_date = normalize_picker_date(selected);
    }

    /// UTCの瞬間として渡された選択値を、ピッカーのタイムゾーンでの暦日に変換して設定する
    pub fn select_start_date_in_zone<Tz: TimeZone>(&mut self, instant: &DateTime<Utc>, zone: &Tz) {
        self.draft.start_date = normalize_instant_in_zone(instant, zone);
    }

    /// 開始日をクリアする
    pub fn clear_start_date(&mut self) {
        self.draft.start_date.clear();
    }

    /// 送信する
    ///
    /// # 戻り値
    /// 検証済みのデータ、または失敗時はフィールドごとのエラー
    pub fn submit(&mut self) -> Result<SubscriptionFormData, ValidationErrors> {
        match validate(&self.draft) {
            Ok(data) => {
                self.errors.clear();
                Ok(data)
            }
            Err(errors) => {
                log::debug!("フォームの検証に失敗しました: {errors}");
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }
}

/// 月額を入力欄の文字列に変換する（整数は小数点なし）
fn format_price_input(price: f64) -> String {
    if price.fract() == 0.0 && price.is_finite() {
        format!("{price:.0}")
    } else {
        price.to_string()
    }
}
