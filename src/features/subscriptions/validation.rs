/// サブスクリプションフォームの入力スキーマ
///
/// フォームの生入力を検証し、検証済みの `SubscriptionFormData` か
/// フィールドごとのエラーを返す。I/Oは行わない。
use super::models::SubscriptionFormData;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const NAME_REQUIRED_MESSAGE: &str = "名前を入力してください";
pub const PRICE_OUT_OF_RANGE_MESSAGE: &str = "0以上の数値を入力してください";
pub const START_DATE_REQUIRED_MESSAGE: &str = "開始日は必須です";

/// フォームのフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Name,
    MonthlyPrice,
    StartDate,
    Memo,
}

impl FormField {
    /// フォーム上のフィールド名
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::MonthlyPrice => "monthly_price",
            FormField::StartDate => "start_date",
            FormField::Memo => "memo",
        }
    }
}

/// フィールドエラーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldErrorKind {
    /// 未入力
    EmptyField,
    /// 数値でない、または範囲外
    OutOfRange,
}

/// フィールド単位のエラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

/// フィールド名からエラーへの対応
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<FormField, FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FormField, kind: FieldErrorKind, message: &str) {
        self.0.insert(
            field,
            FieldError {
                kind,
                message: message.to_string(),
            },
        );
    }

    pub fn get(&self, field: FormField) -> Option<&FieldError> {
        self.0.get(&field)
    }

    /// フィールドのエラーメッセージ（インライン表示用）
    pub fn message(&self, field: FormField) -> Option<&str> {
        self.get(field).map(|error| error.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.0.keys().copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|(field, error)| format!("{}: {}", field.as_str(), error.message))
            .collect();
        write!(f, "{}", messages.join(", "))
    }
}

/// フォームの生入力（未検証）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionDraft {
    pub name: String,
    /// 入力欄の文字列そのまま
    pub monthly_price: String,
    pub start_date: String,
    pub memo: Option<String>,
}

/// 生入力を検証する
///
/// すべてのフィールドを検証し、失敗したフィールドのエラーをまとめて返す。
pub fn validate(draft: &SubscriptionDraft) -> Result<SubscriptionFormData, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = draft.name.trim();
    if name.is_empty() {
        errors.insert(FormField::Name, FieldErrorKind::EmptyField, NAME_REQUIRED_MESSAGE);
    }

    let monthly_price = parse_price(&draft.monthly_price);
    if monthly_price.is_none() {
        errors.insert(
            FormField::MonthlyPrice,
            FieldErrorKind::OutOfRange,
            PRICE_OUT_OF_RANGE_MESSAGE,
        );
    }

    let start_date = draft.start_date.trim();
    if start_date.is_empty() {
        errors.insert(
            FormField::StartDate,
            FieldErrorKind::EmptyField,
            START_DATE_REQUIRED_MESSAGE,
        );
    }

    match monthly_price {
        Some(monthly_price) if errors.is_empty() => Ok(SubscriptionFormData {
            name: name.to_string(),
            monthly_price,
            start_date: start_date.to_string(),
            memo: draft
                .memo
                .as_deref()
                .map(str::trim)
                .filter(|memo| !memo.is_empty())
                .map(str::to_string),
        }),
        _ => Err(errors),
    }
}

/// 月額の入力文字列を解析する（有限かつ0以上のみ有効）
fn parse_price(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}
