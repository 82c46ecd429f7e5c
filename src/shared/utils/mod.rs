/// 単調増加ID生成
pub mod id;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc};
use chrono_tz::Asia::Tokyo;

pub use id::MonotonicIdGenerator;

/// 現在の日時をJST（日本標準時）で取得
///
/// # 戻り値
/// ミリ秒精度・固定長のRFC3339文字列（文字列比較で時刻順に並ぶ）
pub fn get_current_jst_timestamp() -> String {
    Utc::now()
        .with_timezone(&Tokyo)
        .to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// 日付ピッカーの選択値をカレンダー日付文字列（YYYY-MM-DD）に変換する
///
/// ピッカーが返すのはタイムゾーン付きの日時なので、そのタイムゾーンでの
/// 暦日を使う。UTCの日付を使うとUTCより西のタイムゾーンで前日にずれる。
pub fn normalize_picker_date(selected: &DateTime<FixedOffset>) -> String {
    format_iso_date(selected.date_naive())
}

/// UTCの瞬間を指定タイムゾーンでの暦日文字列に変換する
pub fn normalize_instant_in_zone<Tz: TimeZone>(instant: &DateTime<Utc>, zone: &Tz) -> String {
    format_iso_date(instant.with_timezone(zone).date_naive())
}

/// NaiveDateをYYYY-MM-DD形式に整形する
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// YYYY-MM-DD形式の文字列を日付として解析する
pub fn parse_iso_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").ok()
}

/// 日付文字列を「2024年1月1日」形式で表示する
///
/// 解析できない文字列はそのまま返す。
pub fn format_japanese_date(date_str: &str) -> String {
    match parse_iso_date(date_str) {
        Some(date) => format!("{}年{}月{}日", date.year(), date.month(), date.day()),
        None => date_str.to_string(),
    }
}

/// 金額を円表示にフォーマットする（整数円・カンマ区切り）
///
/// # 例
/// `1500.0` -> `¥1,500`
pub fn format_yen(amount: f64) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0 {
        format!("-¥{grouped}")
    } else {
        format!("¥{grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use chrono_tz::America::Los_Angeles;
    use chrono_tz::Pacific::Kiritimati;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_get_current_jst_timestamp() {
        let timestamp = get_current_jst_timestamp();
        assert!(timestamp.contains('T'));
        assert!(timestamp.ends_with("+09:00"));
    }

    #[test]
    fn test_normalize_picker_date_uses_local_day() {
        // UTC-8 の深夜: UTCでは翌日だがローカルでは3月10日
        let selected = DateTime::parse_from_rfc3339("2024-03-10T23:30:00-08:00").unwrap();
        assert_eq!(normalize_picker_date(&selected), "2024-03-10");

        // UTC+9 の0時: UTCでは前日だがローカルでは3月10日
        let selected = DateTime::parse_from_rfc3339("2024-03-10T00:00:00+09:00").unwrap();
        assert_eq!(normalize_picker_date(&selected), "2024-03-10");
    }

    #[test]
    fn test_normalize_instant_in_zone() {
        // ロサンゼルスの3月10日0時 = UTC 3月10日8時
        let local_midnight = Los_Angeles
            .with_ymd_and_hms(2024, 3, 10, 0, 0, 0)
            .single()
            .unwrap();
        let instant = local_midnight.with_timezone(&Utc);
        assert_eq!(normalize_instant_in_zone(&instant, &Los_Angeles), "2024-03-10");

        // キリバス(UTC+14)の3月10日0時 = UTC 3月9日10時
        let local_midnight = Kiritimati
            .with_ymd_and_hms(2024, 3, 10, 0, 0, 0)
            .single()
            .unwrap();
        let instant = local_midnight.with_timezone(&Utc);
        assert_eq!(normalize_instant_in_zone(&instant, &Kiritimati), "2024-03-10");
    }

    #[quickcheck]
    fn prop_picker_date_matches_local_day_for_any_offset(
        offset_quarter_hours: i8,
        seconds_of_day: u32,
    ) -> bool {
        // -12:00 〜 +14:00 の範囲に収める
        let quarters = (offset_quarter_hours as i32).rem_euclid(105) - 48;
        let offset = FixedOffset::east_opt(quarters * 15 * 60).unwrap();
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds_of_day % 86_400, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let selected = offset
            .from_local_datetime(&day.and_time(time))
            .single()
            .unwrap();

        normalize_picker_date(&selected) == "2024-03-10"
    }

    #[test]
    fn test_format_japanese_date() {
        assert_eq!(format_japanese_date("2024-01-01"), "2024年1月1日");
        assert_eq!(format_japanese_date("2024-12-31"), "2024年12月31日");
        assert_eq!(format_japanese_date("不明"), "不明");
    }

    #[test]
    fn test_format_yen() {
        assert_eq!(format_yen(0.0), "¥0");
        assert_eq!(format_yen(980.0), "¥980");
        assert_eq!(format_yen(1500.0), "¥1,500");
        assert_eq!(format_yen(1234567.0), "¥1,234,567");
        assert_eq!(format_yen(1499.6), "¥1,500");
        assert_eq!(format_yen(f64::NAN), "¥0");
        assert_eq!(format_yen(-1200.0), "-¥1,200");
    }

    #[test]
    fn test_parse_iso_date() {
        assert!(parse_iso_date("2024-02-29").is_some());
        assert!(parse_iso_date("2023-02-29").is_none());
        assert!(parse_iso_date("2024/01/01").is_none());
    }
}
