//! Doc Date による期間フィルタ

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};

/// `days_back` 日前の日付（これ以降の行を残す）。0以下なら None
pub fn cutoff_date(days_back: i64, now: DateTime<Utc>) -> Option<NaiveDate> {
    if days_back <= 0 {
        return None;
    }
    now.date_naive().checked_sub_days(Days::new(days_back as u64))
}

/// 行を残すかどうか
///
/// パースできなかった日付は常に残す。
pub fn is_within_window(
    doc_date: Option<NaiveDateTime>,
    days_back: i64,
    now: DateTime<Utc>,
) -> bool {
    match (cutoff_date(days_back, now), doc_date) {
        (Some(cutoff), Some(date)) => date.date() >= cutoff,
        _ => true,
    }
}
