//! Laredo 検索結果スクレイパーモジュール
//!
//! テーブル行のパース → 期間フィルタ → Doc Number ごとの集約 → 再スクレイプのマージ

mod aggregate;
mod filter;
mod merge;
mod parser;
mod scraper;
mod types;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub use aggregate::{aggregate, Aggregator, PartyList};
pub use filter::{cutoff_date, is_within_window};
pub use merge::merge;
pub use parser::{find_role, parse_doc_date, parse_row, party_with_role, ColumnLayout};
pub use scraper::LaredoScraper;
pub use types::{party_key, Pages, ParsedRow, RawCell, RawRow, Record, RecordSet};

/// 1パスの集約設定
#[derive(Debug, Clone)]
pub struct PassOptions {
    pub county_slug: String,
    pub max_parties: usize,
    pub days_back: i64,
    pub layout: ColumnLayout,
}

impl PassOptions {
    pub fn new(county_slug: impl Into<String>, max_parties: usize, days_back: i64) -> Self {
        Self {
            county_slug: county_slug.into(),
            max_parties,
            days_back,
            layout: ColumnLayout::default(),
        }
    }
}

/// 生の行からレコード集合を作る（1パス分）
///
/// 読み飛ばした行・期間外の行は ID もパーティも消費しない。
pub fn collect_records(rows: &[RawRow], options: &PassOptions, now: DateTime<Utc>) -> RecordSet {
    let mut aggregator = Aggregator::new(options.county_slug.as_str(), options.max_parties);
    let mut skipped = 0usize;
    let mut filtered = 0usize;

    for (i, cells) in rows.iter().enumerate() {
        let row = match parse_row(cells, &options.layout) {
            Ok(row) => row,
            Err(reject) => {
                if reject.is_expected() {
                    debug!("Skipping row {}: {}", i, reject);
                } else {
                    warn!("Row parse error (row {}): {}", i, reject);
                }
                skipped += 1;
                continue;
            }
        };

        if !is_within_window(row.doc_date_parsed, options.days_back, now) {
            debug!(
                "Row {} ({}) dated {} is older than {} days",
                i, row.doc_number, row.doc_date_raw, options.days_back
            );
            filtered += 1;
            continue;
        }

        aggregator.push(row);
    }

    debug!(
        "Collected {} documents from {} rows ({} skipped, {} filtered)",
        aggregator.len(),
        rows.len(),
        skipped,
        filtered
    );
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(doc: &str, party: &str, doc_date: &str) -> RawRow {
        let mut cells = vec![RawCell::default(); 14];
        cells[3] = RawCell::text(doc);
        cells[4] = RawCell::party(party, "GRANTOR");
        cells[6] = RawCell::text(doc_date);
        cells[13] = RawCell::text("2");
        cells
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_filtered_rows_contribute_nothing() {
        let rows = vec![
            row("OLD", "ANCIENT", "Oct 1, 2026"),
            row("D1", "SMITH", "Oct 16, 2026"),
            row("D1", "JONES", "Oct 2, 2026"),
            row("D2", "BROWN", "unknown"),
        ];
        let records = collect_records(&rows, &PassOptions::new("c", 6, 2), now());

        assert_eq!(records.doc_numbers().collect::<Vec<_>>(), vec!["D1", "D2"]);
        let d1 = records.get("D1").unwrap();
        assert_eq!(d1.id, "c-1");
        assert_eq!(d1.parties[0], "SMITH (GRANTOR)");
        assert_eq!(d1.parties[1], "");
        assert_eq!(records.get("D2").unwrap().id, "c-2");
    }

    #[test]
    fn test_rejected_rows_are_skipped() {
        let mut broken = row("D3", "X", "");
        broken[5] = RawCell::failed("detached");
        let rows = vec![
            vec![RawCell::text("header")],
            row("", "NOBODY", ""),
            broken,
            row("D1", "SMITH", ""),
        ];
        let records = collect_records(&rows, &PassOptions::new("c", 6, 0), now());
        assert_eq!(records.len(), 1);
        assert_eq!(records.get("D1").unwrap().id, "c-1");
    }

    #[test]
    fn test_disabled_filter_keeps_old_rows() {
        let rows = vec![row("OLD", "ANCIENT", "Jan 1, 2001")];
        let records = collect_records(&rows, &PassOptions::new("c", 6, 0), now());
        assert_eq!(records.len(), 1);
    }
}
