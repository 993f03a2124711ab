//! 検索結果テーブルの行パーサ

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::RowReject;

use super::types::{Pages, ParsedRow, RawCell};

/// 日付フォーマット（先にマッチしたものを採用）
const DATETIME_FORMAT: &str = "%b %d, %Y, %I:%M %p";
const DATE_FORMAT: &str = "%b %d, %Y";

static ROLES: [&str; 2] = ["GRANTOR", "GRANTEE"];

/// 列の位置（0始まり）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub min_cells: usize,
    pub doc_number: usize,
    pub party: usize,
    pub book_page: usize,
    pub doc_date: usize,
    pub recorded_date: usize,
    pub doc_type: usize,
    pub assoc_doc: usize,
    pub legal_summary: usize,
    pub consideration: usize,
    pub additional_party: usize,
    pub pages: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            min_cells: 14,
            doc_number: 3,
            party: 4,
            book_page: 5,
            doc_date: 6,
            recorded_date: 7,
            doc_type: 8,
            assoc_doc: 9,
            legal_summary: 10,
            consideration: 11,
            additional_party: 12,
            pages: 13,
        }
    }
}

/// 1行をパース
pub fn parse_row(cells: &[RawCell], layout: &ColumnLayout) -> Result<ParsedRow, RowReject> {
    if cells.len() < layout.min_cells {
        return Err(RowReject::TooFewCells {
            found: cells.len(),
            required: layout.min_cells,
        });
    }

    let cell = |column: usize| -> Result<&RawCell, RowReject> {
        let cell = cells.get(column).ok_or(RowReject::TooFewCells {
            found: cells.len(),
            required: column + 1,
        })?;
        match &cell.error {
            Some(reason) => Err(RowReject::Malformed {
                column,
                reason: reason.clone(),
            }),
            None => Ok(cell),
        }
    };
    let text = |column: usize| cell(column).map(|c| c.text.trim().to_string());

    let doc_number = text(layout.doc_number)?;
    if doc_number.is_empty() {
        return Err(RowReject::MissingDocNumber);
    }

    let doc_date_raw = text(layout.doc_date)?;
    let pages_raw = text(layout.pages)?;

    Ok(ParsedRow {
        doc_number,
        party_text: party_with_role(cell(layout.party)?),
        additional_party_text: party_with_role(cell(layout.additional_party)?),
        book_page: text(layout.book_page)?,
        doc_date_parsed: parse_doc_date(&doc_date_raw),
        doc_date_raw,
        recorded_date_raw: text(layout.recorded_date)?,
        doc_type: text(layout.doc_type)?,
        assoc_doc: text(layout.assoc_doc)?,
        legal_summary: text(layout.legal_summary)?,
        consideration: text(layout.consideration)?,
        pages: Pages::coerce(&pages_raw),
    })
}

/// パーティセルから `"NAME (ROLE)"` を組み立てる
///
/// 名前要素があればそのテキスト（空でもフォールバックしない）、なければセル全体のテキスト。
pub fn party_with_role(cell: &RawCell) -> String {
    let name = cell.name.as_deref().unwrap_or(&cell.text).trim();
    if name.is_empty() {
        return String::new();
    }

    match cell.chip.as_deref().and_then(find_role) {
        Some(role) => format!("{} ({})", name, role),
        None => name.to_string(),
    }
}

/// チップテキストから GRANTOR / GRANTEE を単語単位・大小文字無視で探す
pub fn find_role(chip: &str) -> Option<&'static str> {
    chip.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find_map(|word| ROLES.iter().find(|role| word.eq_ignore_ascii_case(role)))
        .copied()
}

/// Doc Date をパース（どちらの形式にも合わなければ None）
pub fn parse_doc_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
