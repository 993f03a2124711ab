//! 同じ Doc Number の行を1レコードにまとめる

use indexmap::IndexMap;
use tracing::debug;

use super::types::{ParsedRow, Record, RecordSet};

/// Doc Number ごとのパーティ一覧（初出順・重複なし）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyList {
    parties: Vec<String>,
}

impl PartyList {
    /// 空でなく未登録なら追加。追加したら true
    pub fn push(&mut self, party: &str) -> bool {
        let party = party.trim();
        if party.is_empty() || self.parties.iter().any(|p| p == party) {
            return false;
        }
        self.parties.push(party.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    /// Party1..N のスロットに詰める（溢れた分は捨てる）
    pub fn fill_slots(&self, slots: &mut [String]) {
        for (slot, party) in slots.iter_mut().zip(&self.parties) {
            slot.clone_from(party);
        }
    }
}

struct Entry {
    record: Record,
    parties: PartyList,
}

/// 1パス分の集約器
pub struct Aggregator {
    county_slug: String,
    max_parties: usize,
    entries: IndexMap<String, Entry>,
}

impl Aggregator {
    pub fn new(county_slug: impl Into<String>, max_parties: usize) -> Self {
        Self {
            county_slug: county_slug.into(),
            max_parties,
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, row: ParsedRow) {
        let next_id = self.entries.len() + 1;
        let entry = match self.entries.entry(row.doc_number.clone()) {
            indexmap::map::Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                merge_fields(&mut entry.record, &row);
                entry
            }
            indexmap::map::Entry::Vacant(vacant) => {
                debug!("New document {} (#{})", row.doc_number, next_id);
                vacant.insert(Entry {
                    record: new_record(&self.county_slug, next_id, self.max_parties, &row),
                    parties: PartyList::default(),
                })
            }
        };

        entry.parties.push(&row.party_text);
        entry.parties.push(&row.additional_party_text);
    }

    pub fn finish(self) -> RecordSet {
        self.entries
            .into_values()
            .map(|mut entry| {
                if entry.parties.len() > entry.record.parties.len() {
                    debug!(
                        "Document {} has {} parties, keeping first {}",
                        entry.record.doc_number,
                        entry.parties.len(),
                        entry.record.parties.len()
                    );
                }
                entry.parties.fill_slots(&mut entry.record.parties);
                entry.record
            })
            .collect()
    }
}

/// 行の列を集約してレコード集合を作る（初出順）
pub fn aggregate<I>(rows: I, county_slug: &str, max_parties: usize) -> RecordSet
where
    I: IntoIterator<Item = ParsedRow>,
{
    let mut aggregator = Aggregator::new(county_slug, max_parties);
    for row in rows {
        aggregator.push(row);
    }
    aggregator.finish()
}

fn new_record(county_slug: &str, n: usize, max_parties: usize, row: &ParsedRow) -> Record {
    Record {
        id: format!("{}-{}", county_slug, n),
        doc_number: row.doc_number.clone(),
        parties: vec![String::new(); max_parties],
        book_page: row.book_page.clone(),
        doc_date: row.doc_date_raw.clone(),
        recorded_date: row.recorded_date_raw.clone(),
        doc_type: row.doc_type.clone(),
        assoc_doc: row.assoc_doc.clone(),
        legal_summary: row.legal_summary.clone(),
        consideration: row.consideration.clone(),
        pages: row.pages.clone(),
    }
}

/// 空のフィールドだけを埋める（先に入った値を優先）
fn merge_fields(record: &mut Record, row: &ParsedRow) {
    fill_empty(&mut record.book_page, &row.book_page);
    fill_empty(&mut record.doc_date, &row.doc_date_raw);
    fill_empty(&mut record.recorded_date, &row.recorded_date_raw);
    fill_empty(&mut record.doc_type, &row.doc_type);
    fill_empty(&mut record.assoc_doc, &row.assoc_doc);
    fill_empty(&mut record.legal_summary, &row.legal_summary);
    fill_empty(&mut record.consideration, &row.consideration);

    // 文字列のままなら毎回再変換する（文字列同士で上書きされることもある）
    if record.pages.needs_coercion() && !row.pages.is_blank() {
        record.pages = row.pages.clone();
    }
}

fn fill_empty(current: &mut String, candidate: &str) {
    if current.is_empty() && !candidate.is_empty() {
        *current = candidate.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laredo::types::Pages;

    fn row(doc: &str, party: &str, additional: &str) -> ParsedRow {
        ParsedRow {
            doc_number: doc.into(),
            party_text: party.into(),
            additional_party_text: additional.into(),
            book_page: String::new(),
            doc_date_raw: String::new(),
            recorded_date_raw: String::new(),
            doc_type: String::new(),
            assoc_doc: String::new(),
            legal_summary: String::new(),
            consideration: String::new(),
            pages: Pages::default(),
            doc_date_parsed: None,
        }
    }

    #[test]
    fn test_unique_doc_numbers_in_first_seen_order() {
        let rows = vec![row("B", "", ""), row("A", "", ""), row("B", "", ""), row("C", "", "")];
        let records = aggregate(rows, "st-charles-county", 6);

        assert_eq!(records.doc_numbers().collect::<Vec<_>>(), vec!["B", "A", "C"]);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["st-charles-county-1", "st-charles-county-2", "st-charles-county-3"]
        );
    }

    #[test]
    fn test_first_non_empty_wins() {
        let mut first = row("D1", "", "");
        first.doc_type = "WARRANTY DEED".into();
        let mut second = row("D1", "", "");
        second.doc_type = String::new();
        second.book_page = "B9/P1".into();
        let mut third = row("D1", "", "");
        third.doc_type = "RELEASE".into();
        third.book_page = "B7/P2".into();
        third.consideration = "$10.00".into();

        let records = aggregate(vec![first, second, third], "c", 6);
        let record = records.get("D1").unwrap();
        assert_eq!(record.doc_type, "WARRANTY DEED");
        assert_eq!(record.book_page, "B9/P1");
        assert_eq!(record.consideration, "$10.00");
    }

    #[test]
    fn test_party_order_and_cap() {
        let rows = vec![
            row("D1", "P1 (GRANTOR)", "P2 (GRANTEE)"),
            row("D1", "P3", "P4"),
            row("D1", "P5", "P6"),
            row("D1", "P7", "P8"),
        ];
        let records = aggregate(rows, "c", 6);
        let record = records.get("D1").unwrap();

        assert_eq!(
            record.parties,
            vec!["P1 (GRANTOR)", "P2 (GRANTEE)", "P3", "P4", "P5", "P6"]
        );
        let keys: Vec<String> = record.columns().into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"Party6".to_string()));
        assert!(!keys.contains(&"Party7".to_string()));
    }

    #[test]
    fn test_party_dedup_and_blank_slots() {
        let rows = vec![
            row("D1", "SMITH JOHN (GRANTOR)", ""),
            row("D1", " SMITH JOHN (GRANTOR) ", "BANK (GRANTEE)"),
            row("D1", "SMITH JOHN", "   "),
        ];
        let records = aggregate(rows, "c", 4);
        assert_eq!(
            records.get("D1").unwrap().parties,
            vec!["SMITH JOHN (GRANTOR)", "BANK (GRANTEE)", "SMITH JOHN", ""]
        );
    }

    #[test]
    fn test_pages_recoercion() {
        let mut first = row("D1", "", "");
        first.pages = Pages::Text("see image".into());
        let mut second = row("D1", "", "");
        second.pages = Pages::Text("2 pp".into());
        let mut third = row("D1", "", "");
        third.pages = Pages::Count(3);
        let mut fourth = row("D1", "", "");
        fourth.pages = Pages::Count(9);

        let records = aggregate(vec![first.clone(), second.clone()], "c", 1);
        assert_eq!(records.get("D1").unwrap().pages, Pages::Text("2 pp".into()));

        let records = aggregate(vec![first, second, third, fourth], "c", 1);
        assert_eq!(records.get("D1").unwrap().pages, Pages::Count(3));
    }

    #[test]
    fn test_blank_pages_does_not_overwrite() {
        let mut first = row("D1", "", "");
        first.pages = Pages::Text("n/a".into());
        let second = row("D1", "", "");
        let records = aggregate(vec![first, second], "c", 1);
        assert_eq!(records.get("D1").unwrap().pages, Pages::Text("n/a".into()));
    }

    #[test]
    fn test_zero_parties() {
        let records = aggregate(vec![row("D1", "A", "B")], "c", 0);
        assert!(records.get("D1").unwrap().parties.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new(), "c", 6).is_empty());
    }
}
