//! 再スクレイプ結果のマージ

use tracing::debug;

use super::types::RecordSet;

/// 後のパスのレコードで前の結果を上書きする
///
/// 同じ Doc Number は位置を保ったままレコードごと置き換え（フィールド単位のマージはしない）、
/// 新しい Doc Number は末尾に追加する。
pub fn merge(mut base: RecordSet, incoming: RecordSet) -> RecordSet {
    let mut replaced = 0usize;
    let mut added = 0usize;
    for record in incoming.into_vec() {
        match base.upsert(record) {
            Some(_) => replaced += 1,
            None => added += 1,
        }
    }
    debug!("Merged rescrape pass: {} replaced, {} added", replaced, added);
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laredo::types::{Pages, Record};

    fn record(doc: &str, pages: i64) -> Record {
        Record {
            id: format!("c-{}", pages),
            doc_number: doc.into(),
            pages: Pages::Count(pages),
            ..Default::default()
        }
    }

    #[test]
    fn test_later_pass_takes_precedence() {
        let base: RecordSet = vec![record("A", 1), record("B", 2)].into_iter().collect();
        let incoming: RecordSet = vec![record("B", 3), record("C", 4)].into_iter().collect();

        let merged = merge(base, incoming);

        assert_eq!(merged.doc_numbers().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(merged.get("A").unwrap().pages, Pages::Count(1));
        assert_eq!(merged.get("B").unwrap().pages, Pages::Count(3));
        assert_eq!(merged.get("C").unwrap().pages, Pages::Count(4));
    }

    #[test]
    fn test_replacement_is_whole_record() {
        let mut old = record("A", 1);
        old.doc_type = "DEED".into();
        let base: RecordSet = vec![old].into_iter().collect();
        let incoming: RecordSet = vec![record("A", 5)].into_iter().collect();

        let merged = merge(base, incoming);
        assert_eq!(merged.get("A").unwrap().doc_type, "");
        assert_eq!(merged.get("A").unwrap().id, "c-5");
    }

    #[test]
    fn test_successive_passes_apply_in_order() {
        let base: RecordSet = vec![record("A", 1)].into_iter().collect();
        let pass1: RecordSet = vec![record("A", 2)].into_iter().collect();
        let pass2: RecordSet = vec![record("A", 3), record("B", 1)].into_iter().collect();

        let merged = [pass1, pass2].into_iter().fold(base, merge);
        assert_eq!(merged.get("A").unwrap().pages, Pages::Count(3));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_empty_incoming_keeps_base() {
        let base: RecordSet = vec![record("A", 1)].into_iter().collect();
        let merged = merge(base.clone(), RecordSet::new());
        assert_eq!(merged, base);
    }
}
