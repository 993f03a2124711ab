//! Laredo 検索結果の型定義

use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// テーブルの1セル（ブラウザ側で読み取ったテキスト）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCell {
    /// セル全体のテキスト
    #[serde(default)]
    pub text: String,
    /// 入れ子の名前要素 (`span`) のテキスト
    #[serde(default)]
    pub name: Option<String>,
    /// ロールチップ (`.party-chip`) のテキスト
    #[serde(default)]
    pub chip: Option<String>,
    /// 読み取りに失敗した場合のエラー
    #[serde(default)]
    pub error: Option<String>,
}

impl RawCell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn party(name: impl Into<String>, chip: impl Into<String>) -> Self {
        let name = name.into();
        let chip = chip.into();
        Self {
            text: format!("{} {}", name, chip).trim().to_string(),
            name: Some(name),
            chip: Some(chip),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// テーブルの1行
pub type RawRow = Vec<RawCell>;

/// Pages 列: 整数に変換できればその値、できなければ元の文字列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pages {
    Count(i64),
    Text(String),
}

impl Default for Pages {
    fn default() -> Self {
        Pages::Text(String::new())
    }
}

impl Pages {
    pub fn coerce(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) => Pages::Count(n),
            Err(_) => Pages::Text(raw.to_string()),
        }
    }

    /// 元のセルが空だったか
    pub fn is_blank(&self) -> bool {
        matches!(self, Pages::Text(s) if s.is_empty())
    }

    /// 後続行で再変換を試みるべきか（文字列のまま、または 0）
    pub fn needs_coercion(&self) -> bool {
        matches!(self, Pages::Text(_) | Pages::Count(0))
    }
}

impl fmt::Display for Pages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pages::Count(n) => write!(f, "{}", n),
            Pages::Text(s) => f.write_str(s),
        }
    }
}

/// 1行分のパース結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub doc_number: String,
    pub party_text: String,
    pub additional_party_text: String,
    pub book_page: String,
    pub doc_date_raw: String,
    pub recorded_date_raw: String,
    pub doc_type: String,
    pub assoc_doc: String,
    pub legal_summary: String,
    pub consideration: String,
    pub pages: Pages,
    pub doc_date_parsed: Option<NaiveDateTime>,
}

pub const KEY_ID: &str = "id";
pub const KEY_DOC_NUMBER: &str = "Doc Number";
pub const KEY_BOOK_PAGE: &str = "Book & Page";
pub const KEY_DOC_DATE: &str = "Doc Date";
pub const KEY_RECORDED_DATE: &str = "Recorded Date";
pub const KEY_DOC_TYPE: &str = "Doc Type";
pub const KEY_ASSOC_DOC: &str = "Assoc Doc";
pub const KEY_LEGAL_SUMMARY: &str = "Legal Summary";
pub const KEY_CONSIDERATION: &str = "Consideration";
pub const KEY_PAGES: &str = "Pages";
const PARTY_PREFIX: &str = "Party";

pub fn party_key(slot: usize) -> String {
    format!("{}{}", PARTY_PREFIX, slot)
}

/// 出力レコード（Doc Number ごとに1件）
///
/// JSON のキー順は固定: id, Doc Number, Party1..N, Book & Page, Doc Date,
/// Recorded Date, Doc Type, Assoc Doc, Legal Summary, Consideration, Pages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub doc_number: String,
    /// Party1..N（未使用スロットは空文字列）
    pub parties: Vec<String>,
    pub book_page: String,
    pub doc_date: String,
    pub recorded_date: String,
    pub doc_type: String,
    pub assoc_doc: String,
    pub legal_summary: String,
    pub consideration: String,
    pub pages: Pages,
}

impl Record {
    /// パーティ以外の文字列フィールド（キー名付き、出力順）
    fn text_fields(&self) -> [(&'static str, &str); 7] {
        [
            (KEY_BOOK_PAGE, &self.book_page),
            (KEY_DOC_DATE, &self.doc_date),
            (KEY_RECORDED_DATE, &self.recorded_date),
            (KEY_DOC_TYPE, &self.doc_type),
            (KEY_ASSOC_DOC, &self.assoc_doc),
            (KEY_LEGAL_SUMMARY, &self.legal_summary),
            (KEY_CONSIDERATION, &self.consideration),
        ]
    }

    /// CSV 用のキーと値（出力順）
    pub fn columns(&self) -> Vec<(String, String)> {
        let mut columns = Vec::with_capacity(self.parties.len() + 10);
        columns.push((KEY_ID.to_string(), self.id.clone()));
        columns.push((KEY_DOC_NUMBER.to_string(), self.doc_number.clone()));
        for (i, party) in self.parties.iter().enumerate() {
            columns.push((party_key(i + 1), party.clone()));
        }
        for (key, value) in self.text_fields() {
            columns.push((key.to_string(), value.to_string()));
        }
        columns.push((KEY_PAGES.to_string(), self.pages.to_string()));
        columns
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.parties.len() + 10))?;
        map.serialize_entry(KEY_ID, &self.id)?;
        map.serialize_entry(KEY_DOC_NUMBER, &self.doc_number)?;
        for (i, party) in self.parties.iter().enumerate() {
            map.serialize_entry(&party_key(i + 1), party)?;
        }
        for (key, value) in self.text_fields() {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(KEY_PAGES, &self.pages)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = IndexMap::<String, Value>::deserialize(deserializer)?;
        Record::try_from(fields).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<IndexMap<String, Value>> for Record {
    type Error = String;

    fn try_from(mut fields: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        fn text(fields: &mut IndexMap<String, Value>, key: &str) -> Result<String, String> {
            match fields.shift_remove(key) {
                None | Some(Value::Null) => Ok(String::new()),
                Some(Value::String(s)) => Ok(s),
                Some(Value::Number(n)) => Ok(n.to_string()),
                Some(other) => Err(format!("field {:?} has unexpected value {}", key, other)),
            }
        }

        let doc_number = text(&mut fields, KEY_DOC_NUMBER)?;
        if doc_number.is_empty() {
            return Err(format!("missing field {:?}", KEY_DOC_NUMBER));
        }
        let id = text(&mut fields, KEY_ID)?;

        let pages = match fields.shift_remove(KEY_PAGES) {
            None | Some(Value::Null) => Pages::default(),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(n) => Pages::Count(n),
                None => Pages::Text(n.to_string()),
            },
            Some(Value::String(s)) => Pages::Text(s),
            Some(other) => return Err(format!("field {:?} has unexpected value {}", KEY_PAGES, other)),
        };

        let mut record = Record {
            id,
            doc_number,
            parties: Vec::new(),
            book_page: text(&mut fields, KEY_BOOK_PAGE)?,
            doc_date: text(&mut fields, KEY_DOC_DATE)?,
            recorded_date: text(&mut fields, KEY_RECORDED_DATE)?,
            doc_type: text(&mut fields, KEY_DOC_TYPE)?,
            assoc_doc: text(&mut fields, KEY_ASSOC_DOC)?,
            legal_summary: text(&mut fields, KEY_LEGAL_SUMMARY)?,
            consideration: text(&mut fields, KEY_CONSIDERATION)?,
            pages,
        };

        // PartyN は番号で位置を決める
        let slots: Vec<(usize, String)> = fields
            .keys()
            .filter_map(|key| {
                let slot = key.strip_prefix(PARTY_PREFIX)?.parse::<usize>().ok()?;
                (slot >= 1).then(|| (slot, key.clone()))
            })
            .collect();
        if let Some(max_slot) = slots.iter().map(|(slot, _)| *slot).max() {
            record.parties = vec![String::new(); max_slot];
            for (slot, key) in slots {
                record.parties[slot - 1] = text(&mut fields, &key)?;
            }
        }

        Ok(record)
    }
}

/// Doc Number をキーにした挿入順保持のレコード集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    records: IndexMap<String, Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, doc_number: &str) -> Option<&Record> {
        self.records.get(doc_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn doc_numbers(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// 同じ Doc Number があれば位置を保ったまま丸ごと置き換え、なければ末尾に追加
    pub fn upsert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.doc_number.clone(), record)
    }

    pub fn into_vec(self) -> Vec<Record> {
        self.records.into_values().collect()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut set = RecordSet::new();
        for record in iter {
            set.upsert(record);
        }
        set
    }
}

impl Serialize for RecordSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in self.records.values() {
            seq.serialize_element(record)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RecordSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<Record>::deserialize(deserializer)?.into_iter().collect())
    }
}
