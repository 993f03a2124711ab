//! JSON / CSV 出力

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde_json::Value;
use tracing::info;

use crate::error::ScraperError;
use crate::laredo::RecordSet;

/// CSV 用の表（ヘッダは全レコードのキーの和集合、初出順）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// キーと値の組の列から表を作る。欠けている列は空セル
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<(String, String)>>,
    {
        let rows: Vec<Vec<(String, String)>> = rows.into_iter().collect();

        let mut headers = IndexSet::new();
        for row in &rows {
            for (key, _) in row {
                if !headers.contains(key) {
                    headers.insert(key.clone());
                }
            }
        }

        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells = vec![String::new(); headers.len()];
                for (key, value) in row {
                    if let Some(i) = headers.get_index_of(&key) {
                        cells[i] = value;
                    }
                }
                cells
            })
            .collect();

        Self {
            headers: headers.into_iter().collect(),
            rows,
        }
    }

    pub fn from_records(records: &RecordSet) -> Self {
        Self::from_rows(records.iter().map(|record| record.columns()))
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ScraperError> {
        let mut writer = csv::Writer::from_path(path)?;
        if !self.headers.is_empty() {
            writer.write_record(&self.headers)?;
        }
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// 構造化ドキュメント（JSON配列）と表の両方を作る
pub fn serialize(records: &RecordSet) -> Result<(Value, Table), ScraperError> {
    Ok((serde_json::to_value(records)?, Table::from_records(records)))
}

/// 整形済み JSON（非ASCII文字はそのまま）
pub fn to_json_string(records: &RecordSet) -> Result<String, ScraperError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// 書き出したファイルのパス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json_path: PathBuf,
    pub csv_path: Option<PathBuf>,
}

/// `<out>/<slug>.json` と（必要なら）`<out>/<slug>.csv` を書き出す
pub fn save(
    records: &RecordSet,
    out_dir: &Path,
    county_slug: &str,
    skip_csv: bool,
) -> Result<ExportPaths, ScraperError> {
    std::fs::create_dir_all(out_dir)?;

    let json_path = out_dir.join(format!("{}.json", county_slug));
    std::fs::write(&json_path, to_json_string(records)?)?;

    if skip_csv {
        info!("Wrote {} (CSV skipped)", json_path.display());
        return Ok(ExportPaths {
            json_path,
            csv_path: None,
        });
    }

    let csv_path = out_dir.join(format!("{}.csv", county_slug));
    Table::from_records(records).write_csv(&csv_path)?;
    info!("Wrote {} and {}", json_path.display(), csv_path.display());

    Ok(ExportPaths {
        json_path,
        csv_path: Some(csv_path),
    })
}
