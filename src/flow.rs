//! 実行フローの診断ログ（成功・失敗にかかわらず最後に書き出す）

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::export::ExportPaths;

/// フローの1ステップ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowStep {
    FirstPassBegin { ts: String },
    FirstPassRecords { count: usize },
    RescrapeBegin { index: i64 },
    RescrapeRecords { index: i64, count: usize },
    CountySkipped { county: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLog {
    pub started_at: String,
    pub county: String,
    pub rescrape_indices: Vec<i64>,
    pub only_counties: Vec<String>,
    pub steps: Vec<FlowStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_path: Option<PathBuf>,
    /// CSV を書かなかった場合は null
    pub csv_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FlowLog {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            started_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            county: config.county_slug.clone(),
            rescrape_indices: config.rescrape_indices.clone(),
            only_counties: config.only_counties.clone(),
            steps: Vec::new(),
            finished_ok: None,
            records: None,
            json_path: None,
            csv_path: None,
            error: None,
        }
    }

    pub fn push(&mut self, step: FlowStep) {
        self.steps.push(step);
    }

    pub fn first_pass_begin(&mut self) {
        let ts = Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        self.push(FlowStep::FirstPassBegin { ts });
    }

    pub fn finish_ok(&mut self, records: usize, paths: Option<&ExportPaths>) {
        self.finished_ok = Some(true);
        self.records = Some(records);
        if let Some(paths) = paths {
            self.json_path = Some(paths.json_path.clone());
            self.csv_path = paths.csv_path.clone();
        }
    }

    pub fn finish_err(&mut self, error: &ScraperError) {
        self.finished_ok = Some(false);
        self.error = Some(format!("{:?}", error));
    }

    pub fn write(&self, path: &Path) -> Result<(), ScraperError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
