//! Laredo 登記検索スクレイパーライブラリ
//!
//! - ヘッドレスブラウザで検索結果テーブル（PrimeNG）を読み取る
//! - 同じ Doc Number の行を1レコードに集約し、Party1..N を埋める
//! - 再スクレイプのパスを Doc Number 単位でマージする
//! - JSON（と CSV）に書き出し、実行フローを診断ログに残す
//!
//! # 使用例
//!
//! ```rust,ignore
//! use laredo_scraper::{ScraperService, ScrapeRequest};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = ScrapeRequest::new("st-charles-county")
//!         .with_start_url("https://recorder.example.gov/laredo/#/results")
//!         .with_out_dir("./out")
//!         .with_rescrape_indices(vec![1]);
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("Records: {}", result.records.len());
//! }
//! ```
//!
//! # 集約のみ使う例
//!
//! ```rust
//! use chrono::Utc;
//! use laredo_scraper::laredo::{collect_records, PassOptions, RawCell};
//!
//! let mut row = vec![RawCell::default(); 14];
//! row[3] = RawCell::text("2026R-000123");
//! row[4] = RawCell::party("SMITH JOHN", "GRANTOR");
//!
//! let records = collect_records(&[row], &PassOptions::new("st-charles-county", 6, 0), Utc::now());
//! let record = records.get("2026R-000123").unwrap();
//! assert_eq!(record.id, "st-charles-county-1");
//! assert_eq!(record.parties[0], "SMITH JOHN (GRANTOR)");
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod flow;
pub mod laredo;
pub mod logging;
pub mod service;
pub mod traits;

// 主要な型をリエクスポート
pub use config::ScraperConfig;
pub use error::{RowReject, ScraperError};
pub use export::{ExportPaths, Table};
pub use flow::{FlowLog, FlowStep};
pub use laredo::{LaredoScraper, Record, RecordSet};
pub use service::{execute, run_passes, ScrapeRequest, ScrapeResult, ScraperService};
pub use traits::RowSource;
