use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use chrono::Utc;
use tower::Service;
use tracing::{error, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::export::{self, ExportPaths};
use crate::flow::{FlowLog, FlowStep};
use crate::laredo::{collect_records, merge, LaredoScraper, PassOptions, RecordSet};
use crate::traits::RowSource;

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub county_slug: String,
    pub start_url: Option<String>,
    pub out_dir: PathBuf,
    pub headless: bool,
    pub rescrape_indices: Vec<i64>,
}

impl ScrapeRequest {
    pub fn new(county_slug: impl Into<String>) -> Self {
        Self {
            county_slug: county_slug.into(),
            start_url: None,
            out_dir: PathBuf::from("."),
            headless: true,
            rescrape_indices: Vec::new(),
        }
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }

    pub fn with_out_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_rescrape_indices(mut self, indices: Vec<i64>) -> Self {
        self.rescrape_indices = indices;
        self
    }
}

impl From<ScrapeRequest> for ScraperConfig {
    fn from(req: ScrapeRequest) -> Self {
        let flow_log_path = req.out_dir.join(crate::config::DEFAULT_FLOW_LOG);
        ScraperConfig {
            county_slug: req.county_slug,
            start_url: req.start_url,
            out_dir: req.out_dir,
            headless: req.headless,
            rescrape_indices: req.rescrape_indices,
            flow_log_path,
            ..Default::default()
        }
    }
}

/// スクレイピング結果
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub records: RecordSet,
    /// only_counties で除外された場合は None
    pub paths: Option<ExportPaths>,
}

/// 実行全体の締め切り（パスの合間でのみ確認する）
struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    fn check(&self, stage: &str) -> Result<(), ScraperError> {
        match self.limit {
            Some(limit) if self.start.elapsed() > limit => Err(ScraperError::Timeout(format!(
                "hard timeout of {:?} reached before {}",
                limit, stage
            ))),
            _ => Ok(()),
        }
    }
}

/// 初回パス → 再スクレイプ（マージ）→ 出力
///
/// ブラウザの初期化・終了は呼び出し側（`execute`）が行う。
/// 締め切りを過ぎた場合は残りのパスを打ち切り、集めた分を書き出してから
/// `ScraperError::Timeout` を返す。
pub async fn run_passes<S>(
    source: &mut S,
    config: &ScraperConfig,
    flow: &mut FlowLog,
) -> Result<ScrapeResult, ScraperError>
where
    S: RowSource + ?Sized,
{
    let deadline = Deadline::new(config.hard_timeout);
    let options = PassOptions::new(
        config.county_slug.as_str(),
        config.max_parties,
        config.days_back,
    );

    source.navigate().await?;

    flow.first_pass_begin();
    let rows = source.fetch_rows().await?;
    let mut records = collect_records(&rows, &options, Utc::now());
    info!("First pass: {} records", records.len());
    flow.push(FlowStep::FirstPassRecords {
        count: records.len(),
    });

    let mut timed_out = None;
    for &index in &config.rescrape_indices {
        if let Err(e) = deadline.check(&format!("rescrape pass {}", index)) {
            warn!("{}; saving {} records collected so far", e, records.len());
            timed_out = Some(e);
            break;
        }
        flow.push(FlowStep::RescrapeBegin { index });

        let rows = source.fetch_rows().await?;
        let more = collect_records(&rows, &options, Utc::now());
        let count = more.len();
        records = merge(records, more);
        info!(
            "Rescrape pass {}: {} records ({} total)",
            index,
            count,
            records.len()
        );
        flow.push(FlowStep::RescrapeRecords { index, count });
    }

    let paths = export::save(&records, &config.out_dir, &config.county_slug, config.skip_csv)?;
    flow.finish_ok(records.len(), Some(&paths));

    if let Some(e) = timed_out {
        return Err(e);
    }
    deadline.check("exit")?;

    Ok(ScrapeResult {
        records,
        paths: Some(paths),
    })
}

/// 一括実行（initialize → navigate → passes → close）
///
/// 失敗時はデバッグ用ファイルを保存する。フローログは結果にかかわらず最後に書き出す。
pub async fn execute<S>(source: &mut S, config: &ScraperConfig) -> Result<ScrapeResult, ScraperError>
where
    S: RowSource + ?Sized,
{
    info!(
        "Params: headless={}, out={}, wait={}s, max_parties={}, days_back={}, rescrape_indices={:?}, only_counties={:?}, county_slug={}",
        config.headless,
        config.out_dir.display(),
        config.wait.as_secs(),
        config.max_parties,
        config.days_back,
        config.rescrape_indices,
        config.only_counties,
        config.county_slug
    );
    if let Some(limit) = config.hard_timeout {
        info!("Hard timeout enabled: {}s", limit.as_secs());
    }

    std::fs::create_dir_all(&config.out_dir)?;
    let mut flow = FlowLog::new(config);

    let result = if config.is_county_selected() {
        run_with_browser(source, config, &mut flow).await
    } else {
        info!(
            "County {} not in only_counties {:?}; skipping",
            config.county_slug, config.only_counties
        );
        flow.push(FlowStep::CountySkipped {
            county: config.county_slug.clone(),
        });
        flow.finish_ok(0, None);
        Ok(ScrapeResult {
            records: RecordSet::new(),
            paths: None,
        })
    };

    if let Err(e) = flow.write(&config.flow_log_path) {
        warn!("Failed writing flow log: {}", e);
    }

    result
}

async fn run_with_browser<S>(
    source: &mut S,
    config: &ScraperConfig,
    flow: &mut FlowLog,
) -> Result<ScrapeResult, ScraperError>
where
    S: RowSource + ?Sized,
{
    let result = match source.initialize().await {
        Ok(()) => run_passes(source, config, flow).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        error!("FATAL: {}", e);
        if let Err(capture_err) = source.capture_debug_artifacts(&config.out_dir).await {
            warn!("Failed to capture debug artifacts: {}", capture_err);
        }
        flow.finish_err(e);
    }

    if let Err(e) = source.close().await {
        warn!("Failed to close browser: {}", e);
    }

    result
}

/// tower::Serviceを実装したスクレイパーサービス
#[derive(Debug, Clone, Default)]
pub struct ScraperService {}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = ScrapeResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!("Scrape request received: county={}", req.county_slug);

        Box::pin(async move {
            let config: ScraperConfig = req.into();
            let mut scraper = LaredoScraper::new(config.clone());
            let result = execute(&mut scraper, &config).await?;

            info!("Scrape finished: {} records", result.records.len());
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_request_builder() {
        let req = ScrapeRequest::new("st-charles-county")
            .with_start_url("https://example.org/laredo")
            .with_out_dir("/tmp/out")
            .with_headless(false)
            .with_rescrape_indices(vec![1]);

        assert_eq!(req.county_slug, "st-charles-county");
        assert_eq!(req.start_url.as_deref(), Some("https://example.org/laredo"));
        assert_eq!(req.out_dir, PathBuf::from("/tmp/out"));
        assert!(!req.headless);
        assert_eq!(req.rescrape_indices, vec![1]);
    }

    #[test]
    fn test_scrape_request_to_config() {
        let req = ScrapeRequest::new("lincoln-county").with_out_dir("/tmp/out");
        let config: ScraperConfig = req.into();

        assert_eq!(config.county_slug, "lincoln-county");
        assert_eq!(config.max_parties, 6);
        assert_eq!(
            config.flow_log_path,
            PathBuf::from("/tmp/out/laredo-flow-logs.json")
        );
    }

    #[test]
    fn test_deadline() {
        assert!(Deadline::new(None).check("export").is_ok());
        assert!(Deadline::new(Some(Duration::from_secs(3600))).check("export").is_ok());

        let expired = Deadline {
            start: Instant::now() - Duration::from_secs(5),
            limit: Some(Duration::from_millis(250)),
        };
        match expired.check("rescrape pass 1") {
            Err(ScraperError::Timeout(msg)) => {
                assert_eq!(msg, "hard timeout of 250ms reached before rescrape pass 1")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
