//! Laredo 検索結果ページのブラウザ操作
//!
//! PrimeNG のテーブル（Doc Number, Parties, Book & Page, ...）を読み取って
//! `RawRow` の列として返す。集約は呼び出し側が行う。

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::RowSource;

use super::types::RawRow;

/// テーブル検出用のフォールバックセレクタ（過去のダンプで見た PrimeNG の ID を含む）
const TABLE_FALLBACKS: [&str; 4] = [
    "table[role='table'] tbody tr",
    "table.p-datatable-table tbody tr",
    "#pn_id_910-table tbody tr",
    "table[role='table']",
];
/// 行取得用のフォールバックセレクタ
const ROW_FALLBACKS: [&str; 3] = [
    "table[role='table'] tbody tr",
    "table.p-datatable-table tbody tr",
    "#pn_id_910-table tbody tr",
];

const TABLE_POLL_INTERVAL_MS: u64 = 800;
const IFRAME_WAIT_SECS: u64 = 10;
const PAGE_SETTLE_SECS: u64 = 2;
const REQUEST_TIMEOUT_SECS: u64 = 180;

pub const DEBUG_HTML_FILE: &str = "laredo_page.html";
pub const DEBUG_SCREENSHOT_FILE: &str = "laredo_page.png";

/// Laredo スクレイパー
pub struct LaredoScraper {
    config: ScraperConfig,
    browser: Option<Browser>,
    page: Option<Page>,
}

impl LaredoScraper {
    /// 新しいスクレイパーを作成
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
        }
    }

    fn get_page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("Browser not initialized".to_string()))
    }

    /// JavaScript を評価して結果をデシリアライズ
    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T, ScraperError> {
        self.get_page()?
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    /// iframe が指定されていればその中の document を `root` として使う
    fn root_prelude(&self) -> Result<String, ScraperError> {
        let iframe_css = serde_json::to_string(&self.config.iframe_css)?;
        Ok(format!(
            r#"
            const iframeCss = {iframe_css};
            let root = document;
            if (iframeCss) {{
                const frame = document.querySelector(iframeCss);
                if (frame && frame.contentDocument) {{
                    root = frame.contentDocument;
                }}
            }}
            const win = root.defaultView || window;
        "#
        ))
    }

    /// テーブル検出に使うセレクタ（指定があれば先頭）
    fn table_selectors(&self) -> Vec<String> {
        self.config
            .table_css
            .iter()
            .cloned()
            .chain(TABLE_FALLBACKS.iter().map(|s| s.to_string()))
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// 行の取得に使うセレクタ（指定があれば先頭）
    fn row_selectors(&self) -> Vec<String> {
        let custom = self
            .config
            .table_css
            .as_deref()
            .filter(|css| !css.is_empty())
            .map(|css| {
                if css.contains("tbody") {
                    css.to_string()
                } else {
                    format!("{} tbody tr", css)
                }
            });
        custom
            .into_iter()
            .chain(ROW_FALLBACKS.iter().map(|s| s.to_string()))
            .collect()
    }

    /// いずれかのセレクタにマッチする要素があるか
    async fn any_present(&self, selectors: &[String]) -> Result<bool, ScraperError> {
        let script = format!(
            r#"
            (() => {{
                {prelude}
                const selectors = {selectors};
                for (const sel of selectors) {{
                    try {{
                        if (root.querySelectorAll(sel).length > 0) return true;
                    }} catch (e) {{}}
                }}
                return false;
            }})()
        "#,
            prelude = self.root_prelude()?,
            selectors = serde_json::to_string(selectors)?,
        );
        self.eval(&script).await
    }

    /// 遅延描画対策に上から下までスクロール
    async fn scroll_breath(&self) {
        let prelude = match self.root_prelude() {
            Ok(prelude) => prelude,
            Err(e) => {
                debug!("Scroll skipped: {}", e);
                return;
            }
        };
        for target in ["0", "root.body.scrollHeight / 2", "root.body.scrollHeight"] {
            let script = format!("(() => {{ {prelude} win.scrollTo(0, {target}); return true; }})()");
            if let Err(e) = self.eval::<bool>(&script).await {
                debug!("Scroll failed: {}", e);
                return;
            }
            if target != "root.body.scrollHeight" {
                sleep(Duration::from_millis(300)).await;
            }
        }
    }

    /// テーブルが現れるまでポーリング
    async fn wait_for_table(&self, total: Duration) -> bool {
        let selectors = self.table_selectors();
        let start = Instant::now();
        let mut last_err = None;

        while start.elapsed() < total {
            match self.any_present(&selectors).await {
                Ok(true) => {
                    debug!("Table present after {:?}", start.elapsed());
                    return true;
                }
                Ok(false) => {}
                Err(e) => last_err = Some(e),
            }
            sleep(Duration::from_millis(TABLE_POLL_INTERVAL_MS)).await;
            self.scroll_breath().await;
        }

        if let Some(e) = last_err {
            warn!("Last wait error: {}", e);
        }
        false
    }

    /// iframe の出現を待つ（見つからなければメインのコンテキストで続行）
    async fn switch_into_iframe(&self) {
        let Some(css) = self.config.iframe_css.as_deref().filter(|css| !css.is_empty()) else {
            return;
        };

        let selector = match serde_json::to_string(css) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Invalid iframe selector {}: {}", css, e);
                return;
            }
        };
        let script = format!(
            "(() => {{ const f = document.querySelector({selector}); return !!(f && f.contentDocument); }})()"
        );

        for _ in 0..IFRAME_WAIT_SECS {
            if let Ok(true) = self.eval::<bool>(&script).await {
                info!("Switched into iframe: {}", css);
                return;
            }
            sleep(Duration::from_secs(1)).await;
        }
        warn!("iframe not found ({}). Continuing in main context.", css);
    }

    /// テーブル行を読み取る
    async fn find_rows(&self) -> Result<Vec<RawRow>, ScraperError> {
        let script = format!(
            r#"
            (() => {{
                {prelude}
                const selectors = {selectors};
                let trs = [];
                for (const sel of selectors) {{
                    try {{
                        trs = Array.from(root.querySelectorAll(sel));
                    }} catch (e) {{
                        trs = [];
                    }}
                    if (trs.length > 0) break;
                }}
                const text = (el) => ((el && el.innerText) || '').trim();
                const rows = trs.map((tr) => Array.from(tr.querySelectorAll('td')).map((td) => {{
                    try {{
                        const span = td.querySelector('span');
                        const chip = td.querySelector('.party-chip');
                        return {{
                            text: text(td),
                            name: span ? text(span) : null,
                            chip: chip ? text(chip) : null,
                        }};
                    }} catch (e) {{
                        return {{ text: '', error: String(e) }};
                    }}
                }}));
                return JSON.stringify(rows);
            }})()
        "#,
            prelude = self.root_prelude()?,
            selectors = serde_json::to_string(&self.row_selectors())?,
        );

        let json: String = self.eval(&script).await?;
        serde_json::from_str(&json)
            .map_err(|e| ScraperError::Extraction(format!("row payload: {}", e)))
    }
}

#[async_trait]
impl RowSource for LaredoScraper {
    /// ブラウザを初期化
    async fn initialize(&mut self) -> Result<(), ScraperError> {
        info!("Initializing browser for Laredo scraper...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("laredo-{}", unique_id));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(1920, 1480);

        if let Some(chrome_path) = &self.config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        let browser_config = builder.build().map_err(ScraperError::BrowserInit)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ハンドラータスクを起動
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        self.browser = Some(browser);
        self.page = Some(page);
        info!("Browser initialized successfully");

        Ok(())
    }

    async fn navigate(&mut self) -> Result<(), ScraperError> {
        match self.config.start_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => {
                info!("Opening start URL: {}", url);
                self.get_page()?
                    .goto(url)
                    .await
                    .map_err(|e| ScraperError::Navigation(e.to_string()))?;
            }
            None => info!("No start URL provided; trying current page context."),
        }

        sleep(Duration::from_secs(PAGE_SETTLE_SECS)).await;
        self.switch_into_iframe().await;

        let wait = self.config.table_wait();
        if self.wait_for_table(wait).await {
            return Ok(());
        }

        info!("Table not found on first try; reloading once...");
        match self.get_page()?.reload().await {
            Ok(_) => {
                sleep(Duration::from_secs(PAGE_SETTLE_SECS)).await;
                self.switch_into_iframe().await;
            }
            Err(e) => warn!("Refresh failed: {}", e),
        }

        if self.wait_for_table(wait).await {
            return Ok(());
        }

        Err(ScraperError::Timeout(
            "Results table not found after robust wait (+ reload)".to_string(),
        ))
    }

    async fn fetch_rows(&mut self) -> Result<Vec<RawRow>, ScraperError> {
        self.wait_for_table(self.config.table_wait()).await;
        let mut rows = self.find_rows().await?;

        // 仮想スクロール・遅延描画の場合は一度だけ促す
        if rows.is_empty() {
            self.scroll_breath().await;
            sleep(Duration::from_secs(1)).await;
            rows = self.find_rows().await?;
        }

        info!("Read {} table rows", rows.len());
        Ok(rows)
    }

    async fn capture_debug_artifacts(&mut self, dir: &Path) -> Result<(), ScraperError> {
        let page = self.get_page()?;

        match page.content().await {
            Ok(html) => {
                let path = dir.join(DEBUG_HTML_FILE);
                std::fs::write(&path, html)?;
                info!("Saved current page HTML -> {}", path.display());
            }
            Err(e) => warn!("Failed to save HTML: {}", e),
        }

        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(png) => {
                let path = dir.join(DEBUG_SCREENSHOT_FILE);
                std::fs::write(&path, png)?;
                info!("Saved screenshot -> {}", path.display());
            }
            Err(e) => warn!("Failed to save screenshot: {}", e),
        }

        Ok(())
    }

    /// ブラウザを閉じる
    async fn close(&mut self) -> Result<(), ScraperError> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }
        self.browser = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laredo_scraper_new() {
        let scraper = LaredoScraper::new(ScraperConfig::default());
        assert!(scraper.browser.is_none());
        assert!(scraper.page.is_none());
        assert!(scraper.get_page().is_err());
    }

    #[test]
    fn test_row_selectors_append_tbody() {
        let scraper = LaredoScraper::new(ScraperConfig::default().with_table_css("#results"));
        let selectors = scraper.row_selectors();
        assert_eq!(selectors[0], "#results tbody tr");
        assert_eq!(selectors.len(), ROW_FALLBACKS.len() + 1);

        let scraper =
            LaredoScraper::new(ScraperConfig::default().with_table_css("#results tbody tr.row"));
        assert_eq!(scraper.row_selectors()[0], "#results tbody tr.row");
    }

    #[test]
    fn test_default_selectors() {
        let scraper = LaredoScraper::new(ScraperConfig::default());
        assert_eq!(scraper.row_selectors(), ROW_FALLBACKS.to_vec());
        assert_eq!(scraper.table_selectors(), TABLE_FALLBACKS.to_vec());
    }

    #[test]
    fn test_root_prelude_escapes_selector() {
        let scraper =
            LaredoScraper::new(ScraperConfig::default().with_iframe_css("iframe[name=\"results\"]"));
        let prelude = scraper.root_prelude().unwrap();
        assert!(prelude.contains(r#"const iframeCss = "iframe[name=\"results\"]";"#));

        let scraper = LaredoScraper::new(ScraperConfig::default());
        assert!(scraper.root_prelude().unwrap().contains("const iframeCss = null;"));
    }
}
