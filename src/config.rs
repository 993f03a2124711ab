use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_COUNTY_SLUG: &str = "st-charles-county";
pub const DEFAULT_MAX_PARTIES: usize = 6;
pub const DEFAULT_DAYS_BACK: i64 = 2;
pub const DEFAULT_FLOW_LOG: &str = "laredo-flow-logs.json";
pub const DEFAULT_LOG_FILE: &str = "laredo.logs";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// 出力ファイル名とレコードIDに使うスラッグ
    pub county_slug: String,
    /// 検索結果ページのURL（なければ現在のページをそのまま使う）
    pub start_url: Option<String>,
    pub out_dir: PathBuf,
    pub headless: bool,
    /// テーブル待機の秒数（下限15秒）
    pub wait: Duration,
    /// Party1..N の N
    pub max_parties: usize,
    /// Doc Date がこの日数より古い行を除外（0以下で無効）
    pub days_back: i64,
    pub rescrape_indices: Vec<i64>,
    pub only_counties: Vec<String>,
    pub hard_timeout: Option<Duration>,
    pub iframe_css: Option<String>,
    pub table_css: Option<String>,
    pub skip_csv: bool,
    pub flow_log_path: PathBuf,
    pub chrome_path: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            county_slug: DEFAULT_COUNTY_SLUG.to_string(),
            start_url: None,
            out_dir: PathBuf::from("."),
            headless: true,
            wait: Duration::from_secs(30),
            max_parties: DEFAULT_MAX_PARTIES,
            days_back: DEFAULT_DAYS_BACK,
            rescrape_indices: Vec::new(),
            only_counties: Vec::new(),
            hard_timeout: None,
            iframe_css: None,
            table_css: None,
            skip_csv: false,
            flow_log_path: PathBuf::from(DEFAULT_FLOW_LOG),
            chrome_path: std::env::var("CHROME_PATH")
                .or_else(|_| std::env::var("CHROMIUM_PATH"))
                .ok(),
        }
    }
}

impl ScraperConfig {
    pub fn new(county_slug: impl Into<String>) -> Self {
        Self {
            county_slug: county_slug.into(),
            ..Default::default()
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

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_max_parties(mut self, max_parties: usize) -> Self {
        self.max_parties = max_parties;
        self
    }

    pub fn with_days_back(mut self, days_back: i64) -> Self {
        self.days_back = days_back;
        self
    }

    pub fn with_rescrape_indices(mut self, indices: Vec<i64>) -> Self {
        self.rescrape_indices = indices;
        self
    }

    pub fn with_only_counties(mut self, counties: Vec<String>) -> Self {
        self.only_counties = counties;
        self
    }

    pub fn with_hard_timeout(mut self, timeout: Duration) -> Self {
        self.hard_timeout = Some(timeout);
        self
    }

    pub fn with_iframe_css(mut self, css: impl Into<String>) -> Self {
        self.iframe_css = Some(css.into());
        self
    }

    pub fn with_table_css(mut self, css: impl Into<String>) -> Self {
        self.table_css = Some(css.into());
        self
    }

    pub fn with_skip_csv(mut self, skip_csv: bool) -> Self {
        self.skip_csv = skip_csv;
        self
    }

    pub fn with_flow_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.flow_log_path = path.into();
        self
    }

    /// only_counties が指定されていて、このカウンティが含まれない場合は false
    pub fn is_county_selected(&self) -> bool {
        self.only_counties.is_empty() || self.only_counties.iter().any(|c| c == &self.county_slug)
    }

    /// テーブル待機時間（最低15秒）
    pub fn table_wait(&self) -> Duration {
        self.wait.max(Duration::from_secs(15))
    }
}

/// 再スクレイプのインデックス列をパース
///
/// 空白・カンマ区切り。全体がクォートされていても可。整数でないトークンは警告して無視する。
pub fn parse_indices(s: &str) -> Vec<i64> {
    let mut s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        s = &s[1..s.len() - 1];
    }

    split_tokens(s)
        .filter_map(|token| match token.parse::<i64>() {
            Ok(index) => Some(index),
            Err(_) => {
                warn!("Ignoring non-integer rescrape index token: {:?}", token);
                None
            }
        })
        .collect()
}

/// 空白・カンマ区切りのリストをパース
pub fn parse_list(s: &str) -> Vec<String> {
    split_tokens(s).map(str::to_string).collect()
}

fn split_tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScraperConfig::new("jefferson-county")
            .with_out_dir("/tmp/out")
            .with_headless(false)
            .with_max_parties(4)
            .with_days_back(0)
            .with_rescrape_indices(vec![1, 2])
            .with_skip_csv(true);

        assert_eq!(config.county_slug, "jefferson-county");
        assert_eq!(config.out_dir, PathBuf::from("/tmp/out"));
        assert!(!config.headless);
        assert_eq!(config.max_parties, 4);
        assert_eq!(config.days_back, 0);
        assert_eq!(config.rescrape_indices, vec![1, 2]);
        assert!(config.skip_csv);
    }

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert_eq!(config.county_slug, "st-charles-county");
        assert_eq!(config.max_parties, 6);
        assert_eq!(config.days_back, 2);
        assert!(config.hard_timeout.is_none());
        assert_eq!(config.table_wait(), Duration::from_secs(30));
        assert_eq!(
            config.with_wait(Duration::from_secs(5)).table_wait(),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_parse_indices() {
        assert_eq!(parse_indices(""), Vec::<i64>::new());
        assert_eq!(parse_indices("1 2,3"), vec![1, 2, 3]);
        assert_eq!(parse_indices("'4, 5'"), vec![4, 5]);
        assert_eq!(parse_indices("\"7\""), vec![7]);
        assert_eq!(parse_indices("1, x, 2"), vec![1, 2]);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" st-charles-county, lincoln-county  warren"),
            vec!["st-charles-county", "lincoln-county", "warren"]
        );
        assert!(parse_list("  ").is_empty());
    }

    #[test]
    fn test_county_selection() {
        let config = ScraperConfig::new("a");
        assert!(config.is_county_selected());
        let config = config.with_only_counties(vec!["b".into()]);
        assert!(!config.is_county_selected());
        let config = config.with_only_counties(vec!["b".into(), "a".into()]);
        assert!(config.is_county_selected());
    }
}
