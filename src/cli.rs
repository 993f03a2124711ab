use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{self, ScraperConfig};

#[derive(Debug, Parser)]
#[command(name = "laredo", author, version, about)]
pub struct Cli {
    /// ヘッドレスで実行
    #[arg(long)]
    pub headless: bool,

    /// 出力ディレクトリ
    #[arg(long, env = "OUT_DIR", default_value = ".")]
    pub out: PathBuf,

    /// UI 待機秒数
    #[arg(long, default_value_t = 30)]
    pub wait: u64,

    /// Party 列の数（Party1..N）
    #[arg(long, default_value_t = config::DEFAULT_MAX_PARTIES)]
    pub max_parties: usize,

    /// Doc Date が N 日より古い行を除外（0 で無効）
    #[arg(long, default_value_t = config::DEFAULT_DAYS_BACK, allow_negative_numbers = true)]
    pub days_back: i64,

    /// 追加パスのインデックス（空白・カンマ区切り）
    #[arg(long, default_value = "")]
    pub rescrape_indices: String,

    /// 対象とする郡スラッグ（指定時はそれ以外をスキップ）
    #[arg(long, default_value = "")]
    pub only_counties: String,

    /// N 秒で打ち切り（0 で無効）
    #[arg(long, default_value_t = 0)]
    pub hard_timeout: u64,

    /// 出力ファイル名とレコード ID に使うスラッグ
    #[arg(long, default_value = config::DEFAULT_COUNTY_SLUG)]
    pub county_slug: String,

    /// 検索結果ページの URL
    #[arg(long, env = "LAREDO_URL", default_value = "")]
    pub start_url: String,

    /// テーブルを含む iframe の CSS セレクタ
    #[arg(long, default_value = "")]
    pub iframe_css: String,

    /// テーブルの CSS セレクタ（自動検出より優先）
    #[arg(long, default_value = "")]
    pub table_css: String,

    /// JSON のみ出力（CSV なし）
    #[arg(long)]
    pub skip_csv: bool,

    /// フローログのパス
    #[arg(long, default_value = config::DEFAULT_FLOW_LOG)]
    pub flow_log: PathBuf,

    /// ログファイル（追記）
    #[arg(long, default_value = config::DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

impl From<Cli> for ScraperConfig {
    fn from(cli: Cli) -> Self {
        ScraperConfig {
            county_slug: cli.county_slug,
            start_url: non_empty(cli.start_url),
            out_dir: cli.out,
            headless: cli.headless,
            wait: Duration::from_secs(cli.wait),
            max_parties: cli.max_parties,
            days_back: cli.days_back,
            rescrape_indices: config::parse_indices(&cli.rescrape_indices),
            only_counties: config::parse_list(&cli.only_counties),
            hard_timeout: (cli.hard_timeout > 0).then(|| Duration::from_secs(cli.hard_timeout)),
            iframe_css: non_empty(cli.iframe_css),
            table_css: non_empty(cli.table_css),
            skip_csv: cli.skip_csv,
            flow_log_path: cli.flow_log,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_help_text() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("ヘッドレスで実行"));
        assert!(help.contains("--rescrape-indices"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["laredo", "--start-url", "https://example.org"]).unwrap();
        let config: ScraperConfig = cli.into();

        assert_eq!(config.county_slug, "st-charles-county");
        assert_eq!(config.start_url.as_deref(), Some("https://example.org"));
        assert_eq!(config.max_parties, 6);
        assert_eq!(config.days_back, 2);
        assert_eq!(config.wait, Duration::from_secs(30));
        assert!(config.hard_timeout.is_none());
        assert!(config.iframe_css.is_none());
        assert!(!config.headless);
    }

    #[test]
    fn test_full_arguments() {
        let cli = Cli::try_parse_from([
            "laredo",
            "--headless",
            "--out",
            "out",
            "--max-parties",
            "4",
            "--days-back",
            "0",
            "--rescrape-indices",
            "'1, 2 3'",
            "--only-counties",
            "a,b",
            "--hard-timeout",
            "600",
            "--county-slug",
            "lincoln-county",
            "--iframe-css",
            "iframe#results",
            "--skip-csv",
        ])
        .unwrap();
        let config: ScraperConfig = cli.into();

        assert!(config.headless);
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert_eq!(config.max_parties, 4);
        assert_eq!(config.days_back, 0);
        assert_eq!(config.rescrape_indices, vec![1, 2, 3]);
        assert_eq!(config.only_counties, vec!["a", "b"]);
        assert_eq!(config.hard_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.county_slug, "lincoln-county");
        assert_eq!(config.iframe_css.as_deref(), Some("iframe#results"));
        assert!(config.skip_csv);
    }
}
