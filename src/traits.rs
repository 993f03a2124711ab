use std::path::Path;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::laredo::RawRow;

/// 検索結果テーブルの行を供給するもの（通常はブラウザ）
#[async_trait]
pub trait RowSource: Send {
    /// ブラウザ初期化
    async fn initialize(&mut self) -> Result<(), ScraperError>;

    /// 検索結果ページへ移動し、テーブルの出現を待つ
    async fn navigate(&mut self) -> Result<(), ScraperError>;

    /// 現在表示されているテーブルの行を読み取る
    async fn fetch_rows(&mut self) -> Result<Vec<RawRow>, ScraperError>;

    /// 失敗時のデバッグ用ファイル（HTML/スクリーンショット）を保存
    async fn capture_debug_artifacts(&mut self, _dir: &Path) -> Result<(), ScraperError> {
        Ok(())
    }

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;
}
