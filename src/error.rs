use thiserror::Error;

/// タイムアウト時のプロセス終了コード
pub const TIMEOUT_EXIT_CODE: u8 = 124;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("データ抽出エラー: {0}")]
    Extraction(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSVエラー: {0}")]
    Csv(#[from] csv::Error),
}

impl ScraperError {
    /// プロセス終了コード（タイムアウトは 124）
    pub fn exit_code(&self) -> u8 {
        match self {
            ScraperError::Timeout(_) => TIMEOUT_EXIT_CODE,
            _ => 1,
        }
    }
}

/// 行単位の読み飛ばし理由
///
/// パス全体を止めることはなく、ログに出して次の行へ進む。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowReject {
    #[error("セル数不足: {found} < {required}")]
    TooFewCells { found: usize, required: usize },

    #[error("Doc Number が空です")]
    MissingDocNumber,

    #[error("セル読み取り失敗 (列 {column}): {reason}")]
    Malformed { column: usize, reason: String },
}

impl RowReject {
    /// ヘッダ行・空行など、警告に値しない読み飛ばしか
    pub fn is_expected(&self) -> bool {
        !matches!(self, RowReject::Malformed { .. })
    }
}
