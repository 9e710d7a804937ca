use std::path::PathBuf;
use std::time::Duration;

/// 遅延描画を待つ方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    /// 固定時間スリープ
    Fixed(Duration),
    /// DOM変更が `quiet` の間止まるまで待つ（最大 `max`）
    Quiet {
        quiet: Duration,
        poll: Duration,
        max: Duration,
    },
}

impl SettleStrategy {
    pub fn fixed(delay: Duration) -> Self {
        SettleStrategy::Fixed(delay)
    }
}

impl Default for SettleStrategy {
    fn default() -> Self {
        // 遅延読み込みの取得中もDOMが止まることがあるので静止時間は長めに取る
        SettleStrategy::Quiet {
            quiet: Duration::from_millis(2500),
            poll: Duration::from_millis(250),
            max: Duration::from_secs(10),
        }
    }
}

/// 口コミの採用条件
///
/// 評価があり本文が空でないものを採用する。`max_rating` を指定すると
/// その値以下の評価だけに絞る（低評価のみ収集したい場合）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcceptancePolicy {
    pub max_rating: Option<u8>,
}

impl AcceptancePolicy {
    pub fn critical_only() -> Self {
        Self {
            max_rating: Some(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub output_path: PathBuf,
    pub headless: bool,
    /// 要素待機のタイムアウト
    pub timeout: Duration,
    pub navigation_timeout: Duration,
    pub settle: SettleStrategy,
    /// スクロール回数の上限（None = 無制限）
    pub max_scroll_rounds: Option<usize>,
    /// 1店舗あたりの試行回数
    pub place_attempts: u32,
    pub policy: AcceptancePolicy,
    pub chrome_path: Option<PathBuf>,
    pub debug: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./reviews.json"),
            headless: true,
            timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(60),
            settle: SettleStrategy::default(),
            max_scroll_rounds: Some(200),
            place_attempts: 2,
            policy: AcceptancePolicy::default(),
            chrome_path: None,
            debug: false,
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_settle(mut self, settle: SettleStrategy) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_max_scroll_rounds(mut self, rounds: Option<usize>) -> Self {
        self.max_scroll_rounds = rounds;
        self
    }

    pub fn with_place_attempts(mut self, attempts: u32) -> Self {
        self.place_attempts = attempts.max(1);
        self
    }

    pub fn with_policy(mut self, policy: AcceptancePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
