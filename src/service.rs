use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::chromium::ChromiumLauncher;
use crate::config::{AcceptancePolicy, ScraperConfig};
use crate::error::ScraperError;
use crate::maps::{MapsScraper, NoopObserver, RunObserver, RunReport};
use crate::output;
use crate::traits::SessionLauncher;

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub query: String,
    pub config: ScraperConfig,
}

impl ScrapeRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            config: ScraperConfig::default(),
        }
    }

    /// コマンドライン引数を空白で連結してクエリにする
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let query = args
            .into_iter()
            .map(|a| a.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self::new(query)
    }

    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn with_policy(mut self, policy: AcceptancePolicy) -> Self {
        self.config.policy = policy;
        self
    }
}

impl From<ScrapeRequest> for ScraperConfig {
    fn from(req: ScrapeRequest) -> Self {
        req.config
    }
}

/// スクレイピング結果
#[derive(Debug)]
pub struct ScrapeResult {
    pub output_path: PathBuf,
    pub report: RunReport,
}

/// tower::Serviceを実装したスクレイパーサービス
///
/// 前回の結果ファイルを削除 → 実行 → 結果を書き出す。
/// 致命的なエラーで終わった場合、結果ファイルは残らない。
#[derive(Clone)]
pub struct ScraperService<L = ChromiumLauncher> {
    launcher: L,
    observer: Arc<dyn RunObserver>,
}

impl ScraperService<ChromiumLauncher> {
    pub fn new() -> Self {
        Self::with_launcher(ChromiumLauncher::new())
    }
}

impl Default for ScraperService<ChromiumLauncher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> ScraperService<L> {
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            launcher,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl<L> Service<ScrapeRequest> for ScraperService<L>
where
    L: SessionLauncher + Clone + 'static,
{
    type Response = ScrapeResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!("スクレイピングリクエスト受信: query={:?}", req.query);

        let launcher = self.launcher.clone();
        let observer = Arc::clone(&self.observer);

        Box::pin(async move {
            let ScrapeRequest { query, config } = req;
            let output_path = config.output_path.clone();

            output::remove_previous(&output_path)?;

            let scraper = MapsScraper::new(launcher, config);
            let report = scraper.run_observed(&query, &*observer).await?;

            output::write_report(&output_path, &report)?;

            info!(
                "スクレイピング完了: path={:?}, places={}",
                output_path,
                report.results.len()
            );

            Ok(ScrapeResult {
                output_path,
                report,
            })
        })
    }
}
