//! 口コミスクレイパー CLI
//!
//! 実行方法:
//! ```text
//! cargo run --bin maps-reviews -- restaurant italien lyon --output ./reviews.json
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tower::Service;
use tracing_subscriber::EnvFilter;

use maps_review_scraper::{
    AcceptancePolicy, PlaceDescriptor, PlaceReport, RunObserver, ScrapeRequest, ScraperConfig,
    ScraperService, SettleStrategy,
};

#[derive(Parser, Debug)]
#[command(name = "maps-reviews", version, about = "Collect place reviews for a map search query")]
struct Cli {
    /// Search query (words are joined with spaces)
    query: Vec<String>,

    #[arg(long, short, default_value = "./reviews.json", help = "Output JSON file")]
    output: PathBuf,

    #[arg(long, help = "Show the browser window")]
    headful: bool,

    #[arg(long, default_value_t = 30, help = "Element wait timeout in seconds")]
    timeout_secs: u64,

    #[arg(long, help = "Use a fixed settle delay (ms) instead of waiting for the DOM to go quiet")]
    settle_ms: Option<u64>,

    #[arg(long, default_value_t = 200, help = "Scroll round cap per feed (0 = unbounded)")]
    max_scroll_rounds: usize,

    #[arg(long, default_value_t = 2, help = "Attempts per place before it is skipped")]
    attempts: u32,

    #[arg(
        long,
        value_parser = clap::value_parser!(u8).range(1..=5),
        help = "Keep only reviews rated at most this many stars"
    )]
    max_rating: Option<u8>,

    #[arg(long, env = "CHROME_PATH", help = "Chrome/Chromium executable")]
    chrome_path: Option<PathBuf>,

    #[arg(long, help = "Verbose logs and failure screenshots")]
    debug: bool,
}

impl Cli {
    fn config(&self) -> ScraperConfig {
        let mut config = ScraperConfig::new()
            .with_output_path(&self.output)
            .with_headless(!self.headful)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_scroll_rounds(Some(self.max_scroll_rounds).filter(|&n| n > 0))
            .with_place_attempts(self.attempts)
            .with_policy(AcceptancePolicy {
                max_rating: self.max_rating,
            })
            .with_debug(self.debug);

        if let Some(ms) = self.settle_ms {
            config = config.with_settle(SettleStrategy::fixed(Duration::from_millis(ms)));
        }
        if let Some(path) = &self.chrome_path {
            config = config.with_chrome_path(path);
        }
        config
    }
}

/// 処理済み店舗数をプログレスバーに反映する
struct ProgressObserver {
    bar: ProgressBar,
}

impl RunObserver for ProgressObserver {
    fn places_discovered(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn place_started(&self, _index: usize, place: &PlaceDescriptor) {
        self.bar
            .set_message(place.name.clone().unwrap_or_else(|| place.url.clone()));
    }

    fn place_finished(&self, _index: usize, _report: &PlaceReport) {
        self.bar.inc(1);
    }
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} [{bar:40.cyan/dim}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// バーを一旦消してからログを書き、描画が崩れないようにする
struct BarWriter(ProgressBar);

impl Write for BarWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.0.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

fn init_tracing(debug: bool, bar: &ProgressBar) {
    let default_filter = if debug {
        "info,maps_review_scraper=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer({
            let bar = bar.clone();
            move || BarWriter(bar.clone())
        })
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let bar = create_progress_bar();
    init_tracing(cli.debug, &bar);

    let observer = Arc::new(ProgressObserver { bar: bar.clone() });
    let mut service = ScraperService::new().with_observer(observer);

    let request = ScrapeRequest::from_args(&cli.query).with_config(cli.config());

    match service.call(request).await {
        Ok(result) => {
            bar.finish_and_clear();
            println!(
                "{} places, {} reviews saved to {}",
                result.report.results.len(),
                result.report.review_count(),
                result.output_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            bar.finish_and_clear();
            eprintln!("エラー: {}", e);
            ExitCode::FAILURE
        }
    }
}
