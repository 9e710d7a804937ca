//! 地図検索アプリの口コミスクレイパーライブラリ
//!
//! - 検索結果の一覧を無限スクロールで最後まで読み込む
//! - 店舗ごとに詳細ページを開き、口コミ（星評価と本文）を収集する
//! - 結果を JSON (`{"results": [...]}`) として保存する
//!
//! # 使用例
//!
//! ```rust,ignore
//! use maps_review_scraper::{ScrapeRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = ScrapeRequest::new("restaurant italien lyon")
//!         .with_output_path("./reviews.json")
//!         .with_headless(false);
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("Places: {}", result.report.results.len());
//! }
//! ```
//!
//! # ブラウザを差し替える
//!
//! `MapsScraper` は `SessionLauncher` を受け取るので、Chromium 以外の
//! ドライバでも同じ手順で実行できる。
//!
//! ```rust,ignore
//! use maps_review_scraper::{ChromiumLauncher, MapsScraper, ScraperConfig};
//!
//! let scraper = MapsScraper::new(ChromiumLauncher::new(), ScraperConfig::new());
//! let report = scraper.run("pizza paris").await?;
//! ```

pub mod chromium;
pub mod config;
pub mod error;
pub mod maps;
pub mod output;
pub mod service;
pub mod traits;

#[cfg(test)]
mod testing;

// 主要な型をリエクスポート
pub use chromium::{ChromiumLauncher, ChromiumPage, ChromiumSession};
pub use config::{AcceptancePolicy, ScraperConfig, SettleStrategy};
pub use error::ScraperError;
pub use maps::{
    MapsQuery, MapsScraper, NoopObserver, PlaceDescriptor, PlaceReport, Review, RunObserver,
    RunReport,
};
pub use service::{ScrapeRequest, ScrapeResult, ScraperService};
pub use traits::{BrowserSession, Feed, PageDriver, PageQuery, SessionLauncher};
