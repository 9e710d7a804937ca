//! 口コミスクレイパー実装
//!
//! 検索 → 同意ページ通過 → 結果一覧の読み込み → 店舗ごとの口コミ収集

use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::{BrowserSession, PageQuery, SessionLauncher};

use super::consent::pass_consent_gate;
use super::harvest::harvest_place;
use super::markup::search_url;
use super::pagination::collect_places;
use super::types::{PlaceDescriptor, PlaceReport, RunReport};

/// 実行状況の通知先（プログレス表示用）
pub trait RunObserver: Send + Sync {
    fn places_discovered(&self, _total: usize) {}

    fn place_started(&self, _index: usize, _place: &PlaceDescriptor) {}

    fn place_finished(&self, _index: usize, _report: &PlaceReport) {}
}

/// 何もしない通知先
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

pub struct MapsScraper<L> {
    launcher: L,
    config: ScraperConfig,
}

impl<L: SessionLauncher> MapsScraper<L> {
    pub fn new(launcher: L, config: ScraperConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub async fn run(&self, query: &str) -> Result<RunReport, ScraperError> {
        self.run_observed(query, &NoopObserver).await
    }

    /// 1回分の実行。セッションは成功・失敗どちらでも閉じる
    pub async fn run_observed(
        &self,
        query: &str,
        observer: &dyn RunObserver,
    ) -> Result<RunReport, ScraperError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScraperError::EmptyQuery);
        }

        info!("Launching browser for query {:?}", query);
        let mut session = self.launcher.launch(&self.config).await?;

        let result = self.run_in_session(&mut session, query, observer).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
        info!("Browser closed");

        result
    }

    async fn run_in_session(
        &self,
        session: &mut L::Session,
        query: &str,
        observer: &dyn RunObserver,
    ) -> Result<RunReport, ScraperError> {
        let page = session.open_page().await?;

        let result = self.scrape(&page, query, observer).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        result
    }

    async fn scrape<P>(
        &self,
        page: &P,
        query: &str,
        observer: &dyn RunObserver,
    ) -> Result<RunReport, ScraperError>
    where
        P: PageQuery + ?Sized,
    {
        let url = search_url(query);
        page.navigate(&url).await?;
        info!("Went to the search page: {}", url);

        pass_consent_gate(page, self.config.timeout).await?;

        let places = collect_places(page, &self.config).await?;
        observer.places_discovered(places.len());

        let mut report = RunReport::default();
        for (index, place) in places.iter().enumerate() {
            observer.place_started(index, place);
            info!(
                "Fetching {} ({}/{})",
                place.name.as_deref().unwrap_or(&place.url),
                index + 1,
                places.len()
            );

            let place_report = harvest_place(page, place, &self.config).await;
            observer.place_finished(index, &place_report);

            if place_report.is_failed() {
                warn!("Skipping {:?}: reviews could not be harvested", place.name);
                continue;
            }
            report.results.push(place_report);
        }

        info!(
            "Scrape completed: {}/{} places, {} reviews",
            report.results.len(),
            places.len(),
            report.review_count()
        );
        Ok(report)
    }
}
