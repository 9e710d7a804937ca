//! テスト用のフェイク実装
//!
//! `FakePage` は台本どおりに応答する `PageQuery`。状態は `Arc` で共有するので、
//! `FakeLauncher` に渡したあとでも呼び出し履歴を確認できる。

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::maps::types::{RawAnchor, RawReview};
use crate::traits::{BrowserSession, Feed, PageQuery, SessionLauncher};

/// 店舗詳細ページの台本
#[derive(Debug, Clone, Default)]
pub struct FakePlace {
    reviews: Vec<RawReview>,
    review_heights: Vec<u64>,
    truncated: usize,
    missing_control: bool,
    failing_navigations: usize,
    broken_entries: bool,
}

impl FakePlace {
    pub fn with_reviews(reviews: Vec<RawReview>) -> Self {
        Self {
            reviews,
            review_heights: vec![500, 500],
            ..Default::default()
        }
    }

    pub fn with_truncated(mut self, count: usize) -> Self {
        self.truncated = count;
        self
    }

    pub fn without_reviews_control(mut self) -> Self {
        self.missing_control = true;
        self
    }

    pub fn failing_navigations(mut self, count: usize) -> Self {
        self.failing_navigations = count;
        self
    }

    pub fn with_broken_entries(mut self) -> Self {
        self.broken_entries = true;
        self
    }
}

#[derive(Default)]
struct State {
    titles: VecDeque<Option<String>>,
    title_reads: usize,
    consent_clicks: usize,
    consent_fails: bool,
    result_heights: Vec<u64>,
    result_cursor: usize,
    review_cursor: usize,
    missing_feeds: Vec<Feed>,
    scrolls: Vec<(Feed, u64)>,
    mutations: Vec<u64>,
    mutation_cursor: usize,
    mutation_probes: usize,
    anchors: Vec<RawAnchor>,
    places: HashMap<String, FakePlace>,
    current: Option<String>,
    navigations: Vec<String>,
    text_expansions: usize,
    fail_search: bool,
    closed: bool,
}

impl State {
    fn current_place(&self) -> Option<&FakePlace> {
        self.current.as_ref().and_then(|url| self.places.get(url))
    }
}

/// 列の次の値（末尾に達したら最後の値を返し続ける）
fn next_value(values: &[u64], cursor: &mut usize) -> u64 {
    let value = values
        .get(*cursor)
        .or_else(|| values.last())
        .copied()
        .unwrap_or(0);
    *cursor += 1;
    value
}

#[derive(Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<State>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// `None` はタイトル要素が現れない（タイムアウト）
    pub fn with_titles(self, titles: Vec<Option<&str>>) -> Self {
        self.state().titles = titles
            .into_iter()
            .map(|t| t.map(str::to_string))
            .collect();
        self
    }

    pub fn with_consent_failure(self) -> Self {
        self.state().consent_fails = true;
        self
    }

    pub fn with_result_heights(self, heights: Vec<u64>) -> Self {
        self.state().result_heights = heights;
        self
    }

    pub fn without_feed(self, feed: Feed) -> Self {
        self.state().missing_feeds.push(feed);
        self
    }

    pub fn with_mutations(self, counts: Vec<u64>) -> Self {
        self.state().mutations = counts;
        self
    }

    pub fn with_anchors(self, anchors: Vec<RawAnchor>) -> Self {
        self.state().anchors = anchors;
        self
    }

    /// 名前とURLが同じリンクを並べる
    pub fn with_place_anchors(self, names: &[&str]) -> Self {
        self.state().anchors = names
            .iter()
            .map(|name| RawAnchor {
                label: Some(name.to_string()),
                href: name.to_string(),
            })
            .collect();
        self
    }

    pub fn with_place(self, url: &str, place: FakePlace) -> Self {
        self.state().places.insert(url.to_string(), place);
        self
    }

    pub fn with_failing_search(self) -> Self {
        self.state().fail_search = true;
        self
    }

    pub fn title_reads(&self) -> usize {
        self.state().title_reads
    }

    pub fn consent_clicks(&self) -> usize {
        self.state().consent_clicks
    }

    pub fn scrolls(&self) -> Vec<(Feed, u64)> {
        self.state().scrolls.clone()
    }

    pub fn mutation_probes(&self) -> usize {
        self.state().mutation_probes
    }

    pub fn text_expansions(&self) -> usize {
        self.state().text_expansions
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.state()
            .navigations
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl PageQuery for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        let mut state = self.state();
        state.navigations.push(url.to_string());

        if let Some(place) = state.places.get_mut(url) {
            if place.failing_navigations > 0 {
                place.failing_navigations -= 1;
                return Err(ScraperError::Navigation(format!("{} unreachable", url)));
            }
            state.current = Some(url.to_string());
            state.review_cursor = 0;
            return Ok(());
        }

        if state.fail_search {
            return Err(ScraperError::Navigation(format!("{} unreachable", url)));
        }
        state.current = None;
        state.result_cursor = 0;
        Ok(())
    }

    async fn title_text(&self, _timeout: Duration) -> Result<String, ScraperError> {
        let mut state = self.state();
        state.title_reads += 1;
        match state.titles.pop_front() {
            Some(Some(title)) => Ok(title),
            Some(None) => Err(ScraperError::Timeout("h1".into())),
            None => Ok("Google Maps".into()),
        }
    }

    async fn accept_consent(&self, _timeout: Duration) -> Result<(), ScraperError> {
        let mut state = self.state();
        state.consent_clicks += 1;
        if state.consent_fails {
            return Err(ScraperError::Timeout("navigation".into()));
        }
        Ok(())
    }

    async fn wait_for_feed(&self, feed: Feed, _timeout: Duration) -> Result<(), ScraperError> {
        let state = self.state();
        let present = !state.missing_feeds.contains(&feed)
            && (feed == Feed::Results || state.current_place().is_some());
        if present {
            Ok(())
        } else {
            Err(ScraperError::Timeout(format!("{:?} feed", feed)))
        }
    }

    async fn feed_height(&self, feed: Feed) -> Result<u64, ScraperError> {
        let mut state = self.state();
        if state.missing_feeds.contains(&feed) {
            return Err(ScraperError::ElementNotFound(format!("{:?} feed", feed)));
        }

        let state = &mut *state;
        match feed {
            Feed::Results => Ok(next_value(&state.result_heights, &mut state.result_cursor)),
            Feed::Reviews => {
                let place = state
                    .current
                    .as_ref()
                    .and_then(|url| state.places.get(url))
                    .ok_or_else(|| ScraperError::ElementNotFound("Reviews feed".into()))?;
                Ok(next_value(&place.review_heights, &mut state.review_cursor))
            }
        }
    }

    async fn scroll_feed(&self, feed: Feed, to: u64) -> Result<(), ScraperError> {
        let mut state = self.state();
        if state.missing_feeds.contains(&feed) {
            return Err(ScraperError::ElementNotFound(format!("{:?} feed", feed)));
        }
        state.scrolls.push((feed, to));
        Ok(())
    }

    async fn mutation_count(&self) -> Result<u64, ScraperError> {
        let mut state = self.state();
        let state = &mut *state;
        state.mutation_probes += 1;
        Ok(next_value(&state.mutations, &mut state.mutation_cursor))
    }

    async fn result_anchors(&self) -> Result<Vec<RawAnchor>, ScraperError> {
        Ok(self.state().anchors.clone())
    }

    async fn expand_more_reviews(&self, _timeout: Duration) -> Result<usize, ScraperError> {
        let state = self.state();
        match state.current_place() {
            Some(place) if !place.missing_control => Ok(1),
            _ => Err(ScraperError::Timeout("more reviews control".into())),
        }
    }

    async fn expand_review_texts(&self) -> Result<usize, ScraperError> {
        let mut state = self.state();
        let truncated = state.current_place().map_or(0, |p| p.truncated);
        if truncated > 0 {
            state.text_expansions += 1;
        }
        Ok(truncated)
    }

    async fn review_entries(&self) -> Result<Vec<RawReview>, ScraperError> {
        let state = self.state();
        let place = state
            .current_place()
            .ok_or_else(|| ScraperError::ElementNotFound("review entries".into()))?;
        if place.broken_entries {
            return Err(ScraperError::Extraction("unexpected review markup".into()));
        }
        Ok(place.reviews.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<(), ScraperError> {
        self.state().closed = true;
        Ok(())
    }
}

/// `FakePage` を1枚だけ開くセッション
pub struct FakeSession {
    page: FakePage,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Page = FakePage;

    async fn open_page(&mut self) -> Result<FakePage, ScraperError> {
        Ok(self.page.clone())
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeLauncher {
    page: FakePage,
    fail: bool,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            fail: false,
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn page(&self) -> &FakePage {
        &self.page
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self, _config: &ScraperConfig) -> Result<FakeSession, ScraperError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ScraperError::BrowserInit("no browser in tests".into()));
        }
        Ok(FakeSession {
            page: self.page.clone(),
            closes: Arc::clone(&self.closes),
        })
    }
}
