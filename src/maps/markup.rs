//! 対象アプリのマークアップ依存部分
//!
//! セレクタ・アクセシブルラベル（フランス語ロケール）・ページ内スクリプトは
//! すべてここに置く。マークアップが変わったらこのファイルだけを直す。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::ScraperError;
use crate::traits::{Feed, PageDriver, PageQuery};

use super::types::{RawAnchor, RawReview};

const SEARCH_URL_BASE: &str = "https://www.google.com/maps/search/";

const TITLE_SELECTOR: &str = "h1";
pub const CONSENT_PAGE_TITLE: &str = "Avant d'accéder à Google";
const CONSENT_BUTTON_SELECTOR: &str = "button";

const FEED_SELECTOR: &str = "div[role='feed']";
const RESULTS_FEED_LABEL: &str = "Résultats pour";
const RESULT_ANCHOR_SELECTOR: &str = "a.hfpxzc";

const MORE_REVIEWS_SELECTOR: &str = "button.M77dve";
const MORE_REVIEWS_LABEL: &str = "Plus d'avis";

const REVIEWS_PANE_SELECTOR: &str = "div.m6QErb.DxyBCb";
const REVIEW_ENTRY_SELECTOR: &str = ".jJc9Ad";
const REVIEW_CONTENT_SELECTOR: &str = ".GHT2ce";
const REVIEW_STARS_SELECTOR: &str = ".kvMYJc";
const REVIEW_EXPAND_SELECTOR: &str = ".w8nwRe";
const REVIEW_TEXT_SELECTOR: &str = ".wiI7pd";

const MUTATION_COUNTER: &str = "__mapsReviewMutations";

/// 検索クエリからURLを組み立てる（空白は `+`）
pub fn search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
    format!("{}{}", SEARCH_URL_BASE, encoded)
}

/// JS文字列リテラルとして埋め込む
fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// フィード要素を探す関数 `locate()` の定義
fn locate_feed_fn(feed: Feed) -> String {
    match feed {
        // 結果一覧は aria-label で判別（無関係な feed が並ぶことがある）
        Feed::Results => format!(
            r#"const locate = () => {{
                const feeds = [...document.querySelectorAll({feed})];
                const labelled = feeds.find(f => (f.getAttribute('aria-label') || '').includes({label}));
                if (labelled) return labelled;
                return feeds.length === 1 ? feeds[0] : null;
            }};"#,
            feed = js_str(FEED_SELECTOR),
            label = js_str(RESULTS_FEED_LABEL),
        ),
        // 口コミ一覧は口コミを含むペイン、なければ最初の口コミのスクロール可能な祖先
        Feed::Reviews => format!(
            r#"const locate = () => {{
                const pane = [...document.querySelectorAll({pane})].find(p => p.querySelector({entry}));
                if (pane) return pane;
                let el = document.querySelector({entry});
                while (el && el.scrollHeight <= el.clientHeight) el = el.parentElement;
                return el;
            }};"#,
            pane = js_str(REVIEWS_PANE_SELECTOR),
            entry = js_str(REVIEW_ENTRY_SELECTOR),
        ),
    }
}

fn feed_script(feed: Feed, body: &str) -> String {
    format!(
        "(() => {{ {} const feed = locate(); {} }})()",
        locate_feed_fn(feed),
        body
    )
}

fn feed_selector(feed: Feed) -> &'static str {
    match feed {
        Feed::Results => FEED_SELECTOR,
        Feed::Reviews => REVIEW_ENTRY_SELECTOR,
    }
}

/// `PageDriver` の上に対象アプリ向けの操作を実装したもの
pub struct MapsQuery<D> {
    driver: D,
}

impl<D: PageDriver> MapsQuery<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[async_trait]
impl<D: PageDriver> PageQuery for MapsQuery<D> {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        self.driver.navigate(url).await
    }

    async fn title_text(&self, timeout: Duration) -> Result<String, ScraperError> {
        self.driver.wait_for_element(TITLE_SELECTOR, timeout).await?;

        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.textContent : null; }})()",
            js_str(TITLE_SELECTOR)
        );
        match self.driver.evaluate(&script).await? {
            Value::String(title) => Ok(title),
            _ => Err(ScraperError::ElementNotFound(format!(
                "タイトル要素 ({})",
                TITLE_SELECTOR
            ))),
        }
    }

    async fn accept_consent(&self, timeout: Duration) -> Result<(), ScraperError> {
        self.driver
            .wait_for_element(CONSENT_BUTTON_SELECTOR, timeout)
            .await?;
        self.driver
            .click_and_await_navigation(CONSENT_BUTTON_SELECTOR, timeout)
            .await
    }

    async fn wait_for_feed(&self, feed: Feed, timeout: Duration) -> Result<(), ScraperError> {
        self.driver
            .wait_for_element(feed_selector(feed), timeout)
            .await
    }

    async fn feed_height(&self, feed: Feed) -> Result<u64, ScraperError> {
        let script = feed_script(feed, "return feed ? feed.scrollHeight : null;");
        self.driver
            .evaluate(&script)
            .await?
            .as_u64()
            .ok_or_else(|| ScraperError::ElementNotFound(format!("フィード ({:?})", feed)))
    }

    async fn scroll_feed(&self, feed: Feed, to: u64) -> Result<(), ScraperError> {
        let body = format!(
            "if (!feed) return false; feed.scrollTo(0, {}); return true;",
            to
        );
        let scrolled = self.driver.evaluate(&feed_script(feed, &body)).await?;
        if scrolled.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound(format!("フィード ({:?})", feed)))
        }
    }

    async fn mutation_count(&self) -> Result<u64, ScraperError> {
        let script = format!(
            r#"(() => {{
                if (window.{c} === undefined) {{
                    window.{c} = 0;
                    new MutationObserver(ms => {{ window.{c} += ms.length; }})
                        .observe(document.documentElement, {{ childList: true, subtree: true, attributes: true, characterData: true }});
                }}
                return window.{c};
            }})()"#,
            c = MUTATION_COUNTER
        );
        Ok(self.driver.evaluate(&script).await?.as_u64().unwrap_or(0))
    }

    async fn result_anchors(&self) -> Result<Vec<RawAnchor>, ScraperError> {
        let script = format!(
            "[...document.querySelectorAll({})].map(a => ({{ label: a.getAttribute('aria-label'), href: a.href }}))",
            js_str(RESULT_ANCHOR_SELECTOR)
        );
        let value = self.driver.evaluate(&script).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn expand_more_reviews(&self, timeout: Duration) -> Result<usize, ScraperError> {
        self.driver
            .wait_for_element(MORE_REVIEWS_SELECTOR, timeout)
            .await?;

        let script = format!(
            r#"(() => {{
                let clicked = 0;
                document.querySelectorAll({sel}).forEach(b => {{
                    if ((b.getAttribute('aria-label') || '').includes({label})) {{
                        b.click();
                        clicked += 1;
                    }}
                }});
                return clicked;
            }})()"#,
            sel = js_str(MORE_REVIEWS_SELECTOR),
            label = js_str(MORE_REVIEWS_LABEL),
        );
        let clicked = self.driver.evaluate(&script).await?.as_u64().unwrap_or(0) as usize;
        debug!("More-reviews controls clicked: {}", clicked);
        Ok(clicked)
    }

    async fn expand_review_texts(&self) -> Result<usize, ScraperError> {
        // 本文ブロックは各口コミの2番目の content ブロック
        let script = format!(
            r#"(() => {{
                let clicked = 0;
                document.querySelectorAll({entry}).forEach(e => {{
                    const content = e.querySelectorAll({content})[1];
                    const more = content ? content.querySelector({expand}) : null;
                    if (more) {{
                        more.click();
                        clicked += 1;
                    }}
                }});
                return clicked;
            }})()"#,
            entry = js_str(REVIEW_ENTRY_SELECTOR),
            content = js_str(REVIEW_CONTENT_SELECTOR),
            expand = js_str(REVIEW_EXPAND_SELECTOR),
        );
        Ok(self.driver.evaluate(&script).await?.as_u64().unwrap_or(0) as usize)
    }

    async fn review_entries(&self) -> Result<Vec<RawReview>, ScraperError> {
        let script = format!(
            r#"[...document.querySelectorAll({entry})].map(e => {{
                const content = e.querySelectorAll({content})[1];
                if (!content) return null;
                const stars = content.querySelector({stars});
                const text = content.querySelector({text});
                return {{
                    rating_label: stars ? stars.getAttribute('aria-label') : null,
                    text: text ? (text.textContent || '') : '',
                }};
            }})"#,
            entry = js_str(REVIEW_ENTRY_SELECTOR),
            content = js_str(REVIEW_CONTENT_SELECTOR),
            stars = js_str(REVIEW_STARS_SELECTOR),
            text = js_str(REVIEW_TEXT_SELECTOR),
        );
        let value = self.driver.evaluate(&script).await?;
        let entries: Vec<Option<RawReview>> = serde_json::from_value(value)?;

        // 本文ブロックのない口コミはマークアップ変更とみなす
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                entry.ok_or_else(|| {
                    ScraperError::Extraction(format!(
                        "{}件目の口コミに本文ブロック ({}) がありません",
                        i + 1,
                        REVIEW_CONTENT_SELECTOR
                    ))
                })
            })
            .collect()
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        self.driver.screenshot().await
    }

    async fn close(&self) -> Result<(), ScraperError> {
        self.driver.close().await
    }
}
