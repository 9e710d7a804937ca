//! 無限スクロール一覧の読み込みと店舗リンクの収集

use tracing::{debug, info, warn};

use crate::config::{ScraperConfig, SettleStrategy};
use crate::error::ScraperError;
use crate::traits::{Feed, PageQuery};

use super::settle::settle;
use super::types::PlaceDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    /// 高さ比較の回数（= スクロール回数）
    pub rounds: usize,
    pub final_height: u64,
    /// 上限回数で打ち切った
    pub capped: bool,
}

/// 高さが伸びなくなるまでフィードを末尾へスクロールする
pub async fn scroll_until_stable<P>(
    page: &P,
    feed: Feed,
    strategy: &SettleStrategy,
    max_rounds: Option<usize>,
) -> Result<ScrollOutcome, ScraperError>
where
    P: PageQuery + ?Sized,
{
    let mut height = page.feed_height(feed).await?;
    let mut rounds = 0;

    loop {
        if let Some(max) = max_rounds {
            if rounds >= max {
                warn!(
                    "{:?} feed still growing after {} scrolls (height={}), stopping",
                    feed, rounds, height
                );
                return Ok(ScrollOutcome {
                    rounds,
                    final_height: height,
                    capped: true,
                });
            }
        }

        page.scroll_feed(feed, height).await?;
        settle(page, strategy).await;
        let next = page.feed_height(feed).await?;
        rounds += 1;
        debug!("{:?} feed scroll {}: {} -> {}", feed, rounds, height, next);

        if next == height {
            return Ok(ScrollOutcome {
                rounds,
                final_height: height,
                capped: false,
            });
        }
        height = next;
    }
}

/// 検索結果をすべて読み込み、店舗の一覧を返す
pub async fn collect_places<P>(
    page: &P,
    config: &ScraperConfig,
) -> Result<Vec<PlaceDescriptor>, ScraperError>
where
    P: PageQuery + ?Sized,
{
    page.wait_for_feed(Feed::Results, config.timeout).await?;

    let outcome =
        scroll_until_stable(page, Feed::Results, &config.settle, config.max_scroll_rounds).await?;
    debug!("Results feed loaded: {:?}", outcome);

    let anchors = page.result_anchors().await?;
    let total = anchors.len();

    // 名前のないリンクは店舗に紐付けられないので捨てる
    let places: Vec<PlaceDescriptor> = anchors
        .into_iter()
        .filter_map(|anchor| {
            let name = anchor.label.map(|l| l.trim().to_string())?;
            if name.is_empty() {
                return None;
            }
            Some(PlaceDescriptor {
                name: Some(name),
                url: anchor.href,
            })
        })
        .collect();

    info!(
        "Collected {} places ({} anchors without a name skipped)",
        places.len(),
        total - places.len()
    );
    Ok(places)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::types::RawAnchor;
    use crate::testing::FakePage;
    use std::time::Duration;

    fn fixed() -> SettleStrategy {
        SettleStrategy::fixed(Duration::from_millis(2500))
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_height_stops_growing() {
        let page = FakePage::new().with_result_heights(vec![100, 250, 400, 400]);

        let outcome = scroll_until_stable(&page, Feed::Results, &fixed(), None)
            .await
            .unwrap();

        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.final_height, 400);
        assert!(!outcome.capped);
        assert_eq!(
            page.scrolls(),
            vec![(Feed::Results, 100), (Feed::Results, 250), (Feed::Results, 400)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_cap_stops_endless_feed() {
        let page = FakePage::new().with_result_heights((1..=50).map(|h| h * 100).collect());

        let outcome = scroll_until_stable(&page, Feed::Results, &fixed(), Some(5))
            .await
            .unwrap();

        assert!(outcome.capped);
        assert_eq!(outcome.rounds, 5);
        assert_eq!(outcome.final_height, 600);
        assert_eq!(page.scrolls().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_feed_fails() {
        let page = FakePage::new().without_feed(Feed::Reviews);

        let result = scroll_until_stable(&page, Feed::Reviews, &fixed(), None).await;

        assert!(matches!(result, Err(ScraperError::ElementNotFound(_))));
        assert!(page.scrolls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_places_skips_nameless_anchors() {
        let page = FakePage::new()
            .with_result_heights(vec![300, 300])
            .with_anchors(vec![
                RawAnchor {
                    label: Some("Chez Paul".into()),
                    href: "https://maps.example/paul".into(),
                },
                RawAnchor {
                    label: None,
                    href: "https://maps.example/ad".into(),
                },
                RawAnchor {
                    label: Some("  ".into()),
                    href: "https://maps.example/blank".into(),
                },
                RawAnchor {
                    label: Some("Chez Paul".into()),
                    href: "https://maps.example/paul".into(),
                },
            ]);
        let config = ScraperConfig::new().with_settle(fixed());

        let places = collect_places(&page, &config).await.unwrap();

        // 重複はそのまま残す
        assert_eq!(places.len(), 2);
        assert_eq!(places[0], places[1]);
        assert_eq!(places[0].name.as_deref(), Some("Chez Paul"));
        assert_eq!(page.scrolls(), vec![(Feed::Results, 300)]);
    }
}
