//! 店舗ごとの口コミ収集

use tracing::{debug, info, warn};

use crate::config::{AcceptancePolicy, ScraperConfig};
use crate::error::ScraperError;
use crate::traits::{Feed, PageQuery};

use super::pagination::scroll_until_stable;
use super::settle::settle;
use super::types::{PlaceDescriptor, PlaceReport, RawReview, Review};

/// 星評価ラベルから評価値を取り出す
///
/// ラベル中の最初の数値を使う（"4 étoiles" → 4、"4,0 sur 5" → 4）。
/// 整数でない・1〜5 の範囲外・数値なしは `None`。
pub fn parse_rating(label: &str) -> Option<u8> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let rest = &label[start..];
    let int_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let whole: u8 = rest[..int_end].parse().ok()?;

    let mut after = rest[int_end..].chars();
    if let Some(',' | '.') = after.next() {
        let fraction: String = after.take_while(|c| c.is_ascii_digit()).collect();
        if fraction.chars().any(|c| c != '0') {
            return None;
        }
    }

    (1..=5).contains(&whole).then_some(whole)
}

impl AcceptancePolicy {
    pub fn accepts(&self, review: &Review) -> bool {
        let Some(rating) = review.rating else {
            return false;
        };
        if review.text.trim().is_empty() {
            return false;
        }
        self.max_rating.map_or(true, |max| rating <= max)
    }
}

impl From<RawReview> for Review {
    fn from(raw: RawReview) -> Self {
        Review {
            rating: raw.rating_label.as_deref().and_then(parse_rating),
            text: raw.text.trim().to_string(),
        }
    }
}

/// 生データを変換して採用条件で絞る（順序は維持）
pub fn accept_reviews(raw: Vec<RawReview>, policy: &AcceptancePolicy) -> Vec<Review> {
    raw.into_iter()
        .map(Review::from)
        .filter(|review| policy.accepts(review))
        .collect()
}

/// 1店舗の口コミを収集する
///
/// 失敗してもエラーは返さず、`reviews: None` のレポートにする。
/// 再試行可能なエラーは `place_attempts` 回まで試す。
pub async fn harvest_place<P>(
    page: &P,
    place: &PlaceDescriptor,
    config: &ScraperConfig,
) -> PlaceReport
where
    P: PageQuery + ?Sized,
{
    let attempts = config.place_attempts.max(1);
    let label = place.name.as_deref().unwrap_or(&place.url);

    for attempt in 1..=attempts {
        match try_harvest(page, place, config).await {
            Ok(reviews) => {
                info!("{}: {} reviews accepted", label, reviews.len());
                return PlaceReport {
                    place: place.name.clone(),
                    reviews: Some(reviews),
                };
            }
            Err(e) => {
                warn!(
                    "Harvest attempt {}/{} failed for {}: {}",
                    attempt, attempts, label, e
                );
                if config.debug {
                    log_screenshot(page).await;
                }
                if !e.is_retryable() {
                    break;
                }
            }
        }
    }

    PlaceReport::failed(place.name.clone())
}

async fn try_harvest<P>(
    page: &P,
    place: &PlaceDescriptor,
    config: &ScraperConfig,
) -> Result<Vec<Review>, ScraperError>
where
    P: PageQuery + ?Sized,
{
    page.navigate(&place.url).await?;

    // 口コミパネルを開く
    let clicked = page.expand_more_reviews(config.timeout).await?;
    debug!("Opened reviews panel ({} controls)", clicked);
    page.wait_for_feed(Feed::Reviews, config.timeout).await?;

    let outcome =
        scroll_until_stable(page, Feed::Reviews, &config.settle, config.max_scroll_rounds).await?;
    debug!("Reviews feed loaded: {:?}", outcome);

    // 省略された本文を展開してから読む
    let expanded = page.expand_review_texts().await?;
    if expanded > 0 {
        debug!("Expanded {} truncated reviews", expanded);
        settle(page, &config.settle).await;
    }

    let raw = page.review_entries().await?;
    let total = raw.len();
    let reviews = accept_reviews(raw, &config.policy);
    debug!("{} of {} reviews passed the policy", reviews.len(), total);
    Ok(reviews)
}

async fn log_screenshot<P>(page: &P)
where
    P: PageQuery + ?Sized,
{
    match page.screenshot().await {
        Ok(png) if !png.is_empty() => {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
            debug!("Failure screenshot: data:image/png;base64,{}", encoded);
        }
        Ok(_) => {}
        Err(e) => debug!("Failed to take screenshot: {}", e),
    }
}
