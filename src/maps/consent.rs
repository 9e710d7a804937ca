//! 同意ページ（Cookie 確認画面）の判定と通過

use std::time::Duration;

use tracing::{debug, info};

use crate::error::ScraperError;
use crate::traits::PageQuery;

use super::markup::CONSENT_PAGE_TITLE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    /// 同意ページは表示されなかった
    NotShown,
    /// 同意ページを閉じた
    Dismissed,
}

/// 現在のページが同意ページか
///
/// タイトル要素が現れない場合はエラー（未到達かマークアップ変更）。
pub async fn is_consent_page<P>(page: &P, timeout: Duration) -> Result<bool, ScraperError>
where
    P: PageQuery + ?Sized,
{
    let title = page.title_text(timeout).await?;
    debug!("Page title: {:?}", title);
    Ok(title.trim() == CONSENT_PAGE_TITLE)
}

pub async fn dismiss_consent_page<P>(page: &P, timeout: Duration) -> Result<(), ScraperError>
where
    P: PageQuery + ?Sized,
{
    page.accept_consent(timeout).await
}

/// 同意ページが出ていれば閉じ、通過できたか再確認する
pub async fn pass_consent_gate<P>(
    page: &P,
    timeout: Duration,
) -> Result<ConsentOutcome, ScraperError>
where
    P: PageQuery + ?Sized,
{
    if !is_consent_page(page, timeout).await? {
        info!("No consent page shown");
        return Ok(ConsentOutcome::NotShown);
    }

    info!("Consent page detected, accepting...");
    dismiss_consent_page(page, timeout).await?;

    if is_consent_page(page, timeout).await? {
        return Err(ScraperError::ConsentNotPassed);
    }

    info!("Passed the consent page");
    Ok(ConsentOutcome::Dismissed)
}
