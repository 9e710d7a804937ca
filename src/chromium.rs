//! chromiumoxide によるページドライバ

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::EventFrameNavigated;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::maps::MapsQuery;
use crate::traits::{BrowserSession, PageDriver, SessionLauncher};

/// 要素待機のポーリング間隔（ミリ秒）
const ELEMENT_POLL_INTERVAL_MS: u64 = 250;

/// ラベル照合はフランス語ロケール前提
const BROWSER_LANG: &str = "fr-FR";

fn chrome_executable(config: &ScraperConfig) -> Option<PathBuf> {
    config.chrome_path.clone().or_else(|| {
        std::env::var("CHROME_PATH")
            .or_else(|_| std::env::var("CHROMIUM_PATH"))
            .ok()
            .map(PathBuf::from)
    })
}

/// Chromium を起動するランチャー
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self, config: &ScraperConfig) -> Result<ChromiumSession, ScraperError> {
        info!("Initializing browser...");

        // 同時実行でプロファイルがロックされないようユニークなディレクトリを使う
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("maps-reviews-{}", unique_id));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(1280, 800);

        if let Some(path) = chrome_executable(config) {
            builder = builder.chrome_executable(path);
        }

        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(config.navigation_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--lang={}", BROWSER_LANG));

        if config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        info!("Browser initialized successfully");
        Ok(ChromiumSession {
            browser,
            handler_task,
            navigation_timeout: config.navigation_timeout,
        })
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Page = MapsQuery<ChromiumPage>;

    async fn open_page(&mut self) -> Result<Self::Page, ScraperError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        Ok(MapsQuery::new(ChromiumPage {
            page,
            navigation_timeout: self.navigation_timeout,
        }))
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        info!("Closing browser...");

        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ終了エラー: {}", e)));
        if closed.is_ok() {
            if let Err(e) = self.browser.wait().await {
                debug!("Failed to wait for browser exit: {}", e);
            }
        }
        self.handler_task.abort();

        closed.map(|_| ())
    }
}

pub struct ChromiumPage {
    page: Page,
    navigation_timeout: Duration,
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        debug!("Navigating to {}", url);
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| ScraperError::Navigation(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| ScraperError::Navigation(e.to_string()))?;
            Ok::<(), ScraperError>(())
        };

        timeout(self.navigation_timeout, navigation)
            .await
            .map_err(|_| {
                ScraperError::Timeout(format!(
                    "{} へのナビゲーションが{}秒以内に完了しませんでした",
                    url,
                    self.navigation_timeout.as_secs()
                ))
            })?
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        wait: Duration,
    ) -> Result<(), ScraperError> {
        let start = Instant::now();

        loop {
            match self.page.find_element(selector).await {
                Ok(_) => {
                    debug!("Element {} found after {:?}", selector, start.elapsed());
                    return Ok(());
                }
                Err(e) => {
                    if start.elapsed() >= wait {
                        return Err(ScraperError::Timeout(format!(
                            "{} が{}秒以内に見つかりません: {}",
                            selector,
                            wait.as_secs(),
                            e
                        )));
                    }
                }
            }

            sleep(Duration::from_millis(ELEMENT_POLL_INTERVAL_MS)).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ScraperError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn click(&self, selector: &str) -> Result<(), ScraperError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))?
            .click()
            .await
            .map_err(|e| ScraperError::JavaScript(format!("{} クリック: {}", selector, e)))?;
        Ok(())
    }

    async fn click_and_await_navigation(
        &self,
        selector: &str,
        wait: Duration,
    ) -> Result<(), ScraperError> {
        // クリック前に購読しないと、読み込み済みのフレームで即座に完了扱いになる
        let mut navigated = self
            .page
            .event_listener::<EventFrameNavigated>()
            .await
            .map_err(|e| ScraperError::Navigation(format!("ナビゲーション監視: {}", e)))?;

        self.click(selector).await?;

        let navigation = async {
            while let Some(event) = navigated.next().await {
                if event.frame.parent_id.is_none() {
                    debug!("Main frame navigated to {}", event.frame.url);
                    return self
                        .page
                        .wait_for_navigation()
                        .await
                        .map(|_| ())
                        .map_err(|e| ScraperError::Navigation(e.to_string()));
                }
            }
            Err(ScraperError::Navigation(format!(
                "{} クリック後にイベントが途切れました",
                selector
            )))
        };

        match timeout(wait, navigation).await {
            Ok(result) => result,
            Err(_) => Err(ScraperError::Timeout(format!(
                "{} クリック後のナビゲーションが{}秒以内に完了しませんでした",
                selector,
                wait.as_secs()
            ))),
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| ScraperError::JavaScript(format!("スクリーンショット: {}", e)))
    }

    async fn close(&self) -> Result<(), ScraperError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| ScraperError::BrowserInit(format!("ページ終了エラー: {}", e)))
    }
}
