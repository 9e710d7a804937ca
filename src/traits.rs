use std::time::Duration;

use async_trait::async_trait;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::maps::types::{RawAnchor, RawReview};

/// ブラウザの1ページに対する低レベル操作
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError>;

    /// セレクタに一致する要素が現れるまで待機
    async fn wait_for_element(&self, selector: &str, timeout: Duration)
        -> Result<(), ScraperError>;

    /// ページ内でスクリプトを評価（undefined は Null として返す）
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError>;

    async fn click(&self, selector: &str) -> Result<(), ScraperError>;

    /// クリックとそれに続くナビゲーション完了待ちを一体で行う
    async fn click_and_await_navigation(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScraperError>;

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError>;

    async fn close(&self) -> Result<(), ScraperError>;
}

/// スクロール対象のフィード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// 検索結果一覧
    Results,
    /// 店舗詳細の口コミ一覧
    Reviews,
}

/// 対象アプリのマークアップを隠蔽したページ操作
///
/// 同意ゲート・ページネーション・口コミ収集はこのトレイトだけに依存する。
/// セレクタやラベル文字列を知っているのは実装側のみ。
#[async_trait]
pub trait PageQuery: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError>;

    /// ページタイトル要素のテキスト（要素が現れなければエラー）
    async fn title_text(&self, timeout: Duration) -> Result<String, ScraperError>;

    /// 同意ボタンを押してナビゲーション完了まで待つ
    async fn accept_consent(&self, timeout: Duration) -> Result<(), ScraperError>;

    async fn wait_for_feed(&self, feed: Feed, timeout: Duration) -> Result<(), ScraperError>;

    async fn feed_height(&self, feed: Feed) -> Result<u64, ScraperError>;

    async fn scroll_feed(&self, feed: Feed, to: u64) -> Result<(), ScraperError>;

    /// ページ読み込み以降のDOM変更回数
    async fn mutation_count(&self) -> Result<u64, ScraperError>;

    async fn result_anchors(&self) -> Result<Vec<RawAnchor>, ScraperError>;

    /// 「他の口コミ」ボタンをすべて押す。押した数を返す
    async fn expand_more_reviews(&self, timeout: Duration) -> Result<usize, ScraperError>;

    /// 口コミ本文の「もっと見る」をすべて押す。押した数を返す
    async fn expand_review_texts(&self) -> Result<usize, ScraperError>;

    /// 表示中の口コミを抽出
    async fn review_entries(&self) -> Result<Vec<RawReview>, ScraperError>;

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError>;

    async fn close(&self) -> Result<(), ScraperError>;
}

/// 起動済みのブラウザセッション
#[async_trait]
pub trait BrowserSession: Send {
    type Page: PageQuery;

    async fn open_page(&mut self) -> Result<Self::Page, ScraperError>;

    async fn close(&mut self) -> Result<(), ScraperError>;
}

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self, config: &ScraperConfig) -> Result<Self::Session, ScraperError>;
}
