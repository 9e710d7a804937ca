//! 地図検索アプリの口コミスクレイパーモジュール
//!
//! 検索結果の店舗を順に開き、口コミ（星評価と本文）を収集する

pub mod consent;
pub mod harvest;
pub mod markup;
pub mod pagination;
mod scraper;
pub mod settle;
pub mod types;

pub use markup::MapsQuery;
pub use scraper::{MapsScraper, NoopObserver, RunObserver};
pub use types::{PlaceDescriptor, PlaceReport, RawAnchor, RawReview, Review, RunReport};
