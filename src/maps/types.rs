//! 口コミスクレイパーの型定義

use serde::{Deserialize, Serialize};

/// 検索結果一覧のリンク（ページから読んだままの値）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnchor {
    pub label: Option<String>,
    pub href: String,
}

/// 口コミ1件分の生データ
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawReview {
    /// 星評価要素のアクセシブルラベル（例: "4 étoiles"）
    pub rating_label: Option<String>,
    pub text: String,
}

/// 店舗
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDescriptor {
    pub name: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "stars", alias = "rating")]
    pub rating: Option<u8>,
    pub text: String,
}

/// 店舗ごとの結果
///
/// `reviews` が `None` なら収集自体に失敗している（`Some(vec![])` とは別物）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceReport {
    pub place: Option<String>,
    pub reviews: Option<Vec<Review>>,
}

impl PlaceReport {
    pub fn failed(place: Option<String>) -> Self {
        Self {
            place,
            reviews: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.reviews.is_none()
    }
}

/// 保存するドキュメント全体
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<PlaceReport>,
}

impl RunReport {
    pub fn review_count(&self) -> usize {
        self.results
            .iter()
            .filter_map(|r| r.reviews.as_ref())
            .map(Vec::len)
            .sum()
    }
}
