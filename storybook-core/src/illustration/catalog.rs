//! Curated stock-image catalog.
//!
//! A static mapping of category to an ordered list of child-friendly stock
//! image URLs. Lookup is deterministic (index modulo list length); whether
//! a URL is actually reachable is checked with a bounded liveness probe.

use std::time::Duration;

use async_trait::async_trait;

use crate::category::Category;

const ANIMALS: [&str; 3] = [
    "https://images.unsplash.com/photo-1425082661705-1834bfd09dca?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1583337130417-3346a1be7dee?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1574158622682-e40e69881006?w=400&h=300&fit=crop",
];

const NATURE: [&str; 3] = [
    "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1506260408121-e353d10b87c7?w=400&h=300&fit=crop",
];

const FANTASY: [&str; 3] = [
    "https://images.unsplash.com/photo-1518709268805-4e9042af2176?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1544947950-fa07a98d237f?w=400&h=300&fit=crop",
];

const HOME: [&str; 3] = [
    "https://images.unsplash.com/photo-1560448204-e02f11c3d0e2?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1586023492125-27b2c045efd7?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1513475382585-d06e58bcb0e0?w=400&h=300&fit=crop",
];

const ADVENTURE: [&str; 3] = [
    "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1469474968028-56623f02e42e?w=400&h=300&fit=crop",
    "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?w=400&h=300&fit=crop",
];

fn urls_for(category: Category) -> &'static [&'static str] {
    match category {
        Category::Animals => &ANIMALS,
        Category::Nature => &NATURE,
        Category::Fantasy => &FANTASY,
        Category::Home => &HOME,
        Category::Adventure => &ADVENTURE,
    }
}

/// Pick a stock URL for the text's category, cycling by paragraph index.
pub fn lookup(text: &str, index: usize) -> &'static str {
    let urls = urls_for(Category::classify(text));
    urls[index % urls.len()]
}

/// Liveness probing for stock URLs.
#[async_trait]
pub trait UrlProber: Send + Sync {
    /// Whether the resource at `url` currently loads.
    async fn probe(&self, url: &str) -> bool;
}

/// Prober backed by an HTTP GET.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlProber for HttpProber {
    async fn probe(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Probe with a hard deadline.
///
/// Resolves `false` once `timeout` elapses even if the underlying load
/// neither succeeds nor errors.
pub async fn probe_with_timeout(prober: &dyn UrlProber, url: &str, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, prober.probe(url))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_cycles_by_index() {
        let text = "小兔子在玩";
        let urls = urls_for(Category::Animals);

        for index in 0..9 {
            assert_eq!(lookup(text, index), urls[index % urls.len()]);
            assert_eq!(lookup(text, index), lookup(text, index + 3 * urls.len()));
        }
    }

    #[test]
    fn test_lookup_matches_shared_classifier() {
        for text in ["小猫咪", "森林和树", "魔法城堡的彩虹", "想回家了", "随便什么"] {
            let category = Category::classify(text);
            assert_eq!(lookup(text, 0), urls_for(category)[0]);
        }
    }

    #[test]
    fn test_every_category_has_urls() {
        for category in crate::category::ALL_CATEGORIES {
            assert!(!urls_for(category).is_empty());
        }
    }

    struct HangingProber;

    #[async_trait]
    impl UrlProber for HangingProber {
        async fn probe(&self, _url: &str) -> bool {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_probe_timeout_resolves_false() {
        let reachable = probe_with_timeout(
            &HangingProber,
            "https://img.example/slow.png",
            Duration::from_millis(10),
        )
        .await;
        assert!(!reachable);
    }
}
