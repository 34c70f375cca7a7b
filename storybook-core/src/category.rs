//! Shared text-to-category classifier.
//!
//! Both the curated image catalog and the vector placeholder generator pick
//! their styling from the same category, so the classification lives in one
//! place and the two can never disagree about a paragraph.

use serde::{Deserialize, Serialize};

/// Illustration category derived from story text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Animals,
    Nature,
    Fantasy,
    Home,
    Adventure,
}

/// All categories in declaration order.
pub const ALL_CATEGORIES: [Category; 5] = [
    Category::Animals,
    Category::Nature,
    Category::Fantasy,
    Category::Home,
    Category::Adventure,
];

/// Keyword substrings and the single category each one votes for.
const KEYWORDS: &[(&str, Category)] = &[
    // Animals
    ("动物", Category::Animals),
    ("小兔", Category::Animals),
    ("兔子", Category::Animals),
    ("小猫", Category::Animals),
    ("猫咪", Category::Animals),
    ("小狗", Category::Animals),
    ("狗狗", Category::Animals),
    ("小鸟", Category::Animals),
    ("鸟儿", Category::Animals),
    // Nature
    ("森林", Category::Nature),
    ("树", Category::Nature),
    ("花", Category::Nature),
    ("草地", Category::Nature),
    ("山", Category::Nature),
    ("天空", Category::Nature),
    ("云", Category::Nature),
    ("太阳", Category::Nature),
    ("月亮", Category::Nature),
    // Home
    ("家", Category::Home),
    ("房子", Category::Home),
    ("房间", Category::Home),
    ("床", Category::Home),
    ("厨房", Category::Home),
    ("客厅", Category::Home),
    // Adventure
    ("冒险", Category::Adventure),
    ("探险", Category::Adventure),
    ("旅行", Category::Adventure),
    ("路", Category::Adventure),
    ("山峰", Category::Adventure),
    ("海", Category::Adventure),
    // Fantasy
    ("魔法", Category::Fantasy),
    ("魔术", Category::Fantasy),
    ("仙女", Category::Fantasy),
    ("城堡", Category::Fantasy),
    ("彩虹", Category::Fantasy),
    ("星星", Category::Fantasy),
];

impl Category {
    /// Classify story text by keyword scoring.
    ///
    /// Each keyword occurrence counts one vote for its category; the
    /// category with the strictly highest vote count wins. Ties and texts
    /// with no matching keyword fall back to [`Category::Nature`].
    pub fn classify(text: &str) -> Category {
        let text = text.to_lowercase();
        let mut scores = [0usize; ALL_CATEGORIES.len()];

        for (keyword, category) in KEYWORDS {
            if text.contains(keyword) {
                scores[category.index()] += 1;
            }
        }

        let best = *scores.iter().max().unwrap_or(&0);
        if best == 0 {
            return Category::Nature;
        }

        let mut winner = None;
        for category in ALL_CATEGORIES {
            if scores[category.index()] == best {
                if winner.is_some() {
                    return Category::Nature;
                }
                winner = Some(category);
            }
        }
        winner.unwrap_or(Category::Nature)
    }

    /// Display label for the category.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Animals => "可爱动物",
            Category::Nature => "美丽自然",
            Category::Fantasy => "奇幻世界",
            Category::Home => "温馨家园",
            Category::Adventure => "冒险旅程",
        }
    }

    fn index(&self) -> usize {
        match self {
            Category::Animals => 0,
            Category::Nature => 1,
            Category::Fantasy => 2,
            Category::Home => 3,
            Category::Adventure => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_animals() {
        assert_eq!(Category::classify("小兔子在草地上玩"), Category::Animals);
    }

    #[test]
    fn test_classify_default_nature() {
        assert_eq!(Category::classify("今天很开心"), Category::Nature);
        assert_eq!(Category::classify(""), Category::Nature);
    }

    #[test]
    fn test_classify_tie_falls_back_to_nature() {
        // One vote for home, one for fantasy
        assert_eq!(Category::classify("城堡旁边有个家"), Category::Nature);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let text = "小兔子的森林冒险";
        let first = Category::classify(text);
        for _ in 0..10 {
            assert_eq!(Category::classify(text), first);
        }
        // 小兔 + 兔子 outvote 森林 and 冒险
        assert_eq!(first, Category::Animals);
    }

    #[test]
    fn test_keywords_map_to_single_category() {
        for (i, (keyword, category)) in KEYWORDS.iter().enumerate() {
            for (other_keyword, other_category) in &KEYWORDS[i + 1..] {
                if keyword == other_keyword {
                    assert_eq!(
                        category, other_category,
                        "keyword {keyword} maps to two categories"
                    );
                }
            }
        }
    }
}
