//! Deterministic vector placeholders.
//!
//! Two flavors: a flat color tile assigned synchronously so the reader sees
//! something before any network round-trip, and the richer category-styled
//! vector art used as the final fallback tier. Both are pure functions of
//! their inputs and can never fail.

use crate::category::Category;
use crate::story::ImageSource;

/// Logical canvas size shared by all placeholders.
const WIDTH: u32 = 400;
const HEIGHT: u32 = 300;

/// Color cycle for the synchronous tiles.
const TILE_COLORS: [&str; 5] = ["#FFB6C1", "#87CEEB", "#98FB98", "#DDA0DD", "#F0E68C"];

/// Decoration slots: fixed position and glyph size.
const DECORATION_SLOTS: [(u32, u32, u32); 3] = [(50, 80, 16), (320, 120, 14), (80, 200, 18)];

/// Per-category styling for the vector art.
struct VectorStyle {
    gradient: [&'static str; 2],
    icon: &'static str,
    decorations: [&'static str; 3],
}

fn style_for(category: Category) -> &'static VectorStyle {
    match category {
        Category::Animals => &VectorStyle {
            gradient: ["#FF6B9D", "#FFB6C1"],
            icon: "🐰",
            decorations: ["🌸", "🦋", "💕"],
        },
        Category::Nature => &VectorStyle {
            gradient: ["#4ECDC4", "#44A08D"],
            icon: "🌳",
            decorations: ["🌺", "🍃", "✨"],
        },
        Category::Fantasy => &VectorStyle {
            gradient: ["#A8E6CF", "#DDA0DD"],
            icon: "🌟",
            decorations: ["⭐", "🎭", "🎪"],
        },
        Category::Home => &VectorStyle {
            gradient: ["#FFE066", "#FFA07A"],
            icon: "🏠",
            decorations: ["💝", "🎁", "🌈"],
        },
        Category::Adventure => &VectorStyle {
            gradient: ["#87CEEB", "#20B2AA"],
            icon: "🗺️",
            decorations: ["⛰️", "🌊", "🦅"],
        },
    }
}

/// Flat color tile labeled with the paragraph number.
///
/// This is the synchronous placeholder assigned before any tier runs.
pub fn color_tile(index: usize) -> ImageSource {
    let color = TILE_COLORS[index % TILE_COLORS.len()];
    let svg = format!(
        r#"<svg width="{WIDTH}" height="{HEIGHT}" xmlns="http://www.w3.org/2000/svg">
  <rect width="100%" height="100%" fill="{color}"/>
  <text x="50%" y="45%" text-anchor="middle" fill="white" font-size="24" font-family="Arial">🎨</text>
  <text x="50%" y="60%" text-anchor="middle" fill="white" font-size="14" font-family="Arial">第 {number} 幅插图</text>
</svg>"#,
        number = index + 1,
    );
    ImageSource::Vector(svg)
}

/// Category-styled vector art for a paragraph.
///
/// Pure function of `(text, index)`: the category comes from the shared
/// classifier and the index only varies decoration rotation and the badge
/// number.
pub fn vector_art(text: &str, index: usize) -> ImageSource {
    let category = Category::classify(text);
    let style = style_for(category);
    let label = category.label();

    let mut decorations = String::new();
    for (slot, (position, glyph)) in DECORATION_SLOTS
        .iter()
        .zip(style.decorations.iter())
        .enumerate()
    {
        let (x, y, size) = *position;
        let rotation = (index * 30 + slot * 45) % 360;
        decorations.push_str(&format!(
            r#"  <text x="{x}" y="{y}" text-anchor="middle" fill="rgba(255,255,255,0.8)" font-size="{size}" font-family="Arial" transform="rotate({rotation} {x} {y})">{glyph}</text>
"#,
        ));
    }

    let svg = format!(
        r#"<svg width="{WIDTH}" height="{HEIGHT}" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <linearGradient id="bg-{index}" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" stop-color="{from}"/>
      <stop offset="100%" stop-color="{to}"/>
    </linearGradient>
    <radialGradient id="light-{index}" cx="30%" cy="30%">
      <stop offset="0%" stop-color="rgba(255,255,255,0.8)"/>
      <stop offset="100%" stop-color="rgba(255,255,255,0)"/>
    </radialGradient>
  </defs>
  <rect width="100%" height="100%" fill="url(#bg-{index})"/>
  <ellipse cx="120" cy="80" rx="60" ry="40" fill="url(#light-{index})" opacity="0.6"/>
{decorations}  <text x="50%" y="45%" text-anchor="middle" fill="white" font-size="48" font-family="Arial">{icon}</text>
  <text x="50%" y="70%" text-anchor="middle" fill="white" font-size="14" font-family="Arial" opacity="0.9">{label}</text>
  <circle cx="350" cy="50" r="20" fill="rgba(255,255,255,0.3)"/>
  <text x="350" y="55" text-anchor="middle" fill="white" font-size="14" font-weight="bold">{number}</text>
</svg>"#,
        from = style.gradient[0],
        to = style.gradient[1],
        icon = style.icon,
        number = index + 1,
    );

    ImageSource::Vector(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_tile_cycles() {
        let first = color_tile(0);
        let again = color_tile(TILE_COLORS.len());
        assert_eq!(first, again);

        match color_tile(2) {
            ImageSource::Vector(svg) => assert!(svg.contains("第 3 幅插图")),
            other => panic!("expected vector, got {other:?}"),
        }
    }

    #[test]
    fn test_vector_art_never_empty() {
        for (text, index) in [("", 0), ("小兔子", 3), ("无关内容", 99)] {
            match vector_art(text, index) {
                ImageSource::Vector(svg) => assert!(!svg.is_empty()),
                other => panic!("expected vector, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_vector_art_deterministic() {
        assert_eq!(vector_art("森林里的树", 2), vector_art("森林里的树", 2));
        assert_ne!(vector_art("森林里的树", 2), vector_art("森林里的树", 3));
    }

    #[test]
    fn test_vector_art_badge_and_label() {
        let ImageSource::Vector(svg) = vector_art("小兔子和小猫", 4) else {
            panic!("expected vector");
        };
        assert!(svg.contains(">5<"));
        assert!(svg.contains("可爱动物"));
        assert!(svg.contains("🐰"));
    }

    #[test]
    fn test_decoration_rotation_varies_with_index() {
        let ImageSource::Vector(a) = vector_art("森林", 0) else {
            panic!()
        };
        let ImageSource::Vector(b) = vector_art("森林", 1) else {
            panic!()
        };
        assert!(a.contains("rotate(0 50 80)"));
        assert!(b.contains("rotate(30 50 80)"));
    }
}
