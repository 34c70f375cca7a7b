//! Story data model and narration script derivation.
//!
//! A [`Story`] is created once per generation cycle. Its title is immutable
//! after creation; paragraphs are mutated in place by the illustration
//! pipeline to attach an [`ImageSource`]. The narration script is derived
//! from the same paragraphs and regenerated whenever a new story is
//! displayed.

use serde::{Deserialize, Serialize};

/// Characters that end a sentence for narration purposes.
const SENTENCE_TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

/// A generated story: a title and its ordered paragraphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
}

impl Story {
    /// Create a story from a title and paragraph texts.
    ///
    /// Empty paragraph texts are dropped.
    pub fn new(title: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            title: title.into(),
            paragraphs: texts
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .map(Paragraph::new)
                .collect(),
        }
    }

    /// True once every paragraph carries an image.
    pub fn fully_illustrated(&self) -> bool {
        self.paragraphs.iter().all(|p| p.image.is_some())
    }
}

/// One story paragraph and its (eventually attached) illustration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    #[serde(default)]
    pub image: Option<ImageSource>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }
}

/// A displayable image reference.
///
/// Either a remote URL or an inline vector document that needs no network
/// fetch to render. The rendering collaborator treats both uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSource {
    Url(String),
    Vector(String),
}

impl ImageSource {
    /// True for inline vector payloads.
    pub fn is_vector(&self) -> bool {
        matches!(self, ImageSource::Vector(_))
    }

    /// Short human-readable description for status displays.
    pub fn describe(&self) -> &str {
        match self {
            ImageSource::Url(url) => url,
            ImageSource::Vector(_) => "inline illustration",
        }
    }
}

/// One sentence of the narration script, tagged with its owning paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub paragraph: usize,
}

/// Build the narration script for a story.
///
/// Paragraph indices are monotonically non-decreasing across the returned
/// sequence.
pub fn narration_script(story: &Story) -> Vec<Sentence> {
    let mut script = Vec::new();
    for (index, paragraph) in story.paragraphs.iter().enumerate() {
        for text in split_sentences(&paragraph.text) {
            script.push(Sentence {
                text,
                paragraph: index,
            });
        }
    }
    script
}

/// Split text into sentences on terminal punctuation.
///
/// Each sentence keeps its own terminator. A trailing fragment without one
/// gets a full stop appended so every utterance ends with terminal
/// punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if SENTENCE_TERMINATORS.contains(&ch) {
            if !current.trim().is_empty() {
                let mut sentence = current.trim().to_string();
                sentence.push(ch);
                sentences.push(sentence);
            }
            current.clear();
        } else {
            current.push(ch);
        }
    }

    if !current.trim().is_empty() {
        let mut sentence = current.trim().to_string();
        sentence.push('。');
        sentences.push(sentence);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_drops_empty_paragraphs() {
        let story = Story::new(
            "测试",
            vec!["第一段。".to_string(), "  ".to_string(), "第二段。".to_string()],
        );
        assert_eq!(story.paragraphs.len(), 2);
        assert!(!story.fully_illustrated());
    }

    #[test]
    fn test_split_sentences_keeps_terminators() {
        let sentences = split_sentences("小兔子出门了。它看到一朵花！真漂亮？");
        assert_eq!(
            sentences,
            vec!["小兔子出门了。", "它看到一朵花！", "真漂亮？"]
        );
    }

    #[test]
    fn test_split_sentences_trailing_fragment() {
        let sentences = split_sentences("它蹦蹦跳跳。然后回家了");
        assert_eq!(sentences, vec!["它蹦蹦跳跳。", "然后回家了。"]);
    }

    #[test]
    fn test_split_sentences_skips_empty() {
        assert!(split_sentences("。。！").is_empty());
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_narration_script_paragraph_tags() {
        let story = Story::new(
            "测试",
            vec![
                "一句。两句。".to_string(),
                "三句！".to_string(),
                "四句。五句。".to_string(),
            ],
        );

        let script = narration_script(&story);
        assert_eq!(script.len(), 5);

        let tags: Vec<usize> = script.iter().map(|s| s.paragraph).collect();
        assert_eq!(tags, vec![0, 0, 1, 2, 2]);

        // Monotonically non-decreasing by construction
        assert!(tags.windows(2).all(|w| w[0] <= w[1]));
    }
}
