//! AI story acquisition.
//!
//! The storyteller asks the chat model for a children's story on a theme
//! and turns the assistant text into a [`Story`]. The model is asked for
//! JSON, but the contract tolerates prose: the first balanced JSON object
//! is extracted and parsed when present, otherwise title and paragraphs
//! are derived heuristically from the line structure, padded with fixed
//! filler paragraphs so a displayable story always has at least five.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::story::Story;

const SYSTEM_PROMPT: &str = "你是人工智能助手.";

/// Minimum paragraphs a displayable story carries.
const MIN_PARAGRAPHS: usize = 5;

/// Heuristic text parsing: flush a paragraph once it accumulates this many
/// characters (implementation-defined tuning, not a contract).
const PARAGRAPH_FLUSH_LEN: usize = 100;

/// Heuristic text parsing: fragments at or under this length are dropped.
const MIN_PARAGRAPH_LEN: usize = 20;

/// Filler paragraphs used to pad heuristically parsed stories.
const FILLER_PARAGRAPHS: [&str; 5] = [
    "从前，有一个非常有趣的地方。那里住着很多可爱的小动物。",
    "有一天，小动物们决定一起去冒险。他们带上了所有需要的东西。",
    "路上，他们遇到了很多有趣的事情。每个小动物都表现得很勇敢。",
    "最后，他们成功完成了冒险。所有的小动物都非常开心。",
    "从此以后，他们成为了最好的朋友。这就是一个关于友谊的美好故事。",
];

/// Errors from story acquisition.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("story API error: {0}")]
    Api(#[from] ark::Error),

    #[error("story API returned empty content")]
    EmptyContent,
}

/// A source of stories. Implemented by [`Storyteller`] and by test mocks.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    async fn generate(&self, theme: &str) -> Result<Story, StoryError>;
}

/// Configuration for the storyteller.
#[derive(Debug, Clone)]
pub struct StorytellerConfig {
    /// The model to use (client default when unset).
    pub model: Option<String>,

    /// Maximum tokens for the story response.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,
}

impl Default for StorytellerConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 2000,
            temperature: Some(0.8),
        }
    }
}

/// The AI storyteller.
pub struct Storyteller {
    client: ark::Ark,
    config: StorytellerConfig,
}

impl Storyteller {
    /// Create a storyteller with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: ark::Ark::new(api_key),
            config: StorytellerConfig::default(),
        }
    }

    /// Create a storyteller from the ARK_API_KEY environment variable.
    pub fn from_env() -> Result<Self, StoryError> {
        Ok(Self {
            client: ark::Ark::from_env()?,
            config: StorytellerConfig::default(),
        })
    }

    /// Configure the storyteller.
    pub fn with_config(mut self, config: StorytellerConfig) -> Self {
        self.config = config;
        self
    }

    fn build_prompt(theme: &str) -> String {
        include_str!("prompts/storyteller.txt").replace("{theme}", theme)
    }
}

#[async_trait]
impl StoryGenerator for Storyteller {
    async fn generate(&self, theme: &str) -> Result<Story, StoryError> {
        let mut request = ark::Request::new(vec![
            ark::Message::system(SYSTEM_PROMPT),
            ark::Message::user(Self::build_prompt(theme)),
        ])
        .with_max_tokens(self.config.max_tokens);

        if let Some(ref model) = self.config.model {
            request = request.with_model(model);
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.client.complete(request).await?;
        if response.content.trim().is_empty() {
            return Err(StoryError::EmptyContent);
        }

        Ok(parse_story(&response.content, theme))
    }
}

#[derive(Debug, Deserialize)]
struct StoryPayload {
    title: String,
    paragraphs: Vec<ParagraphPayload>,
}

#[derive(Debug, Deserialize)]
struct ParagraphPayload {
    text: String,
}

/// Turn assistant text into a story.
///
/// The first balanced JSON object wins when it parses into the expected
/// shape; anything else goes through the heuristic text parser.
pub fn parse_story(content: &str, theme: &str) -> Story {
    if let Some(json) = extract_json_object(content) {
        match serde_json::from_str::<StoryPayload>(json) {
            Ok(payload) if !payload.paragraphs.is_empty() && !payload.title.trim().is_empty() => {
                return Story::new(
                    payload.title.trim(),
                    payload.paragraphs.into_iter().map(|p| p.text).collect(),
                );
            }
            Ok(_) => debug!("story JSON was missing title or paragraphs, falling back to text parse"),
            Err(err) => debug!(error = %err, "story JSON did not parse, falling back to text parse"),
        }
    }

    parse_text_to_story(content, theme)
}

/// Extract the first balanced JSON object embedded in free text.
///
/// Brace counting is string-aware so braces inside JSON strings do not
/// unbalance the scan.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Derive a story from unstructured assistant prose.
fn parse_text_to_story(content: &str, theme: &str) -> Story {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut title = format!("{theme}的故事");
    if let Some(line) = lines
        .iter()
        .find(|line| line.contains("标题") || line.contains("题目") || line.contains('#'))
    {
        let cleaned = strip_title_markers(line);
        if !cleaned.is_empty() {
            title = cleaned;
        }
    }

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in &lines {
        if line.contains("标题") || line.contains("题目") {
            continue;
        }

        current.push_str(line);
        current.push(' ');

        if current.chars().count() > PARAGRAPH_FLUSH_LEN
            || line.contains('。')
            || line.contains('！')
        {
            if current.trim().chars().count() > MIN_PARAGRAPH_LEN {
                paragraphs.push(current.trim().to_string());
                current.clear();
            }
        }
    }

    if current.trim().chars().count() > MIN_PARAGRAPH_LEN {
        paragraphs.push(current.trim().to_string());
    }

    while paragraphs.len() < MIN_PARAGRAPHS {
        paragraphs.push(FILLER_PARAGRAPHS[paragraphs.len() % FILLER_PARAGRAPHS.len()].to_string());
    }

    Story::new(title, paragraphs)
}

fn strip_title_markers(line: &str) -> String {
    let mut rest =
        line.trim_start_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());
    for marker in ["标题", "题目"] {
        if let Some(stripped) = rest.strip_prefix(marker) {
            rest = stripped;
            break;
        }
    }
    rest.trim_start_matches(|c: char| c == '：' || c == ':')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_prose() {
        let content = r#"好的，故事来了：{"title": "小兔子", "paragraphs": [{"text": "从前。"}]} 希望你喜欢！"#;
        let json = extract_json_object(content).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
        assert!(serde_json::from_str::<StoryPayload>(json).is_ok());
    }

    #[test]
    fn test_extract_json_handles_braces_in_strings() {
        let content = r#"{"title": "b}race{s", "paragraphs": [{"text": "a"}]} trailing"#;
        let json = extract_json_object(content).unwrap();
        let payload: StoryPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.title, "b}race{s");
    }

    #[test]
    fn test_extract_json_unbalanced() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object(r#"{"title": "broken"#).is_none());
    }

    #[test]
    fn test_parse_story_json_path() {
        let content = r#"{"title": "月亮船", "paragraphs": [
            {"text": "第一段。"}, {"text": "第二段。"}, {"text": "第三段。"}
        ]}"#;
        let story = parse_story(content, "月亮");
        assert_eq!(story.title, "月亮船");
        assert_eq!(story.paragraphs.len(), 3);
    }

    #[test]
    fn test_parse_story_falls_back_on_bad_json() {
        let content = r#"{"oops": true} 从前有一只小猫，它住在一个温暖的小房子里，每天都很开心。"#;
        let story = parse_story(content, "小猫");
        assert_eq!(story.title, "小猫的故事");
        assert!(story.paragraphs.len() >= MIN_PARAGRAPHS);
    }

    #[test]
    fn test_text_parse_finds_title() {
        let content = "标题：勇敢的小刺猬\n小刺猬住在森林里，它有很多好朋友，大家都很喜欢它。\n";
        let story = parse_text_to_story(content, "小刺猬");
        assert_eq!(story.title, "勇敢的小刺猬");
    }

    #[test]
    fn test_text_parse_skips_short_fragments() {
        let content = "短句。\n这是一个足够长的段落，里面讲了一个完整有趣的小故事，结束了。\n";
        let story = parse_text_to_story(content, "主题");
        // The short fragment merges into the following accumulation instead
        // of forming its own paragraph.
        assert!(story
            .paragraphs
            .iter()
            .all(|p| p.text.chars().count() > MIN_PARAGRAPH_LEN));
    }

    #[test]
    fn test_text_parse_pads_to_minimum() {
        let story = parse_text_to_story("太短。", "主题");
        assert_eq!(story.paragraphs.len(), MIN_PARAGRAPHS);
        assert_eq!(story.paragraphs[0].text, FILLER_PARAGRAPHS[0]);
    }

    #[test]
    fn test_default_title_uses_theme() {
        let story = parse_text_to_story("就一行不长的内容。", "恐龙");
        assert_eq!(story.title, "恐龙的故事");
    }

    #[test]
    fn test_config_defaults() {
        let config = StorytellerConfig::default();
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.temperature, Some(0.8));
        assert!(config.model.is_none());
    }
}
