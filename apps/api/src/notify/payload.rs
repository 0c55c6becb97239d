//! Webhook payloads in the Discord rich-embed shape.

use chrono::Utc;
use serde::Serialize;

use crate::models::analysis::{AnalysisResult, FeedbackEvent};

pub const DUTIES_LIMIT: usize = 200;
pub const DUTIES_SUFFIX: &str = "...";
pub const RESULT_LIMIT: usize = 800;
pub const RESULT_SUFFIX: &str = "\n...";
/// Discord caps embed field values at 1024 characters.
pub const COMMENT_LIMIT: usize = 1000;
pub const COMMENT_SUFFIX: &str = "...";

const ANONYMOUS: &str = "Anonymous";
const NO_COMMENT: &str = "None";
/// Discord rejects embed fields with empty values.
const EMPTY_VALUE: &str = "-";
const ANALYSIS_COLOR: u32 = 3_447_003;
const FEEDBACK_COLOR: u32 = 16_766_720;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub username: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

impl EmbedField {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        let value = value.into();
        Self {
            name: name.to_string(),
            value: if value.trim().is_empty() {
                EMPTY_VALUE.to_string()
            } else {
                value
            },
            inline,
        }
    }
}

fn embed(title: String, description: Option<String>, color: u32, fields: Vec<EmbedField>) -> Embed {
    Embed {
        title,
        description,
        color,
        fields,
        footer: EmbedFooter {
            text: format!("resume-match v{}", env!("CARGO_PKG_VERSION")),
        },
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Keeps the first `limit` characters and appends `suffix` when anything was cut.
/// Counts chars, not bytes, so multi-byte text is never split.
pub fn truncate_chars(text: &str, limit: usize, suffix: &str) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{suffix}", &text[..cut]),
        None => text.to_string(),
    }
}

/// `1234567` → `"1,234,567"`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn display_name(user_name: Option<&str>) -> String {
    user_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

pub fn analysis_completed(
    user_name: Option<&str>,
    duties: &str,
    result: &AnalysisResult,
) -> WebhookPayload {
    let fields = vec![
        EmbedField::new("User", display_name(user_name), true),
        EmbedField::new(
            "Processing time (ms)",
            format!("{} ms", format_thousands(result.latency_ms)),
            true,
        ),
        EmbedField::new(
            "Posting summary",
            truncate_chars(duties, DUTIES_LIMIT, DUTIES_SUFFIX),
            false,
        ),
        EmbedField::new(
            "Result summary",
            truncate_chars(&result.final_result, RESULT_LIMIT, RESULT_SUFFIX),
            false,
        ),
    ];

    WebhookPayload {
        username: "AI Match Analysis Log".to_string(),
        embeds: vec![embed(
            "🚀 New analysis completed!".to_string(),
            None,
            ANALYSIS_COLOR,
            fields,
        )],
    }
}

pub fn feedback_submitted(user_name: Option<&str>, event: &FeedbackEvent) -> WebhookPayload {
    let comment = if event.comment.trim().is_empty() {
        NO_COMMENT.to_string()
    } else {
        truncate_chars(&event.comment, COMMENT_LIMIT, COMMENT_SUFFIX)
    };
    let fields = vec![
        EmbedField::new("User", display_name(user_name), true),
        EmbedField::new("Comment", comment, false),
    ];

    WebhookPayload {
        username: "⭐ Satisfaction Rating".to_string(),
        embeds: vec![embed(
            format!(
                "User satisfaction: {} {}",
                event.rating.score(),
                event.rating.stars()
            ),
            Some(format!("**Rating:** {}", event.rating.label())),
            FEEDBACK_COLOR,
            fields,
        )],
    }
}
