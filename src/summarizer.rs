//! Per-note summarization and the cross-note rollup.
//!
//! Notes are cleaned (front matter removed, length capped) before being sent
//! to the [`Transformer`]. The response must be a JSON object; a reply that
//! does not parse is retried once with a stricter instruction before the note
//! is given up on.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cache::CacheEntry;
use crate::pipeline::ItemError;
use crate::transform::{TransformError, Transformer};

/// Marker appended to content cut at the character limit.
pub const TRUNCATION_MARKER: &str = "\n[... truncated]";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a knowledge summarizer. Extract key insights from the given text. \
Return a JSON object with these exact fields:\n\
- summary: 1-2 sentences summarizing the main point\n\
- bullets: array of 5 key takeaways (strings)\n\
- why_it_matters: 1 sentence on relevance\n\
- tags: array of 1-3 topic tags\n\
- notable_quote: the most insightful quote from the text, or null";

const STRICT_SUFFIX: &str = "\n\nIMPORTANT: Return ONLY valid JSON, no extra text before or after.";

const ROLLUP_SYSTEM_PROMPT: &str = "You are a curator creating a daily reading digest. \
Your job is to:\n\
1. Group the article summaries by theme or topic\n\
2. For each group, write a brief 1-2 sentence overview\n\
3. At the end, list 3-5 cross-cutting insights that span multiple articles\n\n\
Return markdown formatted output with clear headings and organization.";

/// Structured summary of one note.
///
/// Fields missing from (or null in) the model's reply take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bullets: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub why_it_matters: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notable_quote: Option<String>,
}

/// A summary together with the note it came from; this is what gets cached.
pub type SummaryEntry = CacheEntry<NoteSummary>;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Remove a leading YAML front matter block.
///
/// Text that does not start with `---`, or has no closing `---`, is returned
/// unchanged.
#[must_use]
pub fn strip_frontmatter(text: &str) -> &str {
    text.strip_prefix("---")
        .and_then(|rest| rest.find("---").map(|end| rest[end + 3..].trim_start()))
        .unwrap_or(text)
}

/// Cap `text` at `max_chars` characters, appending [`TRUNCATION_MARKER`] when cut.
#[must_use]
pub fn truncate_to_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Remove a surrounding Markdown code fence, if any.
fn unfence(reply: &str) -> &str {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").ok());

    fence
        .as_ref()
        .and_then(|re| re.captures(reply))
        .and_then(|caps| caps.get(1))
        .map_or(reply.trim(), |m| m.as_str())
}

fn excerpt(reply: &str) -> String {
    reply.chars().take(200).collect()
}

/// Summarize one note.
///
/// # Errors
///
/// * [`ItemError::MalformedResponse`] if neither reply parses as JSON.
/// * [`ItemError::InvalidResult`] if the JSON is not an object of the expected shape.
/// * [`ItemError::Transform`] if the transformer itself fails.
pub fn summarize_note<T: Transformer + ?Sized>(
    transformer: &T,
    content: &str,
    title: &str,
    max_chars: usize,
) -> Result<NoteSummary, ItemError> {
    let cleaned = truncate_to_chars(strip_frontmatter(content).trim(), max_chars);
    let user = format!("Title: {title}\n\nContent:\n{cleaned}");

    let reply = transformer.complete(SUMMARY_SYSTEM_PROMPT, &user)?;
    let value = match serde_json::from_str::<serde_json::Value>(unfence(&reply)) {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "Failed to parse JSON for {}: {}. Retrying with stricter prompt.",
                title,
                e
            );
            let strict = format!("{SUMMARY_SYSTEM_PROMPT}{STRICT_SUFFIX}");
            let reply = transformer.complete(&strict, &user)?;
            serde_json::from_str(unfence(&reply)).map_err(|source| {
                ItemError::MalformedResponse {
                    title: title.to_string(),
                    excerpt: excerpt(&reply),
                    source,
                }
            })?
        }
    };

    if !value.is_object() {
        return Err(ItemError::InvalidResult {
            title: title.to_string(),
            reason: "expected a JSON object".to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| ItemError::InvalidResult {
        title: title.to_string(),
        reason: e.to_string(),
    })
}

/// Ask the transformer for a themed overview spanning all summaries.
///
/// # Errors
///
/// Returns the transformer's error unchanged.
pub fn create_rollup<T: Transformer + ?Sized>(
    transformer: &T,
    summaries: &[&NoteSummary],
) -> Result<String, TransformError> {
    if summaries.is_empty() {
        return Ok("No notes to summarize today.".to_string());
    }

    let mut listing = String::new();
    for (i, summary) in summaries.iter().enumerate() {
        let key_points: Vec<&str> = summary.bullets.iter().take(3).map(String::as_str).collect();
        listing.push_str(&format!("\n---\n**Article {}**\n", i + 1));
        listing.push_str(&format!("- Summary: {}\n", summary.summary));
        listing.push_str(&format!("- Key points: {}\n", key_points.join(", ")));
        listing.push_str(&format!("- Why it matters: {}\n", summary.why_it_matters));
        listing.push_str(&format!("- Tags: {}\n", summary.tags.join(", ")));
    }

    let user = format!("Please create a reading digest from these summaries:\n{listing}");
    transformer.complete(ROLLUP_SYSTEM_PROMPT, &user)
}
