//! Markdown rendering of a [`Digest`].
//!
//! Articles are grouped under the first tag of each summary, with themes in
//! sorted order. Article numbers follow the digest's entry order so they stay
//! stable regardless of grouping.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use super::Digest;
use crate::summarizer::SummaryEntry;

/// Theme used for summaries without tags.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Value of the `generated_by` front matter field.
pub const GENERATOR: &str = "vaultdigest";

/// Markdown formatter for a digest.
pub struct MarkdownDigest<'a> {
    /// Digest to render
    pub digest: &'a Digest,
}

impl<'a> MarkdownDigest<'a> {
    /// Create a new Markdown formatter.
    #[must_use]
    pub fn new(digest: &'a Digest) -> Self {
        Self { digest }
    }

    /// Render the digest to a string.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        self.to_string()
    }

    /// Write the rendered digest to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.to_markdown().as_bytes())
    }
}

impl fmt::Display for MarkdownDigest<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digest = self.digest;

        writeln!(out, "---")?;
        writeln!(out, "type: digest")?;
        writeln!(out, "date: {}", digest.date.format("%Y-%m-%d"))?;
        writeln!(out, "articles_count: {}", digest.len())?;
        writeln!(out, "generated_by: {GENERATOR}")?;
        writeln!(out, "---")?;
        writeln!(out)?;
        writeln!(out, "# Daily Digest — {}", digest.date.format("%B %d, %Y"))?;

        for (theme, articles) in group_by_theme(&digest.entries) {
            writeln!(out, "\n## {}", title_case(theme))?;
            for (number, entry) in articles {
                render_article(out, number, entry)?;
            }
        }

        if digest.len() > 1 {
            writeln!(out, "\n---\n\n## Top Insights\n")?;
            writeln!(out, "_Cross-cutting themes across saved articles_")?;
            if let Some(rollup) = digest.rollup.as_deref().map(str::trim) {
                if !rollup.is_empty() {
                    writeln!(out, "\n{rollup}")?;
                }
            }
        }

        Ok(())
    }
}

/// Render a digest to Markdown.
#[must_use]
pub fn format_digest(digest: &Digest) -> String {
    MarkdownDigest::new(digest).to_markdown()
}

fn group_by_theme(entries: &[SummaryEntry]) -> BTreeMap<&str, Vec<(usize, &SummaryEntry)>> {
    let mut themes: BTreeMap<&str, Vec<(usize, &SummaryEntry)>> = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        let theme = entry
            .result
            .tags
            .first()
            .map(|t| t.trim().trim_start_matches('#'))
            .filter(|t| !t.is_empty())
            .unwrap_or(UNCATEGORIZED);
        themes.entry(theme).or_default().push((i + 1, entry));
    }
    themes
}

fn render_article(
    out: &mut fmt::Formatter<'_>,
    number: usize,
    entry: &SummaryEntry,
) -> fmt::Result {
    let summary = &entry.result;

    writeln!(out, "\n### Article {number}")?;

    if let Some(stem) = entry.path.file_stem() {
        writeln!(out, "\n**Source:** [[{}]]", stem.to_string_lossy())?;
    }

    if let Some(quote) = summary.notable_quote.as_deref().filter(|q| !q.trim().is_empty()) {
        writeln!(out)?;
        for line in quote.trim().lines() {
            writeln!(out, "> {line}")?;
        }
    }

    writeln!(out, "\n**Summary:** {}", summary.summary)?;

    if !summary.bullets.is_empty() {
        writeln!(out, "\n**Key takeaways:**")?;
        for bullet in &summary.bullets {
            writeln!(out, "- {bullet}")?;
        }
    }

    if !summary.why_it_matters.is_empty() {
        writeln!(out, "\n**Why it matters:** {}", summary.why_it_matters)?;
    }

    let tags: Vec<String> = summary
        .tags
        .iter()
        .map(|t| hashtag(t))
        .filter(|t| t.len() > 1)
        .collect();
    if !tags.is_empty() {
        writeln!(out, "\n**Tags:** {}", tags.join(" "))?;
    }
    Ok(())
}

/// `machine learning` ⇒ `#machine-learning`
fn hashtag(tag: &str) -> String {
    let body: Vec<&str> = tag.trim().trim_start_matches('#').split_whitespace().collect();
    format!("#{}", body.join("-"))
}

/// Upper-case the first letter of each alphabetic run and lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
