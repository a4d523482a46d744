//! Channel message formatting
//!
//! Turns a catalog topic into Telegram-ready HTML and bounds it to the
//! channel's message-size limit. Title and summary are author-controlled but
//! still escaped, since Telegram rejects messages with unbalanced HTML tags.

use crate::catalog::Topic;

/// Telegram's hard limit for a single `sendMessage` text
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Appended when a message had to be cut short
pub const CONTINUATION_MARKER: &str = "…\n\n<i>Continued on the site.</i>";

/// Render a topic as channel-ready HTML, clipped to the message limit
pub fn render(topic: &Topic) -> String {
    clip(&render_unbounded(topic), MAX_MESSAGE_LEN)
}

/// Render a topic without applying the length bound
pub fn render_unbounded(topic: &Topic) -> String {
    let title = html_escape::encode_text(&topic.title);
    let summary = html_escape::encode_text(&topic.summary);

    let mut text = format!("📚 <b>{title}</b>\n\n{summary}");

    if let Some(url) = &topic.url {
        text.push_str(&format!("\n\n🔗 {}", html_escape::encode_text(url)));
    }

    let hashtag = hashtag(&topic.category_id);
    if !hashtag.is_empty() {
        text.push_str(&format!("\n\n#{hashtag}"));
    }

    text
}

/// Bound `text` to `limit` characters, marking the cut visibly
///
/// The marker counts against the limit, so the result never exceeds it.
/// Cuts happen on a char boundary.
pub fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let marker_len = CONTINUATION_MARKER.chars().count();
    let keep = limit.saturating_sub(marker_len);

    let mut clipped: String = text.chars().take(keep).collect();
    clipped.push_str(CONTINUATION_MARKER);
    clipped
}

/// Derive a hashtag from a category id (`async-await` -> `async_await`)
fn hashtag(category_id: &str) -> String {
    category_id
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
