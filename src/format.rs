//! Outbound text shaping for the two Telegram dialects.
//!
//! MarkdownV2 treats a large reserved set as syntax, so every dynamic
//! fragment is backslash-escaped before interpolation. HTML only needs its
//! own three reserved characters neutralized, including inside `<pre>`
//! blocks. All outbound report text passes through a length guard that
//! knows its dialect: a cut must never leave a half-open entity or element
//! behind, or the transport rejects the whole message.

/// Telegram's maximum single-message length.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Characters MarkdownV2 treats as syntax.
const MARKDOWN_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Escape every MarkdownV2 reserved character with a single backslash.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for ch in text.chars() {
        if MARKDOWN_RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Neutralize the HTML dialect's reserved characters in dynamic content.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Truncate a Markdown-dialect message to the transport limit.
///
/// The rendered reports are line-oriented and no `*...*` or `` `...` ``
/// entity spans a newline, so cutting at the last complete line keeps every
/// entity balanced. Text without a newline falls back to a plain character
/// cut that never leaves a dangling escape backslash.
pub fn truncate_markdown(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_LEN).collect();

    if let Some(newline) = cut.rfind('\n') {
        cut.truncate(newline);
        return cut;
    }

    // an odd run of trailing backslashes would escape whatever came next
    let trailing = cut.chars().rev().take_while(|&c| c == '\\').count();
    if trailing % 2 == 1 {
        cut.pop();
    }
    cut
}

/// Truncate an HTML-dialect message to the transport limit.
///
/// The cut never lands inside a tag, and never strands an element: when it
/// falls inside `<pre>...</pre>` (or any open element), the message is cut
/// back to just before the unmatched open tag.
pub fn truncate_html(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_LEN).collect();

    // back off before a half-open tag at the cut point
    if let Some(open) = cut.rfind('<') {
        if !cut[open..].contains('>') {
            cut.truncate(open);
        }
    }

    if let Some(open) = first_unclosed_tag(&cut) {
        cut.truncate(open);
    }
    cut
}

/// Byte offset of the earliest open tag left without a matching close tag.
/// Tag content is escaped before interpolation, so every `<` here starts a
/// real tag.
fn first_unclosed_tag(text: &str) -> Option<usize> {
    let mut open: Vec<(usize, &str)> = Vec::new();
    let mut pos = 0;
    while let Some(lt) = text[pos..].find('<') {
        let start = pos + lt;
        let Some(gt) = text[start..].find('>') else {
            break;
        };
        let end = start + gt;
        match text[start + 1..end].strip_prefix('/') {
            Some(name) => {
                if open.last().is_some_and(|(_, n)| *n == name) {
                    open.pop();
                }
            }
            None => open.push((start, &text[start + 1..end])),
        }
        pos = end + 1;
    }
    open.first().map(|(start, _)| *start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown_reserved_set() {
        assert_eq!(escape_markdown("a.b_c"), "a\\.b\\_c");
        let escaped = escape_markdown("_*[]()~`>#+-=|{}.!\\");
        let chars: Vec<char> = escaped.chars().collect();
        assert_eq!(chars.len(), 19 * 2);
        for pair in chars.chunks(2) {
            assert_eq!(pair[0], '\\');
        }
    }

    #[test]
    fn test_escape_markdown_leaves_plain_text_alone() {
        assert_eq!(escape_markdown("instance 10/0/1 up"), "instance 10/0/1 up");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("1 < 2 && 3 > 2 <pre>"),
            "1 &lt; 2 &amp;&amp; 3 &gt; 2 &lt;pre&gt;"
        );
    }

    #[test]
    fn test_truncate_short_message_untouched() {
        let text = "hello".to_string();
        assert_eq!(truncate_markdown(&text), text);
        assert_eq!(truncate_html(&text), text);
    }

    #[test]
    fn test_truncate_exact_limit_on_clean_cut() {
        let text = "a".repeat(MAX_MESSAGE_LEN + 500);
        let cut = truncate_markdown(&text);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn test_truncate_never_breaks_a_tag() {
        let mut text = "x".repeat(MAX_MESSAGE_LEN - 6);
        text.push_str("<pre>some content</pre>");
        let cut = truncate_html(&text);
        assert!(cut.chars().count() <= MAX_MESSAGE_LEN);
        assert_eq!(cut, "x".repeat(MAX_MESSAGE_LEN - 6));
    }

    #[test]
    fn test_truncate_never_strands_an_open_element() {
        let mut text = String::from("\u{1F310}  <b>Top IP addresses:</b>\n<pre>");
        for i in 0..1000 {
            text.push_str(&format!("{:>7} 10.0.0.{}\n", i, i % 250));
        }
        text.push_str("</pre>");
        let cut = truncate_html(&text);
        assert!(cut.chars().count() <= MAX_MESSAGE_LEN);
        assert_eq!(cut.matches("<pre>").count(), cut.matches("</pre>").count());
        assert_eq!(cut.matches("<b>").count(), cut.matches("</b>").count());
        // the bold header survives, the unfinished pre block does not
        assert!(cut.contains("<b>Top IP addresses:</b>"));
    }

    #[test]
    fn test_truncate_keeps_markdown_entities_balanced() {
        let mut text = String::from("\u{1F4CA}  *Application metrics:*\n\n*CPU usage \\(%\\)*:");
        for i in 0..400 {
            text.push_str(&format!("\n  `web\\-{i}:9100` \u{2192} `{i}\\.5`"));
        }
        let cut = truncate_markdown(&text);
        assert!(cut.chars().count() <= MAX_MESSAGE_LEN);
        assert!(cut.chars().count() < text.chars().count());
        assert_eq!(cut.matches('`').count() % 2, 0);
        assert_eq!(cut.matches('*').count() % 2, 0);
        // the cut lands exactly at a line boundary
        assert!(text.starts_with(&cut));
        assert_eq!(text.as_bytes()[cut.len()], b'\n');
    }

    #[test]
    fn test_truncate_drops_dangling_escape() {
        let mut text = "a".repeat(MAX_MESSAGE_LEN - 1);
        text.push('\\');
        text.push_str("extra tail");
        let cut = truncate_markdown(&text);
        assert!(!cut.ends_with('\\'));
        assert_eq!(cut.chars().count(), MAX_MESSAGE_LEN - 1);
    }

    #[test]
    fn test_first_unclosed_tag_handles_nesting() {
        assert_eq!(first_unclosed_tag("<b>x</b> <pre>y</pre>"), None);
        assert_eq!(first_unclosed_tag("<b>x</b> <pre>y"), Some(9));
        assert_eq!(first_unclosed_tag("<pre>y"), Some(0));
    }
}
