//! HTML helper functions

use crate::config::CommentsConfig;

/// Script URL of the utterances comment widget
pub const UTTERANCES_CLIENT: &str = "https://utteranc.es/client.js";

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Shorten a title for the post navigation
///
/// Titles shorter than `size` characters are kept, anything else is cut to
/// `size` characters followed by `...`.
pub fn reduce_title(s: &str, size: usize) -> String {
    if s.chars().count() < size {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(size).collect();
        format!("{}...", truncated)
    }
}

/// The utterances `<script>` tag, or nothing when comments are disabled
pub fn comments_script(comments: &CommentsConfig) -> Option<String> {
    if !comments.enabled() {
        return None;
    }
    Some(format!(
        r#"<script src="{}" repo="{}" issue-term="{}" theme="{}" crossorigin="anonymous" async></script>"#,
        UTTERANCES_CLIENT,
        html_escape(comments.repo.trim()),
        html_escape(&comments.issue_term),
        html_escape(&comments.theme)
    ))
}

/// Slug used as an anchor id for a section heading
pub fn anchor_id(heading: &str) -> String {
    slug::slugify(heading)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_reduce_title() {
        assert_eq!(reduce_title("Hooks", 20), "Hooks");
        assert_eq!(
            reduce_title("Criando um app CRA do zero", 20),
            "Criando um app CRA d..."
        );
        // exactly `size` characters is still cut
        assert_eq!(reduce_title("abcd", 4), "abcd...");
        assert_eq!(reduce_title("", 20), "");
    }

    #[test]
    fn test_comments_script() {
        let mut comments = CommentsConfig::default();
        assert!(comments_script(&comments).is_none());

        comments.repo = "someone/blog".to_string();
        let script = comments_script(&comments).unwrap();
        assert!(script.contains(r#"src="https://utteranc.es/client.js""#));
        assert!(script.contains(r#"repo="someone/blog""#));
        assert!(script.contains(r#"issue-term="pathname""#));
        assert!(script.contains(r#"theme="github-dark""#));
        assert!(script.contains("async"));
    }

    #[test]
    fn test_anchor_id() {
        assert_eq!(anchor_id("Proin et varius"), "proin-et-varius");
        assert_eq!(anchor_id("Ação rápida"), "acao-rapida");
    }
}
