//! Plain text rendering of comment HTML.
//!
//! Field extraction works on lines, so the rendering keeps every text node
//! on its own line: each node is trimmed, empty ones are dropped, and the
//! rest are joined with `\n`.

use scraper::Html;

const HIDDEN_ELEMENTS: [&str; 2] = ["script", "style"];

/// Renders an HTML fragment as newline-separated text.
///
/// # Example
///
/// ```rust
/// use ticket_report_core::html_to_plain_text;
///
/// let html = "<div>Root Cause:</div><div>  Disk <b>full</b> </div>";
/// assert_eq!(html_to_plain_text(html), "Root Cause:\nDisk\nfull");
/// ```
pub fn html_to_plain_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);

    fragment
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element())
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()));
            (!hidden).then(|| text.trim())
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_text_node_on_its_own_line() {
        let html = "<p>Root Cause:<br>Expired token</p><p>Status:</p><p>Closed</p>";
        assert_eq!(html_to_plain_text(html), "Root Cause:\nExpired token\nStatus:\nClosed");
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(html_to_plain_text(""), "");
        assert_eq!(html_to_plain_text("   \n "), "");
        assert_eq!(html_to_plain_text("<div> </div><br>"), "");
    }

    #[test]
    fn test_entities_decoded_and_scripts_skipped() {
        let html = "<div>R&amp;D</div><script>var x = 1;</script><style>p {}</style>";
        assert_eq!(html_to_plain_text(html), "R&D");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_plain_text("  just text  "), "just text");
    }
}
