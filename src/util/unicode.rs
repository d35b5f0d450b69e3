use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Keep the first `max_chars` characters and append `...` when anything was
/// cut. Counts characters, not bytes or cells.
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((cut, _)) => Cow::Owned(format!("{}...", &s[..cut])),
    }
}

/// Truncate to fit within `max_cells` terminal cells, appending `…` if
/// truncated. Never splits a grapheme cluster.
pub fn truncate_to_width(s: &str, max_cells: usize) -> Cow<'_, str> {
    if display_width(s) <= max_cells {
        return Cow::Borrowed(s);
    }
    if max_cells == 0 {
        return Cow::Borrowed("");
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut result = String::new();
    for grapheme in s.graphemes(true) {
        let gw = UnicodeWidthStr::width(grapheme);
        if width + gw > budget {
            break;
        }
        width += gw;
        result.push_str(grapheme);
    }
    result.push('\u{2026}');
    Cow::Owned(result)
}

/// Truncate or right-pad with spaces to exactly `cells` wide.
pub fn fit_to_width(s: &str, cells: usize) -> String {
    let fitted = truncate_to_width(s, cells);
    let pad = cells.saturating_sub(display_width(&fitted));
    format!("{}{}", fitted, " ".repeat(pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_truncation() {
        assert_eq!(truncate_chars("short", 150), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        let exact = "x".repeat(150);
        assert!(matches!(truncate_chars(&exact, 150), Cow::Borrowed(_)));
    }

    #[test]
    fn width_truncation() {
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
        assert_eq!(truncate_to_width("hi", 6), "hi");
        // wide characters take two cells each
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn fit_pads_and_cuts() {
        assert_eq!(fit_to_width("ab", 4), "ab  ");
        assert_eq!(fit_to_width("abcdef", 4), "abc…");
        assert_eq!(display_width(&fit_to_width("日本", 5)), 5);
    }
}
