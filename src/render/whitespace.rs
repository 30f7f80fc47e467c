//! Whitespace collapsing for flowed text.
//!
//! Source line breaks and every tab, carriage return or space touching them
//! disappear into a single space; remaining tabs become spaces; runs of
//! spaces collapse to one.

/// Characters the collapsing rules apply to. Non-breaking spaces are not
/// among them.
fn is_collapsible(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Collapse whitespace in a text run.
pub fn collapse(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if is_collapsible(c) {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Whether `text` has anything besides whitespace.
pub fn has_text(text: &str) -> bool {
    text.chars().any(|c| !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_collapse_line_feeds() {
        assert_eq!(collapse("Hello,\n    world"), "Hello, world");
        assert_eq!(collapse("a \t\r\n \n b"), "a b");
        assert_eq!(collapse("\n  lead"), " lead");
    }

    #[test]
    fn test_collapse_tabs_and_spaces() {
        assert_eq!(collapse("a\tb"), "a b");
        assert_eq!(collapse("a  \t  b"), "a b");
        assert_eq!(collapse("one  two   three"), "one two three");
    }

    #[test]
    fn test_lone_carriage_return_is_a_space() {
        assert_eq!(collapse("a\rb"), "a b");
        assert_eq!(collapse("a \r\r b"), "a b");
    }

    #[test]
    fn test_non_breaking_space_kept() {
        assert_eq!(collapse("a\u{a0}\u{a0}b"), "a\u{a0}\u{a0}b");
    }

    #[test]
    fn test_has_text() {
        assert!(has_text(" x "));
        assert!(!has_text(" \n\t "));
        assert!(!has_text("\u{a0}"));
        assert!(!has_text(""));
    }

    proptest! {
        #[test]
        fn collapse_never_leaves_double_spaces_or_breaks(s in "[a-z \t\r\n]{0,64}") {
            let out = collapse(&s);
            prop_assert!(!out.contains("  "));
            prop_assert!(!out.contains('\n'));
            prop_assert!(!out.contains('\t'));
            prop_assert!(!out.contains('\r'));
        }

        #[test]
        fn collapse_keeps_words(s in "[a-z \t\n]{0,64}") {
            let words: Vec<&str> = s.split_whitespace().collect();
            let out = collapse(&s);
            prop_assert_eq!(out.split_whitespace().collect::<Vec<_>>(), words);
        }
    }
}
