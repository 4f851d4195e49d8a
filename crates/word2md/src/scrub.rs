//! Final text cleanup of the emitted Markdown.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::Step;

/// The scrub transforms, in order
pub const SCRUB_STEPS: &[Step] = &[
    ("replace_nbsp_entities", replace_nbsp_entities),
    ("trim_leading_whitespace", trim_leading_whitespace),
    ("trim_trailing_whitespace", trim_trailing_whitespace),
    ("remove_line_trailing_spaces", remove_line_trailing_spaces),
    ("collapse_quadruple_line_breaks", collapse_quadruple_line_breaks),
    ("remove_nbsp", remove_nbsp),
];

static RE_LEADING_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A\s+").unwrap());
static RE_TRAILING_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\z").unwrap());
static RE_LINE_TRAILING_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m) +$").unwrap());

/// Scrub Markdown text.
///
/// The steps are applied until the text stops changing, so
/// `scrub(&scrub(x)) == scrub(x)`. Every step either shortens the text or
/// leaves it as is, which bounds the number of rounds.
pub fn scrub(markdown: &str) -> String {
    let mut text = markdown.to_string();
    loop {
        let scrubbed = scrub_once(&text);
        if scrubbed == text {
            return scrubbed;
        }
        text = scrubbed;
    }
}

fn scrub_once(markdown: &str) -> String {
    SCRUB_STEPS
        .iter()
        .fold(markdown.to_string(), |text, (_, step)| step(&text))
}

/// `&nbsp;` entities become ordinary spaces
pub fn replace_nbsp_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
}

pub fn trim_leading_whitespace(text: &str) -> String {
    RE_LEADING_WHITESPACE.replace(text, "").into_owned()
}

pub fn trim_trailing_whitespace(text: &str) -> String {
    RE_TRAILING_WHITESPACE.replace(text, "").into_owned()
}

/// Spaces at the end of each line are removed
pub fn remove_line_trailing_spaces(text: &str) -> String {
    RE_LINE_TRAILING_SPACES.replace_all(text, "").into_owned()
}

/// Every run of exactly four line breaks becomes two
pub fn collapse_quadruple_line_breaks(text: &str) -> String {
    text.replace("\n\n\n\n", "\n\n")
}

/// U+00A0 is dropped; the renderer emits it in place of tabs
pub fn remove_nbsp(text: &str) -> String {
    text.replace('\u{00A0}', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_in_order() {
        let names: Vec<&str> = SCRUB_STEPS.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "replace_nbsp_entities",
                "trim_leading_whitespace",
                "trim_trailing_whitespace",
                "remove_line_trailing_spaces",
                "collapse_quadruple_line_breaks",
                "remove_nbsp",
            ]
        );
    }

    #[test]
    fn test_collapse_quadruple_line_breaks() {
        assert_eq!(collapse_quadruple_line_breaks("\n\n\n\n"), "\n\n");
        assert_eq!(collapse_quadruple_line_breaks("\n\n"), "\n\n");
        assert_eq!(
            collapse_quadruple_line_breaks("a\n\n\n\nb\n\n\n\nc"),
            "a\n\nb\n\nc"
        );
    }

    #[test]
    fn test_trims() {
        assert_eq!(trim_leading_whitespace(" \n\ta \n"), "a \n");
        assert_eq!(trim_trailing_whitespace(" a \n\n"), " a");
        assert_eq!(remove_line_trailing_spaces("a  \nb \nc"), "a\nb\nc");
    }

    #[test]
    fn test_nbsp() {
        assert_eq!(scrub("a&nbsp;b"), "a b");
        assert_eq!(scrub("a\u{00A0}b"), "ab");
    }

    #[test]
    fn test_scrub() {
        assert_eq!(
            scrub("\n\n# Title  \n\n\n\nBody&nbsp;\n\n"),
            "# Title\n\nBody"
        );
        assert_eq!(scrub("a\n\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(scrub(""), "");
    }

    #[test]
    fn test_scrub_is_idempotent() {
        let samples = [
            "",
            "plain",
            "  padded  ",
            "a&nbsp;\n\n\n\n\nb",
            "x \u{00A0}\n\n\n\n\n\n\n\ny",
            "&nbsp;&nbsp;\n\n\u{00A0}\n\nz",
            "line  \n  indented\n\n\n\n- item \n",
            "&nb&nbsp;sp;",
        ];
        for sample in samples {
            let once = scrub(sample);
            assert_eq!(scrub(&once), once, "sample {:?}", sample);
        }
    }
}
