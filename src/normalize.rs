use std::sync::LazyLock;

use regex::Regex;

use crate::logging::{emit_cleanup_trace, CleanupStep, CleanupTrace, CLEANUP_TARGET};

static PARENTHETICAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthetical regex"));
static HASHTAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("valid hashtag regex"));
static WHITESPACE_RUN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace collapse regex"));

const QUOTE_CHARS: &[char] = &['"', '\'', '\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}'];
const MAX_LINES: usize = 2;

/// Deterministic cleanup of raw model output into a caption.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionNormalizer;

impl CaptionNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: &str) -> String {
        let tracing_steps = tracing::enabled!(target: CLEANUP_TARGET, tracing::Level::DEBUG);
        let mut steps = Vec::new();
        let mut current = raw.to_string();

        let stages: [(&str, fn(&str) -> (String, usize)); 5] = [
            ("strip_parentheticals", strip_parentheticals),
            ("strip_quotes", strip_quotes),
            ("strip_hashtags", strip_hashtags),
            ("collapse_whitespace", collapse_whitespace),
            ("limit_lines", limit_lines),
        ];

        for (name, stage) in stages {
            let (next, hits) = stage(&current);
            if tracing_steps {
                steps.push(CleanupStep::new(name, &current, &next, hits));
            }
            current = next;
        }

        if tracing_steps {
            emit_cleanup_trace(&CleanupTrace {
                raw: raw.to_string(),
                clean: current.clone(),
                steps,
            });
        }

        current
    }
}

fn strip_parentheticals(input: &str) -> (String, usize) {
    let count = PARENTHETICAL_REGEX.find_iter(input).count();
    (PARENTHETICAL_REGEX.replace_all(input, "").into_owned(), count)
}

fn strip_quotes(input: &str) -> (String, usize) {
    let count = input.chars().filter(|c| QUOTE_CHARS.contains(c)).count();
    (input.replace(QUOTE_CHARS, ""), count)
}

fn strip_hashtags(input: &str) -> (String, usize) {
    let count = HASHTAG_REGEX.find_iter(input).count();
    (HASHTAG_REGEX.replace_all(input, "").into_owned(), count)
}

fn collapse_whitespace(input: &str) -> (String, usize) {
    let count = WHITESPACE_RUN_REGEX.find_iter(input).count();
    let collapsed = WHITESPACE_RUN_REGEX.replace_all(input, " ");
    (collapsed.trim().to_string(), count)
}

fn limit_lines(input: &str) -> (String, usize) {
    let lines: Vec<&str> = input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    let dropped = lines.len().saturating_sub(MAX_LINES);
    let kept = lines.into_iter().take(MAX_LINES).collect::<Vec<_>>().join("\n");
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> String {
        CaptionNormalizer::new().normalize(raw)
    }

    #[test]
    fn cleans_model_output_example() {
        let raw = "Totally obsessed with this (no cap) \"vibe\" today!!   so good\nfor real\nextra line";
        assert_eq!(
            normalize(raw),
            "Totally obsessed with this vibe today!! so good\nfor real"
        );
    }

    #[test]
    fn parentheticals_are_non_greedy() {
        assert_eq!(normalize("keep (drop) this (and this) too"), "keep this too");
    }

    #[test]
    fn strips_straight_and_curly_quotes() {
        assert_eq!(
            normalize("\u{201c}Sunny\u{201d} and it\u{2019}s \u{2018}fine\u{2019} isn't it"),
            "Sunny and its fine isnt it"
        );
    }

    #[test]
    fn removes_hashtags() {
        assert_eq!(
            normalize("Brunch then naps #weekend #atx\nsee you there"),
            "Brunch then naps see you there"
        );
        assert_eq!(normalize("#vibes\nsecond"), "second");
    }

    #[test]
    fn blank_lines_do_not_count_toward_limit() {
        assert_eq!(normalize("one\n\n\ntwo\nthree"), "one two\nthree");
        assert_eq!(normalize("one\ntwo\n\nthree"), "one\ntwo three");
    }

    #[test]
    fn empty_output_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  (only an aside)  \"\" "), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Totally obsessed with this (no cap) \"vibe\" today!!   so good\nfor real\nextra line",
            "((nested)) aside ) and ( open",
            "  lead\n \n trail  \n\n third ",
            "#tag\t\ttabs and #more\n\u{201c}quoted\u{201d}\nline three\nline four",
            "no changes needed",
            "single\nnewline",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
            assert!(once.lines().count() <= MAX_LINES);
            assert!(!once.contains(QUOTE_CHARS));
        }
    }
}
