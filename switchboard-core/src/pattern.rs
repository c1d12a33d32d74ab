//! Glob-style topic and key matching.
//!
//! Topics are dot-separated paths. `*` matches exactly one segment,
//! `**` matches any number of segments including none. Everything else
//! is literal. Patterns compile to anchored regexes once, at
//! subscription time.

use regex::Regex;

/// Compile a glob pattern into an anchored regex.
///
/// `**` is substituted before `*` so `browser.**` becomes `^browser\..*$`
/// and `browser.*` becomes `^browser\.[^.]+$`.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let mut regex_str = String::with_capacity(pattern.len() + 8);
    regex_str.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                regex_str.push_str(".*");
            } else {
                regex_str.push_str("[^.]+");
            }
        } else {
            regex_str.push_str(&regex::escape(&c.to_string()));
        }
    }

    regex_str.push('$');
    Regex::new(&regex_str)
}

/// One-shot convenience: does `topic` match `pattern`?
pub fn topic_matches(pattern: &str, topic: &str) -> Result<bool, regex::Error> {
    Ok(compile_pattern(pattern)?.is_match(topic))
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A literal topic always matches itself.
        #[test]
        fn literal_topic_matches_itself(segments in prop::collection::vec("[a-z]{1,8}", 1..5)) {
            let topic = segments.join(".");
            prop_assert!(topic_matches(&topic, &topic).unwrap());
        }

        /// Every topic matches the universal pattern.
        #[test]
        fn double_star_matches_any_topic(segments in prop::collection::vec("[a-z]{1,8}", 1..5)) {
            let topic = segments.join(".");
            prop_assert!(topic_matches("**", &topic).unwrap());
        }

        /// `prefix.*` matches exactly the two-segment topics under prefix.
        #[test]
        fn single_star_is_one_segment(
            prefix in "[a-z]{1,8}",
            rest in prop::collection::vec("[a-z]{1,8}", 1..4),
        ) {
            let topic = format!("{prefix}.{}", rest.join("."));
            let pattern = format!("{prefix}.*");
            let matched = topic_matches(&pattern, &topic).unwrap();
            prop_assert_eq!(matched, rest.len() == 1);
        }
    }
}
