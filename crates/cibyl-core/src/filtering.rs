//! Helpers shared by every source to narrow down what a CI system returned.

use regex::Regex;
use tracing::warn;

pub type Filter<'a, T> = Box<dyn Fn(&T) -> bool + 'a>;

/// Retain the items that pass every filter, keeping their original order.
pub fn apply_filters<T>(items: impl IntoIterator<Item = T>, filters: &[Filter<'_, T>]) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| filters.iter().all(|check| check(item)))
        .collect()
}

/// Regex search of `pattern` anywhere in `text`.
///
/// An invalid pattern degrades to a literal substring check.
pub fn matches_regex(pattern: &str, text: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            warn!("invalid pattern '{pattern}' ({e}); matching it literally");
            text.contains(pattern)
        }
    }
}

/// True when any of `patterns` matches `text`.
pub fn matches_any_regex(patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|p| matches_regex(p, text))
}

/// Compiled form of a pattern list, for filters evaluated many times.
#[derive(Debug)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

#[derive(Debug)]
enum Pattern {
    Regex(Regex),
    Literal(String),
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| match Regex::new(p) {
                Ok(re) => Pattern::Regex(re),
                Err(e) => {
                    warn!("invalid pattern '{p}' ({e}); matching it literally");
                    Pattern::Literal(p.clone())
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| match p {
            Pattern::Regex(re) => re.is_match(text),
            Pattern::Literal(s) => text.contains(s.as_str()),
        })
    }
}

pub fn satisfy_exact_match(values: &[String], text: &str) -> bool {
    values.iter().any(|v| v == text)
}

pub fn satisfy_case_insensitive_match(values: &[String], text: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(text))
}

/// True when the space-joined `args` occur inside any of `values`.
///
/// `--release 17` matches a job whose releases are `{"17.1"}`.
pub fn args_are_in_list<'a>(args: &[String], values: impl IntoIterator<Item = &'a str>) -> bool {
    let needle = args.join(" ");
    values.into_iter().any(|v| v.contains(needle.as_str()))
}

/// True when `amount` satisfies every range in `ranges`.
///
/// A range is an operator (`<`, `<=`, `>`, `>=`, `==`, `=`, `!=`) followed by a
/// number, or a bare number meaning equality. A range that does not parse
/// matches nothing.
pub fn satisfy_range_constraint(ranges: &[String], amount: u64) -> bool {
    ranges.iter().all(|range| {
        let range = range.trim();
        let split = range
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(range.len());
        let (operator, number) = range.split_at(split);
        let Ok(number) = number.trim().parse::<u64>() else {
            warn!("invalid range '{range}'");
            return false;
        };
        match operator.trim() {
            "" | "=" | "==" => amount == number,
            "!=" => amount != number,
            "<" => amount < number,
            "<=" => amount <= number,
            ">" => amount > number,
            ">=" => amount >= number,
            other => {
                warn!("unknown range operator '{other}' in '{range}'");
                false
            }
        }
    })
}
