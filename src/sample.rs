//! Bounded, reproducible sampling of column values.
//!
//! Samples are evidence forwarded to the rule-inference call. They are
//! de-duplicated, capped at `k` values drawn with a fixed seed so identical
//! input always yields the identical sample, and truncated so a single wide
//! cell cannot blow up the request payload.

use itertools::Itertools;
use rand::{SeedableRng, rngs::StdRng, seq::index};

pub const DEFAULT_SAMPLE_SIZE: usize = 40;

const SAMPLE_SEED: u64 = 42;
const MAX_VALUE_CHARS: usize = 120;
const TRUNCATED_CHARS: usize = 117;

/// Returns at most `k` distinct, trimmed, non-empty values.
///
/// De-duplication is case-sensitive and keeps first-seen order; when the
/// distinct set exceeds `k`, a uniform seeded sample of exactly `k` values is
/// drawn instead.
pub fn sample_values<'a, I>(values: I, k: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let unique = values
        .into_iter()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unique()
        .collect::<Vec<_>>();
    let selected = if unique.len() > k {
        let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
        index::sample(&mut rng, unique.len(), k)
            .into_iter()
            .map(|position| unique[position])
            .collect()
    } else {
        unique
    };
    selected.into_iter().map(truncate_value).collect()
}

fn truncate_value(value: &str) -> String {
    if value.chars().count() <= MAX_VALUE_CHARS {
        value.to_string()
    } else {
        let mut truncated = value.chars().take(TRUNCATED_CHARS).collect::<String>();
        truncated.push('…');
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_blank_and_duplicate_values() {
        let values = ["  a  ", "", "b", "a", "   ", "b", "c"];
        let sample = sample_values(values.iter().copied(), DEFAULT_SAMPLE_SIZE);
        assert_eq!(sample, vec!["a", "b", "c"]);
    }

    #[test]
    fn returns_empty_for_all_blank_input() {
        let values = ["", "   ", "\t"];
        assert!(sample_values(values.iter().copied(), DEFAULT_SAMPLE_SIZE).is_empty());
    }

    #[test]
    fn caps_output_at_k_values() {
        let owned = (0..100).map(|i| format!("value_{i}")).collect::<Vec<_>>();
        let sample = sample_values(owned.iter().map(String::as_str), 10);
        assert_eq!(sample.len(), 10);
        for value in &sample {
            assert!(owned.contains(value));
        }
    }

    #[test]
    fn repeated_calls_draw_the_same_sample() {
        let owned = (0..100).map(|i| format!("value_{i}")).collect::<Vec<_>>();
        let first = sample_values(owned.iter().map(String::as_str), 10);
        let second = sample_values(owned.iter().map(String::as_str), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn long_values_are_truncated_with_an_ellipsis() {
        let long = "x".repeat(200);
        let sample = sample_values([long.as_str()], DEFAULT_SAMPLE_SIZE);
        assert_eq!(sample[0].chars().count(), TRUNCATED_CHARS + 1);
        assert!(sample[0].ends_with('…'));
    }

    #[test]
    fn values_at_the_limit_are_kept_whole() {
        let exact = "y".repeat(MAX_VALUE_CHARS);
        let sample = sample_values([exact.as_str()], DEFAULT_SAMPLE_SIZE);
        assert_eq!(sample[0], exact);
    }
}
