//! Edit-distance based string similarity.
//!
//! Distances are counted in Unicode scalar values, not bytes, so accented
//! titles compare the same way their plain counterparts do.

use std::mem;

/// Levenshtein distance between `a` and `b`.
///
/// Only two rows sized to the shorter string are kept alive.
pub fn distance(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    // Rows are indexed by the shorter string
    let (long, short, short_len) = if a_len >= b_len {
        (a, b, b_len)
    } else {
        (b, a, a_len)
    };

    if short_len == 0 {
        return long.chars().count();
    }

    let mut previous: Vec<usize> = (0..=short_len).collect();
    let mut current: Vec<usize> = vec![0; short_len + 1];

    for (i, lc) in long.chars().enumerate() {
        current[0] = i + 1;
        for (j, sc) in short.chars().enumerate() {
            let cost = usize::from(lc != sc);
            current[j + 1] = (current[j] + 1)
                .min(previous[j + 1] + 1)
                .min(previous[j] + cost);
        }
        mem::swap(&mut previous, &mut current);
    }

    previous[short_len]
}

/// Normalized similarity in `[0, 1]`: `1 - distance / max(len)`.
///
/// Two empty strings are identical (1.0); one empty string against a
/// non-empty one shares nothing (0.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    match (a_len, b_len) {
        (0, 0) => 1.0,
        (0, _) | (_, 0) => 0.0,
        _ => {
            let max_len = a_len.max(b_len);
            let d = distance(a, b).min(max_len);
            // (max - d) / max keeps exact thresholds like 17/20 == 0.85 exact
            (max_len - d) as f64 / max_len as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_distance_basics() {
        assert_eq!(distance("", ""), 0);
        assert_eq!(distance("abc", ""), 3);
        assert_eq!(distance("", "abc"), 3);
        assert_eq!(distance("kitten", "sitting"), 3);
        assert_eq!(distance("flaw", "lawn"), 2);
        assert_eq!(distance("same", "same"), 0);
    }

    #[test]
    fn test_distance_counts_chars_not_bytes() {
        assert_eq!(distance("café", "cafe"), 1);
        assert_eq!(distance("ñ", "n"), 1);
    }

    #[test]
    fn test_similarity_edges() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "x"), 0.0);
        assert_eq!(similarity("x", ""), 0.0);
        assert_eq!(similarity("deep learning", "deep learning"), 1.0);
    }

    #[test]
    fn test_similarity_exact_fractions() {
        // 20 chars, 3 substitutions
        assert_eq!(similarity("graph neural network", "graph neural netwzzz"), 0.85);
        // 20 chars, 2 substitutions
        assert_eq!(similarity("graph neural network", "graph neural netwozz"), 0.9);
    }

    proptest! {
        #[test]
        fn prop_similarity_in_unit_range(a in ".{0,24}", b in ".{0,24}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_similarity_symmetric(a in ".{0,24}", b in ".{0,24}") {
            prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }

        #[test]
        fn prop_self_similarity_is_one(a in ".{1,24}") {
            prop_assert_eq!(similarity(&a, &a), 1.0);
        }

        #[test]
        fn prop_distance_matches_reference(a in "[a-z ]{0,16}", b in "[a-z ]{0,16}") {
            prop_assert_eq!(distance(&a, &b), strsim::levenshtein(&a, &b));
        }
    }
}
