//! String similarity scores used by the fuzzy merger.
//!
//! Both scores are on a 0–100 scale and are symmetric. They are based on the
//! indel distance (insertions and deletions only), which for two strings of
//! lengths `n` and `m` with a longest common subsequence of length `l` gives
//! a normalized similarity of `2l / (n + m)`.

use std::collections::BTreeSet;

/// Length of the longest common subsequence of two char sequences.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Normalized indel similarity of two strings, in `[0, 100]`.
///
/// Two empty strings are identical and score 100.
///
/// # Examples
///
/// ```
/// use personae::similarity::ratio;
///
/// assert_eq!(ratio("odille", "odille"), 100.0);
/// assert!(ratio("odille", "odile") > 90.0);
/// assert!(ratio("jean", "claude") < 50.0);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    let lcs = lcs_len(&a, &b);
    200.0 * lcs as f64 / total as f64
}

/// Order-insensitive token overlap similarity, in `[0, 100]`.
///
/// Both strings are split into whitespace-separated token sets. The sorted
/// intersection is compared against the intersection extended by each side's
/// remaining tokens, and the best of the three pairwise ratios is returned.
/// When one token set contains the other the score is 100.
///
/// Returns 0 when either string has no tokens.
///
/// # Examples
///
/// ```
/// use personae::similarity::token_set_ratio;
///
/// assert_eq!(token_set_ratio("odille claudin thieriat", "odille thieriat"), 100.0);
/// assert_eq!(token_set_ratio("petit jean", "jean petit"), 100.0);
/// assert_eq!(token_set_ratio("", "jean"), 0.0);
/// ```
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let sect = common.join(" ");
    let extend = |rest: &[&str]| {
        if sect.is_empty() {
            rest.join(" ")
        } else {
            format!("{sect} {}", rest.join(" "))
        }
    };
    let with_a = extend(&only_a);
    let with_b = extend(&only_b);

    let mut best = ratio(&with_a, &with_b);
    if !sect.is_empty() {
        best = best.max(ratio(&sect, &with_a)).max(ratio(&sect, &with_b));
    }
    best
}
