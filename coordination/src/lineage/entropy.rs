//! Shannon entropy of digest strings.

use std::collections::BTreeMap;

/// Round to three decimal places, the precision every reported metric uses.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Base-2 Shannon entropy of the character distribution of `s`.
///
/// Over a hex digest the result lies in `0.0..=4.0`. An empty string has
/// no distribution and yields `0.0`.
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    // Ordered map keeps the summation order stable across runs.
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut len = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
        len += 1;
    }

    let len = len as f64;
    let entropy = counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum::<f64>();

    round3(entropy)
}
