//! Cross-sectional percentile rank.
//!
//! percentile = 100 * rank / n, where rank is 1-based ascending and tied
//! values share the average of the ranks they span. The largest value
//! always scores 100. Non-finite inputs are left out of the ranking and
//! get no percentile.

use std::collections::HashMap;

pub fn percentile_ranks(values: &[(String, f64)]) -> HashMap<String, f64> {
    let mut ranked: Vec<&(String, f64)> = values.iter().filter(|(_, v)| v.is_finite()).collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = ranked.len();
    let mut out = HashMap::with_capacity(n);
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && ranked[j + 1].1 == ranked[i].1 {
            j += 1;
        }
        // positions i..=j are 1-based ranks i+1..=j+1
        let avg_rank = (i + j + 2) as f64 / 2.0;
        let pct = 100.0 * avg_rank / n as f64;
        for entry in &ranked[i..=j] {
            out.insert(entry.0.clone(), pct);
        }
        i = j + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn distinct_values_rank_evenly() {
        let values: Vec<(String, f64)> = (1..=10).map(|i| (format!("A{i}"), i as f64)).collect();
        let ranks = percentile_ranks(&values);
        assert_eq!(ranks["A10"], 100.0);
        assert_eq!(ranks["A9"], 90.0);
        assert_eq!(ranks["A1"], 10.0);
    }

    #[test]
    fn ties_share_average_rank() {
        let ranks = percentile_ranks(&input(&[("A", 1.0), ("B", 5.0), ("C", 5.0), ("D", 9.0)]));
        // B and C span ranks 2 and 3
        assert_eq!(ranks["B"], 62.5);
        assert_eq!(ranks["C"], 62.5);
        assert_eq!(ranks["D"], 100.0);
        assert_eq!(ranks["A"], 25.0);
    }

    #[test]
    fn all_equal_values_share_midpoint() {
        let ranks = percentile_ranks(&input(&[("A", 3.0), ("B", 3.0)]));
        assert_eq!(ranks["A"], 75.0);
        assert_eq!(ranks["B"], 75.0);
    }

    #[test]
    fn single_value_is_top() {
        let ranks = percentile_ranks(&input(&[("A", 42.0)]));
        assert_eq!(ranks["A"], 100.0);
    }

    #[test]
    fn non_finite_values_are_unranked() {
        let ranks = percentile_ranks(&input(&[("A", f64::NAN), ("B", 2.0), ("C", 4.0)]));
        assert!(!ranks.contains_key("A"));
        assert_eq!(ranks["B"], 50.0);
        assert_eq!(ranks["C"], 100.0);
    }

    #[test]
    fn empty_input() {
        assert!(percentile_ranks(&[]).is_empty());
    }
}
