// File: src/fuzzy/distance.rs

/// Optimal string alignment distance (Damerau-Levenshtein restricted to
/// adjacent transpositions, each edit costing 1), computed over chars.
///
/// Returns `None` when the distance exceeds `max`. The length difference is
/// a lower bound, so wildly different lengths are rejected before any work.
pub fn bounded_osa(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    bounded_osa_chars(&a, &b, max)
}

pub fn bounded_osa_chars(a: &[char], b: &[char], max: usize) -> Option<usize> {
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(a.len().max(b.len()));
    }

    let width = b.len() + 1;
    let mut prev2: Vec<usize> = vec![0; width];
    let mut prev: Vec<usize> = (0..width).collect();
    let mut curr: Vec<usize> = vec![0; width];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut value = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                value = value.min(prev2[j - 2] + 1);
            }
            curr[j] = value;
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn basic_edits() {
        assert_eq!(bounded_osa("hallo", "hallo", 2), Some(0));
        assert_eq!(bounded_osa("hxllo", "hallo", 2), Some(1));
        assert_eq!(bounded_osa("hllo", "hallo", 2), Some(1));
        assert_eq!(bounded_osa("haallo", "hallo", 2), Some(1));
        assert_eq!(bounded_osa("hxxlo", "hallo", 2), Some(2));
        assert_eq!(bounded_osa("hxxxo", "hallo", 2), None);
    }

    #[test]
    fn transposition_costs_one() {
        assert_eq!(bounded_osa("teh", "the", 2), Some(1));
        assert_eq!(bounded_osa("halol", "hallo", 2), Some(1));
        assert_eq!(bounded_osa("ab", "ba", 1), Some(1));
    }

    #[test]
    fn length_gap_short_circuits() {
        assert_eq!(bounded_osa("a", "abcd", 2), None);
        assert_eq!(bounded_osa("", "ab", 2), Some(2));
        assert_eq!(bounded_osa("", "", 0), Some(0));
    }

    #[test]
    fn counts_chars_not_bytes() {
        assert_eq!(bounded_osa("perché", "perche", 2), Some(1));
        assert_eq!(bounded_osa("città", "citta", 1), Some(1));
    }

    fn word_from(picks: &[u8]) -> String {
        picks.iter().take(8).map(|p| ['a', 'b', 'c', 'é'][*p as usize % 4]).collect()
    }

    quickcheck! {
        fn distance_is_symmetric(a: Vec<u8>, b: Vec<u8>) -> bool {
            let (a, b) = (word_from(&a), word_from(&b));
            bounded_osa(&a, &b, 16) == bounded_osa(&b, &a, 16)
        }

        fn bound_only_cuts_off(a: Vec<u8>, b: Vec<u8>, max: u8) -> bool {
            let (a, b) = (word_from(&a), word_from(&b));
            let max = usize::from(max % 4);
            let full = bounded_osa(&a, &b, 16);
            match bounded_osa(&a, &b, max) {
                Some(d) => full == Some(d) && d <= max,
                None => full.is_some_and(|d| d > max),
            }
        }

        fn zero_only_for_equal_words(a: Vec<u8>, b: Vec<u8>) -> bool {
            let (a, b) = (word_from(&a), word_from(&b));
            (bounded_osa(&a, &b, 16) == Some(0)) == (a == b)
        }
    }
}
