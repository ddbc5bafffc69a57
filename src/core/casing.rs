// File: src/core/casing.rs
use serde::{Deserialize, Serialize};

/// Locale rules for case mapping. Everything that lowercases, uppercases or
/// re-cases a suggestion goes through here so ranking code never touches
/// locale details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseLocale {
    /// Unicode default case mapping.
    #[default]
    Root,
    /// Turkish/Azeri dotted and dotless i.
    Turkic,
}

impl CaseLocale {
    pub fn lowercase(self, s: &str) -> String {
        match self {
            CaseLocale::Root => s.to_lowercase(),
            CaseLocale::Turkic => {
                let mut out = String::with_capacity(s.len());
                for c in s.chars() {
                    match c {
                        'I' => out.push('ı'),
                        'İ' => out.push('i'),
                        _ => out.extend(c.to_lowercase()),
                    }
                }
                out
            }
        }
    }

    pub fn uppercase(self, s: &str) -> String {
        match self {
            CaseLocale::Root => s.to_uppercase(),
            CaseLocale::Turkic => {
                let mut out = String::with_capacity(s.len());
                for c in s.chars() {
                    match c {
                        'i' => out.push('İ'),
                        'ı' => out.push('I'),
                        _ => out.extend(c.to_uppercase()),
                    }
                }
                out
            }
        }
    }

    /// Uppercases the first letter, leaving everything else untouched.
    pub fn capitalize_first(self, s: &str) -> String {
        let Some((idx, first)) = s.char_indices().find(|(_, c)| c.is_alphabetic()) else {
            return s.to_string();
        };
        if !first.is_lowercase() {
            return s.to_string();
        }
        let mut out = String::with_capacity(s.len() + 2);
        out.push_str(&s[..idx]);
        out.push_str(&self.uppercase(&first.to_string()));
        out.push_str(&s[idx + first.len_utf8()..]);
        out
    }

    /// Re-cases `candidate` to follow the pattern of what the user typed.
    ///
    /// - ALL-UPPER original (at least two uppercase letters) -> uppercase
    /// - Title original -> first letter capitalized
    /// - lowercase original -> lowercase
    /// - anything else -> verbatim
    ///
    /// `force_leading_capital` (sentence start) always wins. The pattern is
    /// judged on letters only, so `L'am` counts as Title.
    pub fn apply_casing(self, candidate: &str, original: &str, force_leading_capital: bool) -> String {
        if candidate.is_empty() {
            return String::new();
        }
        if force_leading_capital {
            return self.capitalize_first(candidate);
        }
        if original.is_empty() {
            return candidate.to_string();
        }

        let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
        let upper_count = letters.iter().filter(|c| c.is_uppercase()).count();
        let all_upper = upper_count >= 2 && letters.iter().all(|c| !c.is_lowercase());
        let first_upper = letters.first().is_some_and(|c| c.is_uppercase());
        let rest_lower = letters.iter().skip(1).all(|c| !c.is_uppercase());
        let all_lower = letters.iter().all(|c| !c.is_uppercase());

        if all_upper {
            self.uppercase(candidate)
        } else if first_upper && rest_lower {
            self.capitalize_first(candidate)
        } else if all_lower {
            self.lowercase(candidate)
        } else {
            candidate.to_string()
        }
    }
}

/// Casing with the default locale.
pub fn apply_casing(candidate: &str, original: &str, force_leading_capital: bool) -> String {
    CaseLocale::Root.apply_casing(candidate, original, force_leading_capital)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_typed_pattern() {
        assert_eq!(apply_casing("apple", "app", false), "apple");
        assert_eq!(apply_casing("apple", "App", false), "Apple");
        assert_eq!(apply_casing("apple", "APP", false), "APPLE");
    }

    #[test]
    fn typed_pattern_overrides_dictionary_capitals() {
        assert_eq!(apply_casing("iPhone", "iph", false), "iphone");
        assert_eq!(apply_casing("McCartney", "mcc", false), "mccartney");
        assert_eq!(apply_casing("iPhone", "Iph", false), "IPhone");
        assert_eq!(apply_casing("McCartney", "MCC", false), "MCCARTNEY");
        // Only an irregular original keeps the candidate as stored.
        assert_eq!(apply_casing("McCartney", "mcC", false), "McCartney");
    }

    #[test]
    fn mixed_original_keeps_candidate() {
        assert_eq!(apply_casing("hello", "hELlo", false), "hello");
        assert_eq!(apply_casing("Hello", "hELlo", false), "Hello");
    }

    #[test]
    fn forced_leading_capital() {
        assert_eq!(apply_casing("apple", "app", true), "Apple");
        assert_eq!(apply_casing("McCartney", "mcc", true), "McCartney");
    }

    #[test]
    fn edge_cases() {
        assert_eq!(apply_casing("", "abc", false), "");
        assert_eq!(apply_casing("apple", "", false), "apple");
        assert_eq!(apply_casing("123", "12", false), "123");
        assert_eq!(apply_casing("a", "A", false), "A");
        assert_eq!(apply_casing("a", "a", false), "a");
    }

    #[test]
    fn apostrophes_do_not_affect_pattern() {
        assert_eq!(apply_casing("l'amico", "l'am", false), "l'amico");
        assert_eq!(apply_casing("l'amico", "L'am", false), "L'amico");
    }

    #[test]
    fn turkic_dotted_i() {
        assert_eq!(CaseLocale::Turkic.lowercase("ISTANBUL"), "ıstanbul");
        assert_eq!(CaseLocale::Turkic.uppercase("istanbul"), "İSTANBUL");
        assert_eq!(CaseLocale::Turkic.apply_casing("istanbul", "Ist", false), "İstanbul");
    }
}
