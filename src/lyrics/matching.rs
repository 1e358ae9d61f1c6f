use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Hits scoring below this are treated as a different song.
const CONFIDENCE_THRESHOLD: f64 = 0.5;

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn normalize_string(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    // Lowercase, replace non-word chars with spaces, collapse whitespace
    let lower = s.to_lowercase();
    let replaced = NON_WORD_RE.replace_all(&lower, " ");
    WS_RE.replace_all(&replaced, " ").trim().to_string()
}

fn bigrams(s: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

fn dice_coefficient(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_grams = bigrams(a);
    let b_grams = bigrams(b);
    if a_grams.is_empty() || b_grams.is_empty() {
        return 0.0;
    }
    let inter = a_grams.intersection(&b_grams).count() as f64;
    (2.0 * inter) / ((a_grams.len() + b_grams.len()) as f64)
}

/// Similarity of a candidate (title, artist) to the query, in `0.0..=1.0`.
pub fn score(cand_title: &str, cand_artist: &str, query_title: &str, query_artist: &str) -> f64 {
    let title = dice_coefficient(&normalize_string(cand_title), &normalize_string(query_title));
    let artist = dice_coefficient(&normalize_string(cand_artist), &normalize_string(query_artist));
    title * 0.6 + artist * 0.4
}

/// True if `title` carries one of the `terms` (e.g. "(Remix)") that the
/// query itself does not ask for.
pub fn is_excluded(title: &str, query_title: &str, terms: &[&str]) -> bool {
    let title = title.to_lowercase();
    let query = query_title.to_lowercase();
    terms.iter().any(|term| {
        let term = term.to_lowercase();
        title.contains(&term) && !query.contains(&term)
    })
}

/// Index of the candidate that best matches the query, if any scores above
/// the confidence threshold. Ties keep the earliest candidate.
pub fn best_match(candidates: &[(&str, &str)], query_title: &str, query_artist: &str) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, (title, artist)) in candidates.iter().enumerate() {
        let s = score(title, artist, query_title, query_artist);
        if s < CONFIDENCE_THRESHOLD {
            continue;
        }
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(score("Into You", "Ariana Grande", "into you", "ARIANA GRANDE"), 1.0);
    }

    #[test]
    fn punctuation_is_ignored() {
        assert_eq!(normalize_string("  Don't   Stop! "), "don t stop");
    }

    #[test]
    fn picks_the_closest_candidate() {
        let candidates = [
            ("Into the Unknown", "Idina Menzel"),
            ("Into You", "Ariana Grande"),
            ("Into You (Remix)", "Ariana Grande"),
        ];
        assert_eq!(best_match(&candidates, "Into You", "Ariana Grande"), Some(1));
    }

    #[test]
    fn rejects_unrelated_candidates() {
        let candidates = [("Bohemian Rhapsody", "Queen")];
        assert_eq!(best_match(&candidates, "Into You", "Ariana Grande"), None);
    }

    #[test]
    fn excluded_terms_respect_the_query() {
        let terms = ["(Remix)", "(Live)"];
        assert!(is_excluded("Into You (Remix)", "Into You", &terms));
        assert!(!is_excluded("Into You (Remix)", "Into You (Remix)", &terms));
        assert!(!is_excluded("Into You", "Into You", &terms));
    }
}
