//!
//! src/normalize.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Canonicalizes noisy track metadata so tracks from different catalogs
//! can be compared, plus the similarity primitives the matcher scores with.
//! Everything here is pure and deterministic.
//!

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{NormalizedTrack, RawTrack};

/// Qualifiers stripped from titles before comparison. New edition markers
/// belong in this list rather than in matcher special cases.
const TITLE_QUALIFIERS: &[&str] = &[
    r"\s*[\(\[]\s*(\d{4}\s+)?re-?master(ed)?(\s+\d{4})?(\s+version)?\s*[\)\]]",
    r"\s*[\(\[]\s*radio edit\s*[\)\]]",
    r"\s*[\(\[]\s*single version\s*[\)\]]",
    r"\s*[\(\[]\s*album version\s*[\)\]]",
    r"\s*[\(\[]\s*explicit\s*[\)\]]",
    r"\s*[\(\[]\s*clean\s*[\)\]]",
    r"\s*[\(\[]\s*feat\..*?[\)\]]",
    r"\s*[\(\[]\s*featuring.*?[\)\]]",
    r"\s*[\(\[]\s*with\s.*?[\)\]]",
    r"\s*[\(\[]\s*live\s*[\)\]]",
    r"\s*[\(\[]\s*acoustic\s*[\)\]]",
    r"\s*[\(\[]\s*remix\s*[\)\]]",
    r"\s*-\s*(radio edit|single version|single|album version)\s*$",
    r"\s*-\s*(\d{4}\s+)?re-?master(ed)?(\s+\d{4})?(\s+version)?\s*$",
];

static RE_QUALIFIERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TITLE_QUALIFIERS.iter()
        .map(|q| Regex::new(&format!("(?i){q}")).unwrap())
        .collect()
});
static RE_NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static RE_LEAD_THE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^the\s+").unwrap());

/// Artist names count as the same credit above this similarity
pub const ARTIST_SIMILARITY_THRESHOLD: f64 = 0.8;

fn strip_punctuation(s: &str) -> String {
    let spaced = RE_NON_WORD.replace_all(s, " ");
    RE_SPACES.replace_all(&spaced, " ").trim().to_string()
}

pub fn normalize_title(title: &str) -> String {
    let mut cleaned = title.to_lowercase();
    for re in RE_QUALIFIERS.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    strip_punctuation(&cleaned)
}

pub fn normalize_artist(artist: &str) -> String {
    let lowered = artist.to_lowercase();
    let lowered = lowered.trim_start();
    strip_punctuation(&RE_LEAD_THE.replace(lowered, ""))
}

pub fn normalize(track: &RawTrack) -> NormalizedTrack {
    NormalizedTrack {
        title: normalize_title(&track.title),
        artists: track.artists.iter().map(|a| normalize_artist(a)).collect(),
        duration_ms: track.duration_ms,
        isrc: track.isrc.clone(),
        original_title: track.title.clone(),
        original_artists: track.artists.clone()
    }
}

/// 1 minus the Levenshtein distance over the longer length, case-insensitive.
/// Two empty strings are identical.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Fraction of `left` artists with a close counterpart in `right`, taken over
/// the larger list so unmatched extras on either side cost score.
pub fn artist_overlap(left: &[String], right: &[String]) -> f64 {
    let left: Vec<String> = left.iter().map(|a| normalize_artist(a)).collect();
    let right: Vec<String> = right.iter().map(|a| normalize_artist(a)).collect();

    let denom = left.len().max(right.len());
    if denom == 0 {
        return 0.0;
    }

    let matches = left.iter()
        .filter(|l| right.iter().any(|r| string_similarity(l, r) > ARTIST_SIMILARITY_THRESHOLD))
        .count();
    matches as f64 / denom as f64
}

pub fn durations_similar(d1: u64, d2: u64, tolerance_ms: u64) -> bool {
    d1.abs_diff(d2) <= tolerance_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn radio_edit_collapses_to_plain_title() {
        let edited = normalize_title("Blinding Lights (Radio Edit)");
        let plain = normalize_title("Blinding Lights");
        assert_eq!(edited, "blinding lights");
        assert_eq!(edited, plain);
        assert_eq!(string_similarity(&edited, &plain), 1.0);
    }

    #[test]
    fn strips_known_qualifiers() {
        assert_eq!(normalize_title("Come Together (Remastered 2009)"), "come together");
        assert_eq!(normalize_title("Heroes (2017 Remaster)"), "heroes");
        assert_eq!(normalize_title("Stay (feat. Justin Bieber)"), "stay");
        assert_eq!(normalize_title("Old Town Road [Remix]"), "old town road");
        assert_eq!(normalize_title("Layla - Single Version"), "layla");
        assert_eq!(normalize_title("Here Comes the Sun - Remastered 2009"), "here comes the sun");
        assert_eq!(normalize_title("Creep (Acoustic)"), "creep");
        assert_eq!(normalize_title("Smells Like Teen Spirit (Live)"), "smells like teen spirit");
    }

    #[test]
    fn keeps_unknown_parentheticals_as_words() {
        assert_eq!(normalize_title("Hello (Goodbye)"), "hello goodbye");
    }

    #[test]
    fn strips_punctuation_and_whitespace() {
        assert_eq!(normalize_title("  Don't   Stop   Me Now!! "), "don t stop me now");
    }

    #[test]
    fn artist_drops_leading_article() {
        assert_eq!(normalize_artist("The Weeknd"), "weeknd");
        assert_eq!(normalize_artist("AC/DC"), "ac dc");
        assert_eq!(normalize_artist("Theory of a Deadman"), "theory of a deadman");
    }

    #[test]
    fn normalize_is_deterministic_and_keeps_originals() {
        let t = RawTrack::new("Levitating (feat. DaBaby)", &["Dua Lipa", "DaBaby"], "Future Nostalgia", 203_064)
            .with_isrc("GBAHT2000942");
        let a = normalize(&t);
        let b = normalize(&t);
        assert_eq!(a, b);
        assert_eq!(a.title, "levitating");
        assert_eq!(a.original_title, "Levitating (feat. DaBaby)");
        assert_eq!(a.original_artists, t.artists);
        assert_eq!(a.isrc, t.isrc);
    }

    #[test]
    fn similarity_identity_and_symmetry() {
        assert_eq!(string_similarity("", ""), 1.0);
        assert_eq!(string_similarity("levitating", "levitating"), 1.0);
        assert_eq!(string_similarity("ABC", "abc"), 1.0);
        let ab = string_similarity("kitten", "sitting");
        let ba = string_similarity("sitting", "kitten");
        assert_eq!(ab, ba);
        assert!((ab - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
        assert_eq!(string_similarity("abc", ""), 0.0);
    }

    #[test]
    fn overlap_penalizes_extra_artists() {
        assert_eq!(artist_overlap(&names(&["The Weeknd"]), &names(&["Weeknd"])), 1.0);
        assert_eq!(artist_overlap(&names(&["Dua Lipa"]), &names(&["Dua Lipa", "DaBaby"])), 0.5);
        assert_eq!(artist_overlap(&names(&["Dua Lipa", "DaBaby"]), &names(&["Dua Lipa"])), 0.5);
        assert_eq!(artist_overlap(&names(&["Adele"]), &names(&["Drake"])), 0.0);
        assert_eq!(artist_overlap(&[], &[]), 0.0);
    }

    #[test]
    fn duration_tolerance_is_inclusive() {
        assert!(durations_similar(200_000, 203_000, 3000));
        assert!(durations_similar(203_000, 200_000, 3000));
        assert!(!durations_similar(200_000, 203_001, 3000));
        assert!(durations_similar(200_000, 205_000, 5000));
    }
}
