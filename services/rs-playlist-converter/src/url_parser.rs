//!
//! src/url_parser.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Classifies a playlist link into the catalog it belongs to and the
//! playlist identifier that catalog uses. Pure, no network access.
//!

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ConvertError;
use crate::types::ServiceKind;

/// One registered link shape. The playlist id is always the final capture group.
#[derive(Debug)]
pub struct UrlPattern {
    pub service: ServiceKind,
    pub domain: &'static str,
    pub pattern: Regex
}

fn pattern(service: ServiceKind, domain: &'static str, re: &str) -> UrlPattern {
    // patterns are static literals, a bad one is a programming error
    let pattern = Regex::new(re).unwrap_or_else(|e| panic!("bad url pattern {re}: {e}"));
    UrlPattern { service, domain, pattern }
}

// Checked in order. Domains are disjoint so at most one can match.
static URL_PATTERNS: LazyLock<Vec<UrlPattern>> = LazyLock::new(|| vec![
    pattern(
        ServiceKind::Spotify,
        "spotify.com",
        r"^https?://(open\.)?spotify\.com/playlist/([a-zA-Z0-9]+)"
    ),
    pattern(
        ServiceKind::Apple,
        "music.apple.com",
        r"^https?://music\.apple\.com/[a-z]{2}/playlist/[^/]+/([a-zA-Z0-9.\-]+)"
    ),
    pattern(
        ServiceKind::Youtube,
        "music.youtube.com",
        r"^https?://music\.youtube\.com/playlist\?list=([a-zA-Z0-9\-_]+)"
    ),
    pattern(
        ServiceKind::Deezer,
        "deezer.com",
        r"^https?://(www\.)?deezer\.com/[a-z]{2}/playlist/([0-9]+)"
    ),
    pattern(
        ServiceKind::Tidal,
        "tidal.com",
        r"^https?://(listen\.)?tidal\.com/playlist/([a-zA-Z0-9\-]+)"
    ),
]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedUrl {
    pub service: ServiceKind,
    pub playlist_id: String
}

/// Resolve a playlist link to (service, playlist id).
///
/// Fails with `InvalidUrl` for blank input and `UnsupportedService` when no
/// registered pattern matches.
pub fn resolve(url: &str) -> Result<ResolvedUrl, ConvertError> {
    let clean = url.trim();
    if clean.is_empty() {
        return Err(ConvertError::invalid_url());
    }

    for entry in URL_PATTERNS.iter() {
        let Some(caps) = entry.pattern.captures(clean) else {
            continue;
        };
        // last capture group holds the id
        if let Some(id) = caps.get(caps.len() - 1) {
            return Ok(ResolvedUrl {
                service: entry.service,
                playlist_id: id.as_str().to_string()
            });
        }
    }

    Err(ConvertError::unsupported_url())
}

pub fn supported_domains() -> Vec<&'static str> {
    URL_PATTERNS.iter().map(|p| p.domain).collect()
}

pub fn is_supported(url: &str) -> bool {
    resolve(url).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spotify_playlist() {
        let r = resolve("https://open.spotify.com/playlist/abc123").unwrap();
        assert_eq!(r.service, ServiceKind::Spotify);
        assert_eq!(r.playlist_id, "abc123");
    }

    #[test]
    fn resolves_every_registered_catalog() {
        let cases = [
            ("https://spotify.com/playlist/37i9dQZF1DX", ServiceKind::Spotify, "37i9dQZF1DX"),
            (
                "https://music.apple.com/us/playlist/chill-mix/pl.u-8aAVZAxFqLoe",
                ServiceKind::Apple,
                "pl.u-8aAVZAxFqLoe"
            ),
            (
                "https://music.youtube.com/playlist?list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG",
                ServiceKind::Youtube,
                "PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG"
            ),
            ("https://www.deezer.com/fr/playlist/908622995", ServiceKind::Deezer, "908622995"),
            (
                "https://listen.tidal.com/playlist/1b087082-ab54-4e7d-a0d3",
                ServiceKind::Tidal,
                "1b087082-ab54-4e7d-a0d3"
            ),
        ];
        for (url, service, id) in cases {
            let r = resolve(url).unwrap();
            assert_eq!(r.service, service, "{url}");
            assert_eq!(r.playlist_id, id, "{url}");
        }
    }

    #[test]
    fn trims_and_ignores_query_suffix() {
        let r = resolve("  https://open.spotify.com/playlist/abc123?si=xyz  ").unwrap();
        assert_eq!(r.playlist_id, "abc123");
    }

    #[test]
    fn rejects_unknown_domain() {
        let err = resolve("https://example.com/abc").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedService(_)));
        assert!(err.to_string().contains("Tidal"));
    }

    #[test]
    fn rejects_blank_input() {
        assert!(matches!(resolve(""), Err(ConvertError::InvalidUrl(_))));
        assert!(matches!(resolve("   "), Err(ConvertError::InvalidUrl(_))));
        match resolve("") {
            Err(ConvertError::InvalidUrl(msg)) => assert!(msg.contains("Tidal")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn album_links_are_not_playlists() {
        assert!(!is_supported("https://open.spotify.com/album/4yP0hdKOZPNshxUOjY0cZj"));
    }

    #[test]
    fn lists_domains_in_priority_order() {
        assert_eq!(supported_domains(), vec![
            "spotify.com", "music.apple.com", "music.youtube.com", "deezer.com", "tidal.com"
        ]);
    }
}
