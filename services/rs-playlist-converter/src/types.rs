//!
//! src/types.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Track, match and playlist types shared by every stage of a conversion
//!
//!

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ConvertError;

// International standard recording code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Isrc(pub String);

impl fmt::Display for Isrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalogs a playlist link can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Spotify,
    Apple,
    Youtube,
    Deezer,
    Tidal
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::Spotify,
        ServiceKind::Apple,
        ServiceKind::Youtube,
        ServiceKind::Deezer,
        ServiceKind::Tidal
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Spotify => "spotify",
            ServiceKind::Apple   => "apple",
            ServiceKind::Youtube => "youtube",
            ServiceKind::Deezer  => "deezer",
            ServiceKind::Tidal   => "tidal",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Spotify => "Spotify",
            ServiceKind::Apple   => "Apple Music",
            ServiceKind::Youtube => "YouTube Music",
            ServiceKind::Deezer  => "Deezer",
            ServiceKind::Tidal   => "Tidal",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ServiceKind::ALL.iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConvertError::UnsupportedService(
                format!("Unsupported service: {wanted}")
            ))
    }
}

/// A track as one catalog reports it. Artists keep album credit order,
/// the first entry is the primary artist. A duration of 0 means unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrack {
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_ms: u64,
    pub isrc: Option<Isrc>,
    // the owning catalog's own id, needed to insert the track anywhere
    pub catalog_id: Option<String>
}

impl RawTrack {
    pub fn new(title: &str, artists: &[&str], album: &str, duration_ms: u64) -> Self {
        Self {
            title: title.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            album: album.to_string(),
            duration_ms,
            isrc: None,
            catalog_id: None
        }
    }

    pub fn with_isrc(mut self, isrc: &str) -> Self {
        self.isrc = Some(Isrc(isrc.to_string()));
        self
    }

    pub fn with_catalog_id(mut self, id: &str) -> Self {
        self.catalog_id = Some(id.to_string());
        self
    }

    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or("")
    }
}

/// Canonical form of a RawTrack, originals kept for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTrack {
    pub title: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub isrc: Option<Isrc>,
    pub original_title: String,
    pub original_artists: Vec<String>
}

impl NormalizedTrack {
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Isrc,
    Metadata,
    Fuzzy,
    None
}

/// Outcome of matching one source track.
///
/// `success` implies `matched` is set and confidence is high or medium;
/// `MatchMethod::None` implies no success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub success: bool,
    pub matched: Option<RawTrack>,
    pub confidence: Confidence,
    pub method: MatchMethod,
    pub reason: Option<String>
}

pub const NO_CONFIDENT_MATCH: &str = "no confident match";

impl MatchResult {
    pub fn found(track: RawTrack, confidence: Confidence, method: MatchMethod) -> Self {
        debug_assert!(confidence != Confidence::Low && method != MatchMethod::None);
        Self {
            success: true,
            matched: Some(track),
            confidence,
            method,
            reason: None
        }
    }

    pub fn no_match() -> Self {
        Self {
            success: false,
            matched: None,
            confidence: Confidence::Low,
            method: MatchMethod::None,
            reason: Some(NO_CONFIDENT_MATCH.to_string())
        }
    }
}

/// Source track that did not make it into the target playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTrack {
    pub original: RawTrack,
    pub reason: String
}

/// Aggregate of one conversion: success_count + failed_tracks.len() == total_tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub total_tracks: usize,
    pub success_count: usize,
    pub failed_tracks: Vec<FailedTrack>,
    pub playlist_url: Option<String>,
    pub playlist_id: Option<String>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePlaylistParams {
    pub name: String,
    pub description: String,
    pub visibility: Visibility
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
    pub url: String,
    pub track_count: usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_kind_parses_case_insensitively() {
        assert_eq!("Spotify".parse::<ServiceKind>().unwrap(), ServiceKind::Spotify);
        assert_eq!(" tidal ".parse::<ServiceKind>().unwrap(), ServiceKind::Tidal);
        assert!(matches!(
            "napster".parse::<ServiceKind>(),
            Err(ConvertError::UnsupportedService(_))
        ));
    }

    #[test]
    fn no_match_upholds_invariants() {
        let r = MatchResult::no_match();
        assert!(!r.success);
        assert!(r.matched.is_none());
        assert_eq!(r.method, MatchMethod::None);
        assert_eq!(r.confidence, Confidence::Low);
    }

    #[test]
    fn primary_artist_of_uncredited_track_is_empty() {
        let t = RawTrack::new("Intro", &[], "", 0);
        assert_eq!(t.primary_artist(), "");
    }
}
