//!
//! src/lib.rs  Andrew Belles  Oct 8th, 2025
//!
//! Cross-catalog playlist converter. Resolves a playlist link, matches each
//! track against a target catalog and builds the playlist there.
//!

pub mod auth;
pub mod catalog;
pub mod config;
pub mod converter;
pub mod errors;
pub mod http;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod progress;
pub mod spotify;
pub mod types;
pub mod url_parser;

pub use auth::{Credential, Credentials};
pub use catalog::{CatalogClient, CatalogRegistry, CatalogRegistryBuilder};
pub use converter::Converter;
pub use errors::ConvertError;
pub use matcher::{SearchFn, TieredMatcher, TrackSearch};
pub use progress::{ConversionProgress, ProgressSink, Stage};
pub use types::{
    Confidence, ConversionResult, FailedTrack, MatchMethod, MatchResult, RawTrack,
    ServiceKind
};
pub use url_parser::ResolvedUrl;

/// Convert the playlist at `source_url` into a new playlist on the catalog
/// named by `target_service` ("spotify", "deezer", ...)
pub async fn convert_playlist(
    converter: &Converter,
    source_url: &str,
    target_service: &str,
    credentials: &Credentials,
    progress: &ProgressSink
) -> Result<ConversionResult, ConvertError> {
    let target: ServiceKind = target_service.parse()?;
    converter.convert(source_url, target, credentials, progress).await
}

/// Which catalog a playlist link belongs to, and its playlist id
pub fn resolve_playlist_url(url: &str) -> Result<ResolvedUrl, ConvertError> {
    url_parser::resolve(url)
}

/// Match one track with the default thresholds
pub async fn match_track<S>(track: &RawTrack, search: &S) -> MatchResult
where
    S: TrackSearch + ?Sized
{
    TieredMatcher::default().match_track(track, search).await
}
