//!
//! src/matcher.rs  Andrew Belles  Oct 4th, 2025
//!
//! Tiered track matcher. Decides, for one source track, whether any
//! candidate from a target catalog search is safe to accept. A miss is
//! always preferred over a wrong match.
//!

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::MatchingConfig;
use crate::errors::ConvertError;
use crate::normalize::{artist_overlap, durations_similar, normalize, string_similarity};
use crate::types::{Confidence, Isrc, MatchMethod, MatchResult, NormalizedTrack, RawTrack};

/// Search capability over one target catalog. An empty result is a valid
/// "nothing found", errors are absorbed by the matcher.
#[async_trait]
pub trait TrackSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RawTrack>, ConvertError>;
}

/// Adapts an async closure into a `TrackSearch`
pub struct SearchFn<F>(pub F);

#[async_trait]
impl<F, Fut> TrackSearch for SearchFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<RawTrack>, ConvertError>> + Send + 'static,
{
    async fn search(&self, query: &str) -> Result<Vec<RawTrack>, ConvertError> {
        (self.0)(query.to_string()).await
    }
}

#[derive(Debug, Clone, Copy)]
struct TierWeights {
    title: f64,
    artist: f64,
    duration: f64
}

const METADATA_WEIGHTS: TierWeights = TierWeights { title: 0.40, artist: 0.35, duration: 0.25 };
const FUZZY_WEIGHTS: TierWeights    = TierWeights { title: 0.50, artist: 0.30, duration: 0.20 };

#[derive(Debug, Clone)]
struct Candidate {
    track: RawTrack,
    score: f64
}

/// Weighted similarity of a candidate. The duration term only counts when
/// both durations are known.
fn score_candidate(
    source: &NormalizedTrack,
    candidate: &NormalizedTrack,
    weights: TierWeights,
    tolerance_ms: u64
) -> f64 {
    let title = string_similarity(&source.title, &candidate.title);
    let artists = artist_overlap(&source.artists, &candidate.artists);
    let duration = if source.duration_ms > 0 && candidate.duration_ms > 0
        && durations_similar(source.duration_ms, candidate.duration_ms, tolerance_ms) {
        1.0
    } else {
        0.0
    };
    title * weights.title + artists * weights.artist + duration * weights.duration
}

/// Highest scoring candidate strictly above `min_score`; earlier results win ties
fn best_candidate(
    source: &NormalizedTrack,
    results: Vec<RawTrack>,
    weights: TierWeights,
    tolerance_ms: u64,
    min_score: f64
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for track in results {
        let score = score_candidate(source, &normalize(&track), weights, tolerance_ms);
        if score <= min_score {
            continue;
        }
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Candidate { track, score });
        }
    }
    best
}

#[derive(Debug, Clone, Default)]
pub struct TieredMatcher {
    cfg: MatchingConfig
}

impl TieredMatcher {
    pub fn new(cfg: MatchingConfig) -> Self {
        Self { cfg }
    }

    /// Run ISRC, metadata and fuzzy tiers in order, first confident hit wins.
    ///
    /// A medium metadata hit is not carried forward: if the fuzzy tier also
    /// fails the track is reported as unmatched.
    pub async fn match_track<S>(&self, source: &RawTrack, search: &S) -> MatchResult
    where
        S: TrackSearch + ?Sized
    {
        let normalized = normalize(source);

        if let Some(isrc) = normalized.isrc.as_ref() {
            if let Some(track) = self.match_by_isrc(isrc, search).await {
                debug!(isrc = %isrc, "match.isrc.hit");
                return MatchResult::found(track, Confidence::High, MatchMethod::Isrc);
            }
        }

        if let Some(hit) = self.match_by_metadata(&normalized, search).await {
            if hit.score > self.cfg.metadata_high_score {
                debug!(score = hit.score, title = %source.title, "match.metadata.hit");
                return MatchResult::found(hit.track, Confidence::High, MatchMethod::Metadata);
            }
            debug!(score = hit.score, title = %source.title, "match.metadata.medium");
        }

        if let Some(hit) = self.match_by_fuzzy(&normalized, search).await {
            if hit.score > self.cfg.fuzzy_medium_score {
                debug!(score = hit.score, title = %source.title, "match.fuzzy.hit");
                return MatchResult::found(hit.track, Confidence::Medium, MatchMethod::Fuzzy);
            }
            debug!(score = hit.score, title = %source.title, "match.fuzzy.low");
        }

        debug!(title = %source.title, artist = %source.primary_artist(), "match.none");
        MatchResult::no_match()
    }

    async fn run_search<S>(&self, search: &S, query: &str, tier: &'static str) -> Vec<RawTrack>
    where
        S: TrackSearch + ?Sized
    {
        match search.search(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, tier, query, "match.search.failed");
                Vec::new()
            }
        }
    }

    // An ISRC is a fingerprint, the first hit is authoritative
    async fn match_by_isrc<S>(&self, isrc: &Isrc, search: &S) -> Option<RawTrack>
    where
        S: TrackSearch + ?Sized
    {
        let query = format!("isrc:{isrc}");
        self.run_search(search, &query, "isrc").await.into_iter().next()
    }

    async fn match_by_metadata<S>(&self, track: &NormalizedTrack, search: &S) -> Option<Candidate>
    where
        S: TrackSearch + ?Sized
    {
        let query = format!("{} {}", track.primary_artist(), track.title);
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let results = self.run_search(search, query, "metadata").await;
        best_candidate(
            track,
            results,
            METADATA_WEIGHTS,
            self.cfg.metadata_duration_tol,
            self.cfg.metadata_min_score
        )
    }

    async fn match_by_fuzzy<S>(&self, track: &NormalizedTrack, search: &S) -> Option<Candidate>
    where
        S: TrackSearch + ?Sized
    {
        if track.title.is_empty() {
            return None;
        }

        let results = self.run_search(search, &track.title, "fuzzy").await;
        best_candidate(
            track,
            results,
            FUZZY_WEIGHTS,
            self.cfg.fuzzy_duration_tol,
            self.cfg.fuzzy_min_score
        )
    }
}
