//!
//! src/converter.rs  Andrew Belles  Oct 6th, 2025
//!
//! Drives one playlist conversion end to end: resolve the link, fetch the
//! source tracks, match them against the target catalog in small concurrent
//! groups, create the destination playlist and fill it batch by batch.
//!

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::auth::{Credential, Credentials};
use crate::catalog::{CatalogClient, CatalogRegistry, CatalogSearch};
use crate::config::{AppConfig, ConversionConfig};
use crate::errors::ConvertError;
use crate::matcher::TieredMatcher;
use crate::progress::{ConversionProgress, ProgressSink, Stage};
use crate::types::{
    ConversionResult, CreatePlaylistParams, FailedTrack, MatchResult, RawTrack,
    ServiceKind, NO_CONFIDENT_MATCH
};
use crate::url_parser;

/// Name used when the source catalog gives us nothing better
pub const DEFAULT_PLAYLIST_NAME: &str = "My Playlist";
pub const NO_MATCH_REASON: &str = "no confident match found";

/// Keeps catalog errors the caller must see as-is, wraps the rest
fn unavailable(service: ServiceKind, e: ConvertError) -> ConvertError {
    match e {
        ConvertError::AuthenticationFailed(_)
        | ConvertError::ServiceUnavailable { .. }
        | ConvertError::Cancelled => e,
        other => ConvertError::unavailable(service.as_str(), other.to_string()),
    }
}

fn failure_reason(result: &MatchResult) -> String {
    match result.reason.as_deref() {
        None | Some(NO_CONFIDENT_MATCH) => NO_MATCH_REASON.to_string(),
        Some(reason) => reason.to_string(),
    }
}

pub struct Converter {
    registry: Arc<CatalogRegistry>,
    matcher: TieredMatcher,
    limits: ConversionConfig,

    // abandons the run between stages, groups and batches
    shutdown: CancellationToken
}

impl Converter {
    pub fn new(
        registry: Arc<CatalogRegistry>,
        matcher: TieredMatcher,
        limits: ConversionConfig
    ) -> Self {
        Self {
            registry,
            matcher,
            limits,
            shutdown: CancellationToken::new()
        }
    }

    pub fn from_config(registry: Arc<CatalogRegistry>, cfg: &AppConfig) -> Self {
        Self::new(registry, TieredMatcher::new(cfg.matching), cfg.conversion.clone())
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn check_cancelled(&self) -> Result<(), ConvertError> {
        if self.shutdown.is_cancelled() {
            warn!("convert.cancelled");
            return Err(ConvertError::Cancelled);
        }
        Ok(())
    }

    async fn pause(&self, delay: Duration) -> Result<(), ConvertError> {
        if delay.is_zero() {
            return self.check_cancelled();
        }
        tokio::select! {
            () = self.shutdown.cancelled() => Err(ConvertError::Cancelled),
            () = sleep(delay) => Ok(())
        }
    }

    /// Convert the playlist behind `source_url` into a new playlist on `target`.
    ///
    /// Link resolution, source fetch and playlist creation failures abort the
    /// run. Tracks without a confident match and failed insert batches do not.
    /// Nothing already created is rolled back.
    pub async fn convert(
        &self,
        source_url: &str,
        target: ServiceKind,
        credentials: &Credentials,
        progress: &ProgressSink
    ) -> Result<ConversionResult, ConvertError> {
        let run = Uuid::new_v4();
        let span = info_span!("convert", run = %run, target = %target);
        self.run(source_url, target, credentials, progress).instrument(span).await
    }

    async fn run(
        &self,
        source_url: &str,
        target: ServiceKind,
        credentials: &Credentials,
        progress: &ProgressSink
    ) -> Result<ConversionResult, ConvertError> {
        info!(url = source_url, "convert.start");

        // Step 1: resolve the link
        progress.emit(ConversionProgress::new(
            Stage::Parsing, "Analyzing playlist URL...", 5.0
        )).await;
        let resolved = url_parser::resolve(source_url)?;
        let source_client = self.registry.get(resolved.service)?;
        let target_client = self.registry.get(target)?;
        let source_cred = credentials.require(resolved.service)?;
        let target_cred = credentials.require(target)?;
        self.check_cancelled()?;

        // Step 2: fetch the source tracks
        progress.emit(ConversionProgress::new(
            Stage::Fetching,
            format!("Fetching playlist from {}...", resolved.service),
            15.0
        )).await;
        let tracks = source_client
            .fetch_playlist(&resolved.playlist_id, source_cred)
            .await
            .map_err(|e| unavailable(resolved.service, e))?;
        if tracks.is_empty() {
            return Err(ConvertError::EmptyPlaylist);
        }
        let total = tracks.len();
        info!(source = %resolved.service, playlist = %resolved.playlist_id, total, "convert.fetched");
        progress.emit(ConversionProgress::new(
            Stage::Fetching, format!("Found {total} tracks"), 25.0
        ).total(total)).await;

        // Step 3: match every track against the target catalog
        progress.emit(ConversionProgress::new(
            Stage::Matching, "Finding matches in destination service...", 30.0
        ).total(total).processed(0, 0)).await;
        let search = CatalogSearch::new(target_client.as_ref(), target_cred);
        let results = self.match_all(&tracks, &search, progress).await?;

        let mut matched: Vec<RawTrack> = Vec::new();
        let mut failed: Vec<FailedTrack> = Vec::new();
        for (original, result) in tracks.iter().zip(results.iter()) {
            match (&result.matched, result.success) {
                (Some(track), true) => matched.push(track.clone()),
                _ => failed.push(FailedTrack {
                    original: original.clone(),
                    reason: failure_reason(result)
                }),
            }
        }
        info!(matched = matched.len(), failed = failed.len(), "convert.matched");
        self.check_cancelled()?;

        // Step 4: create the destination playlist
        progress.emit(ConversionProgress::new(
            Stage::Creating, "Creating playlist...", 75.0
        )).await;
        let params = CreatePlaylistParams {
            name: format!("{DEFAULT_PLAYLIST_NAME} (via SoundRelay)"),
            description: format!(
                "Converted from {} • {}/{} tracks matched",
                resolved.service, matched.len(), total
            ),
            visibility: self.limits.visibility
        };
        let playlist = target_client
            .create_playlist(&params, target_cred)
            .await
            .map_err(|e| unavailable(target, e))?;
        info!(playlist = %playlist.id, url = %playlist.url, "convert.created");

        // Step 5: best-effort insertion, failed batches are skipped
        if !matched.is_empty() {
            progress.emit(ConversionProgress::new(
                Stage::Adding, "Adding tracks to playlist...", 80.0
            )).await;
            let added = self.insert_all(
                target_client.as_ref(), &playlist.id, &matched, target_cred, progress
            ).await?;
            info!(added, matched = matched.len(), "convert.inserted");
        }

        // Step 6: report
        progress.emit(ConversionProgress::new(
            Stage::Complete, "Conversion complete!", 100.0
        ).outcome(matched.len(), failed.len())).await;
        info!(total, succeeded = matched.len(), "convert.done");

        Ok(ConversionResult {
            total_tracks: total,
            success_count: matched.len(),
            failed_tracks: failed,
            playlist_url: Some(playlist.url),
            playlist_id: Some(playlist.id)
        })
    }

    /// Match in fixed size groups. A group runs concurrently and completes
    /// before its progress is reported and the next group starts.
    async fn match_all(
        &self,
        tracks: &[RawTrack],
        search: &CatalogSearch<'_>,
        progress: &ProgressSink
    ) -> Result<Vec<MatchResult>, ConvertError> {
        let total = tracks.len();
        let group_size = self.limits.match_group_size.max(1);
        let mut results: Vec<MatchResult> = Vec::with_capacity(total);
        let mut succeeded = 0_usize;

        for (index, group) in tracks.chunks(group_size).enumerate() {
            if index > 0 {
                self.pause(self.limits.match_group_delay).await?;
            } else {
                self.check_cancelled()?;
            }

            let group_results = join_all(
                group.iter().map(|track| self.matcher.match_track(track, search))
            ).await;

            succeeded += group_results.iter().filter(|r| r.success).count();
            results.extend(group_results);

            let processed = results.len();
            debug!(processed, total, succeeded, "match.group.done");
            progress.emit(ConversionProgress::new(
                Stage::Matching,
                format!("Matching tracks... ({processed}/{total})"),
                30.0 + (processed as f32 / total as f32) * 40.0
            ).total(total).processed(processed, succeeded)).await;
        }

        Ok(results)
    }

    async fn insert_all(
        &self,
        client: &dyn CatalogClient,
        playlist_id: &str,
        tracks: &[RawTrack],
        credential: &Credential,
        progress: &ProgressSink
    ) -> Result<usize, ConvertError> {
        let total = tracks.len();
        let batch_size = client.insert_batch_size().max(1);
        let mut added = 0_usize;

        for (index, batch) in tracks.chunks(batch_size).enumerate() {
            if index > 0 {
                self.pause(self.limits.insert_batch_delay).await?;
            } else {
                self.check_cancelled()?;
            }

            match client.add_tracks(playlist_id, batch, credential).await {
                Ok(accepted) => {
                    added += accepted;
                    progress.emit(ConversionProgress::new(
                        Stage::Adding,
                        format!("Adding tracks... ({added}/{total})"),
                        80.0 + (added as f32 / total as f32) * 15.0
                    )).await;
                }
                Err(e) => {
                    warn!(error = %e, batch = index, size = batch.len(), "insert.batch.failed");
                }
            }
        }

        Ok(added)
    }
}
