//!
//! src/config.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Loads converter configuration from .env and the environment,
//! falling back to defaults for everything but credentials
//!

use std::{str::FromStr, time};

use url::Url;

use crate::auth::MAX_TOKEN_LIFETIME_SECS;
use crate::errors::ConvertError;
use crate::types::Visibility;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const RETRY_MAX_ATTEMPTS: u8 = 3;
pub const RETRY_BASE_BACKOFF: u64 = 250;
pub const RETRY_JITTER: bool = true;
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Constants for the conversion pipeline
pub const MATCH_GROUP_SIZE: usize = 5;
pub const MATCH_GROUP_DELAY: u64 = 100;
pub const INSERT_BATCH_DELAY: u64 = 100;
pub const PROGRESS_CAPACITY: usize = 64;

/// Wrapper over env::var to return an invalid enviroment var error
fn env_check(s: &str) -> Result<String, ConvertError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConvertError::Config(format!("{s} was not set"))),
    }
}

/// Parses an optional env var, unset or unparsable values fall back to default
fn env_or<T: FromStr>(s: &str, default: T) -> T {
    std::env::var(s)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

// Url::join drops the last segment without a trailing slash
fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

///
/// Configuration Spotify expects when hitting endpoints. The token is a
/// user token obtained elsewhere, it is only turned into a credential here.
///
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub api_base: Url,
    pub access_token: Option<String>,
    pub token_expires_in: i64,
    pub token_scopes: Vec<String>,     // space separated, as the token endpoint returns them
}

fn token_lifetime(secs: i64) -> i64 {
    secs.clamp(0, MAX_TOKEN_LIFETIME_SECS)
}

fn build_spotify() -> Result<SpotifyConfig, ConvertError> {
    let api_base = std::env::var("SPOTIFY_API_BASE")
        .unwrap_or_else(|_| "https://api.spotify.com/v1/".to_string());

    let mut api_base = Url::parse(&api_base)
        .map_err(|e| ConvertError::Config(format!("SPOTIFY_API_BASE invalid {e}")))?;

    ensure_https(&api_base).map_err(ConvertError::Config)?;
    ensure_host(&api_base, "api.spotify.com").map_err(ConvertError::Config)?;
    ensure_trailing_slash(&mut api_base);

    let access_token = env_check("SPOTIFY_ACCESS_TOKEN").ok();
    let token_expires_in = token_lifetime(env_or("SPOTIFY_TOKEN_EXPIRES_IN", 3600_i64));
    let token_scopes = std::env::var("SPOTIFY_TOKEN_SCOPES")
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Ok( SpotifyConfig { api_base, access_token, token_expires_in, token_scopes } )
}

///
/// Configuration for Http timeouts, retries, etc.
///
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_backoff: time::Duration,
    pub jitter: bool,
    pub retryable_statuses: Vec<u16>
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_backoff: time::Duration::from_millis(RETRY_BASE_BACKOFF),
            jitter: RETRY_JITTER,
            retryable_statuses: RETRYABLE_STATUSES.to_vec()
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
    pub retry: RetryConfig
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
            retry: RetryConfig::default()
        }
    }
}

///
/// Configuration for how a conversion paces itself against the
/// external catalogs
///
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub match_group_size: usize,          // tracks matched concurrently
    pub match_group_delay: time::Duration, // pause between match groups
    pub insert_batch_delay: time::Duration,
    pub progress_capacity: usize,         // bound on the progress channel
    pub visibility: Visibility,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            match_group_size: MATCH_GROUP_SIZE,
            match_group_delay: time::Duration::from_millis(MATCH_GROUP_DELAY),
            insert_batch_delay: time::Duration::from_millis(INSERT_BATCH_DELAY),
            progress_capacity: PROGRESS_CAPACITY,
            visibility: Visibility::Private,
        }
    }
}

fn build_conversion() -> ConversionConfig {
    let defaults = ConversionConfig::default();
    let visibility = match std::env::var("CONVERT_PUBLIC_PLAYLIST").ok().as_deref() {
        Some("1") | Some("true") => Visibility::Public,
        _ => defaults.visibility,
    };

    ConversionConfig {
        // a zero group would never make progress
        match_group_size: env_or("CONVERT_MATCH_GROUP_SIZE", MATCH_GROUP_SIZE).max(1),
        match_group_delay: time::Duration::from_millis(
            env_or("CONVERT_MATCH_GROUP_DELAY_MS", MATCH_GROUP_DELAY)
        ),
        insert_batch_delay: time::Duration::from_millis(
            env_or("CONVERT_INSERT_DELAY_MS", INSERT_BATCH_DELAY)
        ),
        progress_capacity: env_or("CONVERT_PROGRESS_CAPACITY", PROGRESS_CAPACITY).max(1),
        visibility,
    }
}

///
/// Acceptance thresholds and duration tolerances for each matching tier
///
#[derive(Debug, Clone, Copy)]
pub struct MatchingConfig {
    pub metadata_min_score: f64,     // candidates at or below are dropped
    pub metadata_high_score: f64,    // above this the match is final
    pub metadata_duration_tol: u64,
    pub fuzzy_min_score: f64,
    pub fuzzy_medium_score: f64,     // fuzzy matches at or below stay low
    pub fuzzy_duration_tol: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            metadata_min_score: 0.7,
            metadata_high_score: 0.9,
            metadata_duration_tol: 3_000,
            fuzzy_min_score: 0.6,
            fuzzy_medium_score: 0.8,
            fuzzy_duration_tol: 5_000,
        }
    }
}

///
/// Configuration for Logger
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,rs_playlist_converter=debug,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true,
        }
    }
}

fn build_logging() -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if let Ok(directives) = env_check("LOG_FILTER") {
        logging.filter_directives = directives;
    }
    if std::env::var("LOG_FORMAT").ok().as_deref() == Some("json") {
        logging.format = LogFormat::Json;
        logging.with_ansi = false;
        logging.include_file_line = true;
    }
    logging
}

///
/// AppConfig which holds everything the converter and its clients need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub spotify: SpotifyConfig,
    pub conversion: ConversionConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, ConvertError> {
    dotenvy::dotenv().ok();

    let http       = HttpConfig::default();
    let spotify    = build_spotify()?;
    let conversion = build_conversion();
    let matching   = MatchingConfig::default();
    let logging    = build_logging();

    Ok( AppConfig { http, spotify, conversion, matching, logging } )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_and_host_are_enforced() {
        let ok = Url::parse("https://api.spotify.com/v1/").unwrap();
        assert!(ensure_https(&ok).is_ok());
        assert!(ensure_host(&ok, "api.spotify.com").is_ok());

        let plain = Url::parse("http://api.spotify.com/v1/").unwrap();
        assert!(ensure_https(&plain).is_err());

        let other = Url::parse("https://evil.example/v1/").unwrap();
        assert!(ensure_host(&other, "api.spotify.com").is_err());
    }

    #[test]
    fn trailing_slash_keeps_join_inside_base() {
        let mut base = Url::parse("https://api.spotify.com/v1").unwrap();
        ensure_trailing_slash(&mut base);
        assert_eq!(base.join("search").unwrap().as_str(), "https://api.spotify.com/v1/search");
    }

    #[test]
    fn defaults_follow_pipeline_contract() {
        let conv = ConversionConfig::default();
        assert_eq!(conv.match_group_size, 5);
        assert_eq!(conv.visibility, Visibility::Private);

        let m = MatchingConfig::default();
        assert_eq!(m.metadata_duration_tol, 3_000);
        assert_eq!(m.fuzzy_duration_tol, 5_000);
    }

    #[test]
    fn token_lifetime_is_bounded() {
        assert_eq!(token_lifetime(3600), 3600);
        assert_eq!(token_lifetime(-5), 0);
        assert_eq!(token_lifetime(i64::MAX), MAX_TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn env_or_falls_back_on_garbage() {
        assert_eq!(env_or("RS_PLAYLIST_CONVERTER_TEST_UNSET_VAR", 7_u64), 7);
    }
}
