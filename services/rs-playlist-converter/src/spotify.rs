//!
//! src/spotify.rs  Andrew Belles  Oct 8th, 2025
//!
//! Spotify Web API catalog client. Builds requests against the configured
//! api base and decodes the track objects Spotify returns into RawTracks.
//!

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::Credential;
use crate::catalog::CatalogClient;
use crate::config::{HttpConfig, RetryConfig, SpotifyConfig};
use crate::errors::ConvertError;
use crate::http::{http_with_retry, json_client};
use crate::types::{CreatePlaylistParams, PlaylistInfo, RawTrack, ServiceKind, Visibility};

/// Spotify accepts at most this many uris per insert
pub const SPOTIFY_INSERT_BATCH: usize = 100;
const PAGE_LIMIT: u32 = 50;
const SEARCH_LIMIT: u32 = 20;

/// Decodes one Spotify track object. Episodes, local files without an id
/// and null slots are skipped.
fn track_from_json(track: &Value) -> Option<RawTrack> {
    if track.is_null() || track["type"].as_str().is_some_and(|t| t != "track") {
        return None;
    }
    let title = track["name"].as_str()?;
    let artists: Vec<&str> = track["artists"]
        .as_array()
        .map(|a| a.iter().filter_map(|artist| artist["name"].as_str()).collect())
        .unwrap_or_default();
    let album = track["album"]["name"].as_str().unwrap_or("");
    let duration_ms = track["duration_ms"].as_u64().unwrap_or(0);

    let mut raw = RawTrack::new(title, &artists, album, duration_ms);
    if let Some(isrc) = track["external_ids"]["isrc"].as_str().filter(|s| !s.is_empty()) {
        raw = raw.with_isrc(isrc);
    }
    if let Some(id) = track["id"].as_str() {
        raw = raw.with_catalog_id(id);
    }
    Some(raw)
}

/// Tracks of one `playlists/{id}/tracks` page and the url of the next one
fn page_tracks(page: &Value) -> (Vec<RawTrack>, Option<String>) {
    let tracks = page["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|item| track_from_json(&item["track"])).collect())
        .unwrap_or_default();
    let next = page["next"].as_str().map(str::to_string);
    (tracks, next)
}

fn search_tracks_from(body: &Value) -> Vec<RawTrack> {
    body["tracks"]["items"]
        .as_array()
        .map(|items| items.iter().filter_map(track_from_json).collect())
        .unwrap_or_default()
}

/// Scope a token needs to create a playlist with this visibility
fn required_scope(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public  => "playlist-modify-public",
        Visibility::Private => "playlist-modify-private",
    }
}

fn track_uris(tracks: &[RawTrack]) -> Vec<String> {
    tracks.iter()
        .filter_map(|t| t.catalog_id.as_deref())
        .map(|id| format!("spotify:track:{id}"))
        .collect()
}

#[derive(Clone, Debug)]
pub struct SpotifyCatalog {
    http: Client,
    cfg: SpotifyConfig,
    retry: RetryConfig
}

impl SpotifyCatalog {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) -> Result<Self, ConvertError> {
        let http = json_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone(),
            retry: http_config.retry.clone()
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ConvertError> {
        self.cfg.api_base
            .join(path)
            .map_err(|e| ConvertError::Config(format!("spotify endpoint {path}: {e}")))
    }

    /// Pagination urls come from the response, only follow them to our api host
    fn next_page(&self, next: &str) -> Result<Url, ConvertError> {
        let url = Url::parse(next)
            .map_err(|e| ConvertError::Parse(format!("spotify next page {e}")))?;
        if url.host_str() != self.cfg.api_base.host_str() {
            return Err(ConvertError::Parse(format!("spotify next page off host: {url}")));
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ConvertError> {
        http_with_retry(ServiceKind::Spotify, request, &self.retry).await
    }

    /// GET /v1/playlists/{id}/tracks?limit=
    fn playlist_tracks(&self, playlist_id: &str, bearer: &str) -> Result<RequestBuilder, ConvertError> {
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        Ok(self.http.get(url)
            .bearer_auth(bearer)
            .query(&[("limit", PAGE_LIMIT.to_string())]))
    }

    /// GET /v1/search?type=track&q=...&limit=
    fn search(&self, query: &str, bearer: &str) -> Result<RequestBuilder, ConvertError> {
        let url = self.endpoint("search")?;
        Ok(self.http.get(url).bearer_auth(bearer).query(&[
            ("type", "track"),
            ("q", query),
            ("limit", SEARCH_LIMIT.to_string().as_str())
        ]))
    }

    /// GET /v1/me
    fn me(&self, bearer: &str) -> Result<RequestBuilder, ConvertError> {
        Ok(self.http.get(self.endpoint("me")?).bearer_auth(bearer))
    }
}

#[async_trait]
impl CatalogClient for SpotifyCatalog {
    fn service(&self) -> ServiceKind {
        ServiceKind::Spotify
    }

    fn insert_batch_size(&self) -> usize {
        SPOTIFY_INSERT_BATCH
    }

    async fn fetch_playlist(
        &self,
        playlist_id: &str,
        credential: &Credential
    ) -> Result<Vec<RawTrack>, ConvertError> {
        let bearer = credential.token.as_str();
        let first = self.send(self.playlist_tracks(playlist_id, bearer)?).await?;
        let (mut tracks, mut next) = page_tracks(&first);

        let mut pages = 1_usize;
        while let Some(url) = next.take() {
            let url = self.next_page(&url)?;
            let page = self.send(self.http.get(url).bearer_auth(bearer)).await?;
            let (more, following) = page_tracks(&page);
            tracks.extend(more);
            next = following;
            pages += 1;
        }

        debug!(playlist = playlist_id, pages, tracks = tracks.len(), "spotify.playlist.fetched");
        Ok(tracks)
    }

    async fn search_tracks(
        &self,
        query: &str,
        credential: &Credential
    ) -> Result<Vec<RawTrack>, ConvertError> {
        let body = self.send(self.search(query, &credential.token)?).await?;
        Ok(search_tracks_from(&body))
    }

    async fn create_playlist(
        &self,
        params: &CreatePlaylistParams,
        credential: &Credential
    ) -> Result<PlaylistInfo, ConvertError> {
        let scope = required_scope(params.visibility);
        if !credential.grants(scope) {
            warn!(scope, "spotify.scope.missing");
            return Err(ConvertError::AuthenticationFailed(ServiceKind::Spotify.to_string()));
        }

        let bearer = credential.token.as_str();
        let user = self.send(self.me(bearer)?).await?;
        let user_id = user["id"].as_str()
            .ok_or_else(|| ConvertError::Parse("spotify /me missing id".to_string()))?;

        let url = self.endpoint(&format!("users/{user_id}/playlists"))?;
        let body = json!({
            "name": params.name,
            "description": params.description,
            "public": params.visibility == Visibility::Public
        });
        let playlist = self.send(self.http.post(url).bearer_auth(bearer).json(&body)).await?;

        let id = playlist["id"].as_str()
            .ok_or_else(|| ConvertError::Parse("spotify playlist missing id".to_string()))?;
        let url = playlist["external_urls"]["spotify"].as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{id}"));

        info!(playlist = id, user = user_id, "spotify.playlist.created");
        Ok(PlaylistInfo {
            id: id.to_string(),
            name: playlist["name"].as_str().unwrap_or(&params.name).to_string(),
            url,
            track_count: 0
        })
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        tracks: &[RawTrack],
        credential: &Credential
    ) -> Result<usize, ConvertError> {
        let uris = track_uris(tracks);
        if uris.len() < tracks.len() {
            warn!(skipped = tracks.len() - uris.len(), "spotify.add.missing_id");
        }
        if uris.is_empty() {
            return Ok(0);
        }

        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        let request = self.http.post(url)
            .bearer_auth(&credential.token)
            .json(&json!({ "uris": uris }));
        self.send(request).await?;
        Ok(uris.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn sample_track(id: &str, isrc: Option<&str>) -> Value {
        json!({
            "type": "track",
            "id": id,
            "name": "Breathe Deeper",
            "duration_ms": 372_000,
            "album": { "name": "The Slow Rush" },
            "artists": [{ "name": "Tame Impala" }, { "name": "Lil Yachty" }],
            "external_ids": isrc.map(|i| json!({ "isrc": i })).unwrap_or(json!({}))
        })
    }

    #[test]
    fn decodes_track_objects() {
        let t = track_from_json(&sample_track("6GtOsEzNUhJghrIf6UTbRV", Some("AUUM71900929"))).unwrap();
        assert_eq!(t.title, "Breathe Deeper");
        assert_eq!(t.artists, vec!["Tame Impala", "Lil Yachty"]);
        assert_eq!(t.album, "The Slow Rush");
        assert_eq!(t.duration_ms, 372_000);
        assert_eq!(t.isrc.unwrap().0, "AUUM71900929");
        assert_eq!(t.catalog_id.as_deref(), Some("6GtOsEzNUhJghrIf6UTbRV"));
    }

    #[test]
    fn page_skips_episodes_and_empty_slots() {
        let page = json!({
            "items": [
                { "track": sample_track("a", None) },
                { "track": null },
                { "track": { "type": "episode", "name": "Podcast", "id": "e" } },
                { "track": sample_track("b", Some("X")) }
            ],
            "next": "https://api.spotify.com/v1/playlists/p/tracks?offset=50&limit=50"
        });
        let (tracks, next) = page_tracks(&page);
        let ids: Vec<_> = tracks.iter().filter_map(|t| t.catalog_id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(tracks[0].isrc.is_none());
        assert!(next.is_some());
    }

    #[test]
    fn last_page_has_no_next() {
        let (tracks, next) = page_tracks(&json!({ "items": [], "next": null }));
        assert!(tracks.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn search_results_decode() {
        let body = json!({ "tracks": { "items": [sample_track("a", None), sample_track("b", None)] } });
        assert_eq!(search_tracks_from(&body).len(), 2);
        assert!(search_tracks_from(&json!({})).is_empty());
    }

    #[test]
    fn uris_skip_tracks_without_ids() {
        let tracks = vec![
            RawTrack::new("a", &[], "", 0).with_catalog_id("1"),
            RawTrack::new("b", &[], "", 0),
            RawTrack::new("c", &[], "", 0).with_catalog_id("3")
        ];
        assert_eq!(track_uris(&tracks), vec!["spotify:track:1", "spotify:track:3"]);
    }

    fn catalog() -> SpotifyCatalog {
        let cfg = SpotifyConfig {
            api_base: Url::parse("https://api.spotify.com/v1/").unwrap(),
            access_token: None,
            token_expires_in: 3600,
            token_scopes: Vec::new()
        };
        SpotifyCatalog::new(&HttpConfig::default(), &cfg).unwrap()
    }

    #[tokio::test]
    async fn create_without_modify_scope_fails_before_any_request() {
        let credential = Credential::new(ServiceKind::Spotify, "tok", 3600)
            .with_scopes(&["playlist-read-private"]);
        let params = CreatePlaylistParams {
            name: "My Playlist (via SoundRelay)".into(),
            description: String::new(),
            visibility: Visibility::Private
        };
        let err = catalog().create_playlist(&params, &credential).await.unwrap_err();
        assert!(matches!(err, ConvertError::AuthenticationFailed(s) if s == "spotify"));
    }

    #[test]
    fn pagination_stays_on_api_host() {
        let spotify = catalog();
        assert!(spotify.next_page("https://api.spotify.com/v1/playlists/p/tracks?offset=50").is_ok());
        assert!(matches!(
            spotify.next_page("https://evil.example/v1/steal"),
            Err(ConvertError::Parse(_))
        ));
    }

    #[test]
    fn requests_target_the_api_base() {
        let spotify = catalog();
        let req = spotify.search("isrc:AUUM71900929", "tok").unwrap().build().unwrap();
        assert_eq!(req.url().path(), "/v1/search");
        let query = req.url().query().unwrap();
        assert!(query.contains("type=track"));
        assert!(query.contains("limit=20"));
        assert!(query.contains("q=isrc%3AAUUM71900929"));
    }

    fn live() -> bool {
        std::env::var("LIVE_HTTP").ok().as_deref() == Some("1")
    }

    #[tokio::test]
    async fn spotify_catalog_testbench() -> Result<(), ConvertError> {
        dotenvy::dotenv().ok();

        if !live() {
            eprintln!("Set LIVE_HTTP=1 to run");
            return Ok(())
        }

        let cfgs = config::load_config()?;
        let Some(token) = cfgs.spotify.access_token.as_deref() else {
            eprintln!("Set SPOTIFY_ACCESS_TOKEN to run");
            return Ok(())
        };
        let spotify = SpotifyCatalog::new(&cfgs.http, &cfgs.spotify)?;
        let credential = Credential::new(ServiceKind::Spotify, token, 3600);

        // Breathe Deeper - Tame Impala, Lil Yachty
        let hits = spotify.search_tracks("isrc:AUUM71900929", &credential).await?;
        println!("hits: {hits:#?}");
        assert!(!hits.is_empty());

        Ok(())
    }
}
