//!
//! src/catalog.rs  Andrew Belles  Oct 5th, 2025
//!
//! Capability interface every streaming catalog implements, and the
//! registry the converter dispatches through. Adding a catalog means
//! registering another client, never touching the matcher.
//!

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::Credential;
use crate::errors::ConvertError;
use crate::matcher::TrackSearch;
use crate::types::{CreatePlaylistParams, PlaylistInfo, RawTrack, ServiceKind};

#[async_trait]
pub trait CatalogClient: Send + Sync {
    fn service(&self) -> ServiceKind;

    /// Largest number of tracks `add_tracks` accepts in one call
    fn insert_batch_size(&self) -> usize;

    /// Every track of a playlist, in playlist order
    async fn fetch_playlist(
        &self,
        playlist_id: &str,
        credential: &Credential
    ) -> Result<Vec<RawTrack>, ConvertError>;

    async fn search_tracks(
        &self,
        query: &str,
        credential: &Credential
    ) -> Result<Vec<RawTrack>, ConvertError>;

    async fn create_playlist(
        &self,
        params: &CreatePlaylistParams,
        credential: &Credential
    ) -> Result<PlaylistInfo, ConvertError>;

    /// Insert one batch, returns how many tracks the catalog accepted
    async fn add_tracks(
        &self,
        playlist_id: &str,
        tracks: &[RawTrack],
        credential: &Credential
    ) -> Result<usize, ConvertError>;
}

/// Binds a catalog client to the credential of the current conversion so
/// the matcher only sees a search function
pub struct CatalogSearch<'a> {
    client: &'a dyn CatalogClient,
    credential: &'a Credential
}

impl<'a> CatalogSearch<'a> {
    pub fn new(client: &'a dyn CatalogClient, credential: &'a Credential) -> Self {
        Self { client, credential }
    }
}

#[async_trait]
impl TrackSearch for CatalogSearch<'_> {
    async fn search(&self, query: &str) -> Result<Vec<RawTrack>, ConvertError> {
        self.client.search_tracks(query, self.credential).await
    }
}

pub struct CatalogRegistry {
    clients: HashMap<ServiceKind, Arc<dyn CatalogClient>>
}

impl CatalogRegistry {
    pub fn builder() -> CatalogRegistryBuilder {
        CatalogRegistryBuilder::new()
    }

    pub fn get(&self, service: ServiceKind) -> Result<&Arc<dyn CatalogClient>, ConvertError> {
        self.clients.get(&service).ok_or_else(|| ConvertError::UnsupportedService(
            format!("{} integration is not available", service.display_name())
        ))
    }

    pub fn services(&self) -> Vec<ServiceKind> {
        ServiceKind::ALL.iter()
            .copied()
            .filter(|s| self.clients.contains_key(s))
            .collect()
    }
}

#[derive(Default)]
pub struct CatalogRegistryBuilder {
    clients: HashMap<ServiceKind, Arc<dyn CatalogClient>>
}

impl CatalogRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, client: impl CatalogClient + 'static) -> Self {
        self.clients.insert(client.service(), Arc::new(client));
        self
    }

    pub fn add_shared(mut self, client: Arc<dyn CatalogClient>) -> Self {
        self.clients.insert(client.service(), client);
        self
    }

    pub fn build(self) -> Result<CatalogRegistry, ConvertError> {
        if self.clients.is_empty() {
            return Err(ConvertError::Config("at least one catalog client required".into()));
        }
        Ok(CatalogRegistry { clients: self.clients })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(ServiceKind);

    #[async_trait]
    impl CatalogClient for Stub {
        fn service(&self) -> ServiceKind { self.0 }
        fn insert_batch_size(&self) -> usize { 50 }

        async fn fetch_playlist(&self, _: &str, _: &Credential) -> Result<Vec<RawTrack>, ConvertError> {
            Ok(vec![])
        }

        async fn search_tracks(&self, query: &str, _: &Credential) -> Result<Vec<RawTrack>, ConvertError> {
            Ok(vec![RawTrack::new(query, &[], "", 0)])
        }

        async fn create_playlist(
            &self,
            params: &CreatePlaylistParams,
            _: &Credential
        ) -> Result<PlaylistInfo, ConvertError> {
            Ok(PlaylistInfo {
                id: "p1".into(),
                name: params.name.clone(),
                url: "https://example/p1".into(),
                track_count: 0
            })
        }

        async fn add_tracks(&self, _: &str, tracks: &[RawTrack], _: &Credential) -> Result<usize, ConvertError> {
            Ok(tracks.len())
        }
    }

    #[test]
    fn registry_dispatches_by_service() {
        let registry = CatalogRegistry::builder()
            .add(Stub(ServiceKind::Spotify))
            .add(Stub(ServiceKind::Deezer))
            .build()
            .unwrap();

        assert_eq!(registry.get(ServiceKind::Deezer).unwrap().service(), ServiceKind::Deezer);
        assert_eq!(registry.services(), vec![ServiceKind::Spotify, ServiceKind::Deezer]);
        assert!(matches!(
            registry.get(ServiceKind::Tidal),
            Err(ConvertError::UnsupportedService(_))
        ));
    }

    #[test]
    fn empty_registry_is_a_config_error() {
        assert!(matches!(CatalogRegistry::builder().build(), Err(ConvertError::Config(_))));
    }

    #[tokio::test]
    async fn catalog_search_forwards_queries() {
        let stub = Stub(ServiceKind::Spotify);
        let cred = Credential::new(ServiceKind::Spotify, "tok", 3600);
        let search = CatalogSearch::new(&stub, &cred);
        let hits = search.search("isrc:ABC").await.unwrap();
        assert_eq!(hits[0].title, "isrc:ABC");
    }
}
