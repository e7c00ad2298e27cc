//! The building fetch service.
//!
//! A [`BuildingService`] is the scope for all shared mutable state: the
//! geometry field cache, the per-dataset LRU of join indexes, and the
//! latest successfully assembled payload. Each call to
//! [`BuildingService::fetch_buildings`] is otherwise independent and may
//! run concurrently with others.
//!
//! The latest payload is replaced on every successful fetch and left
//! untouched by a failed one. [`BuildingService::invalidate`] drops it
//! along with every cached join index.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use building_map_building_models::{BoundingWindow, BuildingsPayload};
use building_map_source::fetch::fetch_window;
use building_map_source::resolver::GeometryFieldResolver;
use building_map_source::socrata::SocrataClient;
use building_map_source::transport::{HttpTransport, ReqwestTransport};
use building_map_source_models::{JoinConfig, RawFeature, SourceConfig};
use building_map_spatial::{IndexCache, JoinIndex};

use crate::BuildingError;
use crate::assemble::{Join, Joins, assemble};

/// Whether zoning and assessed value are joined from their datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Fetch (or reuse) both join indexes and override raw attributes.
    Enabled,
    /// Use raw footprint properties only; join datasets are never
    /// contacted.
    Disabled,
}

/// Fetches, normalizes, and enriches building footprints.
pub struct BuildingService<T> {
    config: SourceConfig,
    client: SocrataClient<T>,
    resolver: GeometryFieldResolver,
    indexes: IndexCache,
    latest: RwLock<Option<Arc<BuildingsPayload>>>,
}

impl BuildingService<ReqwestTransport> {
    /// Creates a service talking to the configured portal over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`BuildingError::Source`] if the HTTP client cannot be
    /// built.
    pub fn from_config(config: SourceConfig) -> Result<Self, BuildingError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(config, transport))
    }
}

impl<T: HttpTransport> BuildingService<T> {
    /// Creates a service using `transport` for every request.
    #[must_use]
    pub fn new(config: SourceConfig, transport: T) -> Self {
        let client = SocrataClient::new(&config.domain, transport);
        let indexes = IndexCache::new(config.index_cache_capacity);

        Self {
            config,
            client,
            resolver: GeometryFieldResolver::new(),
            indexes,
            latest: RwLock::new(None),
        }
    }

    /// The configuration this service was built with.
    #[must_use]
    pub const fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// The underlying portal client.
    #[must_use]
    pub const fn client(&self) -> &SocrataClient<T> {
        &self.client
    }

    /// Fetches and assembles the buildings inside `window`.
    ///
    /// `limit` caps the footprint fetch and defaults to the configured
    /// building limit. With [`JoinMode::Enabled`] the footprints and both
    /// join indexes are fetched concurrently, and every building waits for
    /// both joins before it is finalized. Join indexes are built on the
    /// blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`BuildingError::Source`] if any fetch fails,
    /// [`BuildingError::EmptyResult`] if no footprint is valid, and
    /// [`BuildingError::Join`] if an index build task fails.
    pub async fn fetch_buildings(
        &self,
        window: BoundingWindow,
        limit: Option<u32>,
        mode: JoinMode,
    ) -> Result<Arc<BuildingsPayload>, BuildingError> {
        let limit = limit.unwrap_or(self.config.buildings.limit);

        let (features, joins) = match mode {
            JoinMode::Disabled => (self.fetch_footprints(&window, limit).await?, None),
            JoinMode::Enabled => {
                let (features, zoning, assessment) = tokio::try_join!(
                    self.fetch_footprints(&window, limit),
                    self.join(&self.config.zoning, &window),
                    self.join(&self.config.assessment, &window),
                )?;
                (features, Some(Joins { zoning, assessment }))
            }
        };

        let buildings = assemble(
            &self.config.buildings.id,
            features,
            &window,
            &self.config.fields,
            joins.as_ref(),
        )?;
        let payload = Arc::new(BuildingsPayload::new(window, buildings));

        if let Ok(mut latest) = self.latest.write() {
            *latest = Some(Arc::clone(&payload));
        }

        Ok(payload)
    }

    /// Fetches buildings for the configured default window.
    ///
    /// # Errors
    ///
    /// See [`BuildingService::fetch_buildings`].
    pub async fn fetch_default(
        &self,
        limit: Option<u32>,
        mode: JoinMode,
    ) -> Result<Arc<BuildingsPayload>, BuildingError> {
        self.fetch_buildings(self.config.default_window, limit, mode)
            .await
    }

    /// The most recent successfully assembled payload, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<BuildingsPayload>> {
        self.latest.read().ok()?.clone()
    }

    /// Drops the latest payload and every cached join index.
    pub fn invalidate(&self) {
        if let Ok(mut latest) = self.latest.write() {
            *latest = None;
        }
        self.indexes.clear();
        log::debug!("Invalidated building payload and join index caches");
    }

    async fn fetch_footprints(
        &self,
        window: &BoundingWindow,
        limit: u32,
    ) -> Result<Vec<RawFeature>, BuildingError> {
        Ok(fetch_window(
            &self.client,
            &self.resolver,
            &self.config.buildings,
            window,
            limit,
        )
        .await?)
    }

    async fn join(&self, join: &JoinConfig, window: &BoundingWindow) -> Result<Join, BuildingError> {
        Ok(Join {
            index: self.join_index(join, window).await?,
            attribute: join.attribute.clone(),
        })
    }

    async fn join_index(
        &self,
        join: &JoinConfig,
        window: &BoundingWindow,
    ) -> Result<Arc<JoinIndex>, BuildingError> {
        let dataset = &join.dataset;

        if let Some(index) = self.indexes.get(&dataset.id, window) {
            log::debug!("Join index cache hit for {} within {window}", dataset.id);
            return Ok(index);
        }

        log::debug!("Join index cache miss for {} within {window}", dataset.id);
        let features = fetch_window(
            &self.client,
            &self.resolver,
            dataset,
            window,
            dataset.limit,
        )
        .await?;

        let index = tokio::task::spawn_blocking(move || JoinIndex::build(features)).await?;
        let index = Arc::new(index);
        log::info!(
            "Indexed {} {} polygons ({} discarded)",
            index.len(),
            dataset.id,
            index.discarded()
        );

        self.indexes
            .insert(&dataset.id, window, Arc::clone(&index));
        Ok(index)
    }
}
