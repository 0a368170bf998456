#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Local reverse geocoder over the GeoNames dumps.
//!
//! Given one or more `(latitude, longitude)` points, returns the k
//! nearest cities enriched with the administrative hierarchy
//! (country → admin1 → admin2 → admin3 → admin4) and per-language
//! alternate names. No network call happens at query time: the five
//! GeoNames dump files are fetched once per UTC day, cached on disk, and
//! held in memory behind a k-d tree.
//!
//! # Architecture
//!
//! - **Init time**: five pipelines run concurrently, each a dump-cache
//!   fetch followed by a parse on a blocking thread. Four of them
//!   populate hash side tables; the cities pipeline feeds the corpus
//!   that the k-d tree is built over. Initialization completes when the
//!   last enabled pipeline does.
//! - **Query time**: each point runs a k-nearest query against the tree;
//!   every hit is decorated with the side-table lookups and its
//!   haversine distance. The index is build-once read-many, so lookups
//!   need no locking.
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use revgeo_geocoder::{GeocoderConfig, Point, ReverseGeocoder};
//!
//! let geocoder = ReverseGeocoder::init(GeocoderConfig::default()).await?;
//! let results = geocoder.lookup(&[Point::new(48.466_667, 9.133_333)], 1);
//! if let Some(Some(hits)) = results.first() {
//!     for hit in hits {
//!         println!("{} ({:.2} km)", hit.name, hit.distance);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod dump;
mod lookup;
pub mod parse;
pub mod shared;

use std::collections::HashMap;
use std::time::Instant;

use dump::DumpCache;
use revgeo_kdtree::KdTree;

pub use revgeo_geocoder_models::{
    AdminCode, AdminEntry, AlternateName, AlternateNamesMap, CitiesFile, CityRecord, ConfigError,
    GeocodedCity, GeocoderConfig, IndexedCity, LoadOptions, Point,
};

/// Errors from geocoder initialization.
#[derive(Debug, thiserror::Error)]
pub enum GeocoderError {
    /// Configuration rejected before any I/O.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dump fetch or cache error.
    #[error("Dump error: {0}")]
    Dump(#[from] dump::DumpError),

    /// Dump file parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] parse::ParseError),

    /// Async task join error.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The in-memory reverse geocoding engine.
///
/// Constructed once by [`ReverseGeocoder::init`] and immutable
/// afterwards, so it can be read from any number of threads without
/// locking. The engine is a plain value the caller owns; a process-wide
/// singleton convenience layer lives in [`shared`].
pub struct ReverseGeocoder {
    corpus: Vec<IndexedCity>,
    tree: KdTree,
    tables: lookup::SideTables,
}

impl ReverseGeocoder {
    /// Fetches (or reuses) the configured dumps, parses them, and builds
    /// the in-memory index.
    ///
    /// The five pipelines run concurrently; the first failure aborts
    /// initialization. Pipelines disabled by `config.load` resolve
    /// immediately with no contribution.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid configuration, download or filesystem
    /// failure, or an unexpected archive layout. Malformed dump rows are
    /// not errors; they are skipped during parsing.
    pub async fn init(config: GeocoderConfig) -> Result<Self, GeocoderError> {
        config.validate()?;

        let start = Instant::now();
        log::info!(
            "Initializing reverse geocoder (dump cache at {})",
            config.dump_directory.display()
        );

        let cache = DumpCache::new(config.geonames_url.clone())?;

        let (corpus, admin1, admin2, admin3_and_4, alternate_names) = tokio::try_join!(
            load_cities(&cache, &config),
            load_admin_codes(&cache, &config, AdminLevel::Admin1),
            load_admin_codes(&cache, &config, AdminLevel::Admin2),
            load_admin3_and_4(&cache, &config),
            load_alternate_names(&cache, &config),
        )?;

        let (admin3, admin4) = match admin3_and_4 {
            Some((admin3, admin4)) => (Some(admin3), Some(admin4)),
            None => (None, None),
        };

        log::info!("Building k-d tree over {} cities...", corpus.len());
        let coords: Vec<(f64, f64)> = corpus
            .iter()
            .map(|city| (city.latitude, city.longitude))
            .collect();
        let tree = tokio::task::spawn_blocking(move || KdTree::build(&coords)).await?;

        log::info!(
            "Reverse geocoder ready: {} cities indexed in {:.1}s",
            corpus.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(Self {
            corpus,
            tree,
            tables: lookup::SideTables {
                admin1,
                admin2,
                admin3,
                admin4,
                alternate_names,
            },
        })
    }

    /// Looks up the nearest cities for a batch of points.
    ///
    /// The output aligns 1-to-1 with the input: each slot holds up to
    /// `max_results` decorated records sorted nearest-first, or `None`
    /// when that point has a non-finite coordinate.
    #[must_use]
    pub fn lookup(&self, points: &[Point], max_results: usize) -> Vec<Option<Vec<GeocodedCity>>> {
        points
            .iter()
            .map(|point| self.lookup_point(*point, max_results))
            .collect()
    }

    /// Looks up the nearest cities for a single point.
    ///
    /// Returns `None` when the point has a non-finite coordinate.
    #[must_use]
    pub fn lookup_point(&self, point: Point, max_results: usize) -> Option<Vec<GeocodedCity>> {
        if !point.is_well_formed() {
            return None;
        }

        let hits = self
            .tree
            .nearest(point.latitude, point.longitude, max_results);

        Some(
            hits.into_iter()
                .map(|neighbor| {
                    lookup::decorate(
                        &self.corpus[neighbor.index],
                        neighbor.distance_km,
                        &self.tables,
                    )
                })
                .collect(),
        )
    }

    /// Looks up the single nearest city. Shorthand for
    /// [`lookup_point`](Self::lookup_point) with `max_results = 1`.
    #[must_use]
    pub fn lookup_one(&self, point: Point) -> Option<Vec<GeocodedCity>> {
        self.lookup_point(point, 1)
    }

    /// Number of cities in the index.
    #[must_use]
    pub const fn num_cities(&self) -> usize {
        self.corpus.len()
    }
}

/// Which of the two shared-schema admin code dumps to load.
#[derive(Debug, Clone, Copy)]
enum AdminLevel {
    Admin1,
    Admin2,
}

impl AdminLevel {
    const fn enabled(self, load: &LoadOptions) -> bool {
        match self {
            Self::Admin1 => load.admin1,
            Self::Admin2 => load.admin2,
        }
    }

    const fn folder(self) -> &'static str {
        match self {
            Self::Admin1 => "admin1_codes",
            Self::Admin2 => "admin2_codes",
        }
    }

    const fn base_name(self) -> &'static str {
        match self {
            Self::Admin1 => "admin1CodesASCII",
            Self::Admin2 => "admin2Codes",
        }
    }
}

/// Cities pipeline: the cities dump, or per-country dumps when
/// configured.
async fn load_cities(
    cache: &DumpCache,
    config: &GeocoderConfig,
) -> Result<Vec<IndexedCity>, GeocoderError> {
    if config.countries.is_empty() {
        let base = config.cities_file.as_str();
        let folder = config.dump_directory.join("cities");
        let path = cache
            .ensure(
                &folder,
                base,
                &format!("{base}.zip"),
                Some(&format!("{base}.txt")),
            )
            .await?;

        let cities =
            tokio::task::spawn_blocking(move || parse::parse_cities(&path, false)).await??;
        log::info!("Loaded {} cities from {base}", cities.len());
        return Ok(cities);
    }

    // Each pipeline owns its country code; the dumps land under
    // per-country folders and load concurrently.
    let pipelines = config
        .countries
        .iter()
        .map(|country| load_country(cache, &config.dump_directory, country.to_uppercase()));

    let per_country = futures::future::try_join_all(pipelines).await?;
    Ok(per_country.into_iter().flatten().collect())
}

/// One per-country pipeline: fetch `<CC>.zip`, keep its populated places.
async fn load_country(
    cache: &DumpCache,
    dump_directory: &std::path::Path,
    country: String,
) -> Result<Vec<IndexedCity>, GeocoderError> {
    let folder = dump_directory.join(&country);
    let path = cache
        .ensure(
            &folder,
            &country,
            &format!("{country}.zip"),
            Some(&format!("{country}.txt")),
        )
        .await?;

    let cities = tokio::task::spawn_blocking(move || parse::parse_cities(&path, true)).await??;
    log::info!("Loaded {} places from {country}", cities.len());
    Ok(cities)
}

/// Admin1/admin2 pipeline (shared schema).
async fn load_admin_codes(
    cache: &DumpCache,
    config: &GeocoderConfig,
    level: AdminLevel,
) -> Result<Option<HashMap<String, AdminEntry>>, GeocoderError> {
    if !level.enabled(&config.load) {
        return Ok(None);
    }

    let folder = config.dump_directory.join(level.folder());
    let base = level.base_name();
    let path = cache
        .ensure(&folder, base, &format!("{base}.txt"), None)
        .await?;

    let table = tokio::task::spawn_blocking(move || parse::parse_admin_codes(&path)).await??;
    log::info!("Loaded {} {base} entries", table.len());
    Ok(Some(table))
}

/// Admin3/admin4 pipeline: one scan of the allCountries dump.
async fn load_admin3_and_4(
    cache: &DumpCache,
    config: &GeocoderConfig,
) -> Result<Option<parse::Admin3And4>, GeocoderError> {
    if !config.load.admin3_and_4 {
        return Ok(None);
    }

    let folder = config.dump_directory.join("all_countries");
    let path = cache
        .ensure(
            &folder,
            "allCountries",
            "allCountries.zip",
            Some("allCountries.txt"),
        )
        .await?;

    let tables = tokio::task::spawn_blocking(move || parse::parse_admin3_and_4(&path)).await??;
    Ok(Some(tables))
}

/// Alternate names pipeline.
async fn load_alternate_names(
    cache: &DumpCache,
    config: &GeocoderConfig,
) -> Result<Option<AlternateNamesMap>, GeocoderError> {
    if !config.load.alternate_names {
        return Ok(None);
    }

    let folder = config.dump_directory.join("alternate_names");
    let path = cache
        .ensure(
            &folder,
            "alternateNames",
            "alternateNames.zip",
            Some("alternateNames.txt"),
        )
        .await?;

    let names = tokio::task::spawn_blocking(move || parse::parse_alternate_names(&path)).await??;
    log::info!("Loaded alternate names for {} entities", names.len());
    Ok(Some(names))
}
