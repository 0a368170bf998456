#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the GeoNames reverse geocoder.
//!
//! This crate contains only data types, configuration structs, and simple
//! conversions. It has no heavyweight dependencies (no HTTP, no I/O).
//!
//! The wire types serialize to the same camelCase JSON shape the GeoNames
//! column names suggest (`geoNameId`, `asciiName`, `admin1Code`, ...), and
//! [`AdminCode`] preserves the string-or-object duality of decorated
//! results: a raw code serializes as a bare string (or `null`), a resolved
//! code as a `{name, asciiName, geoNameId}` object.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A query point in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in decimal degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180).
    pub longitude: f64,
}

impl Point {
    /// Constructs a new point from coordinates.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both coordinates are finite numbers.
    ///
    /// Points that fail this test yield a `null` result slot from the
    /// query engine rather than an error.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// One row of a GeoNames cities dump (19 tab-separated columns).
///
/// Columns that may be empty in the dump are `Option`s; an empty column
/// maps to `None`, never to an empty string. Latitude and longitude are
/// retained as the raw column text for wire compatibility; the parsed
/// floats live on [`IndexedCity`] and are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityRecord {
    /// Unique GeoNames identifier.
    #[serde(rename = "geoNameId")]
    pub geoname_id: String,
    /// Name of the geographical point (UTF-8).
    pub name: String,
    /// Name in plain ASCII characters.
    pub ascii_name: String,
    /// Comma-separated alternate names (raw column text).
    pub alternate_names: Option<String>,
    /// Latitude in decimal degrees, as written in the dump.
    pub latitude: String,
    /// Longitude in decimal degrees, as written in the dump.
    pub longitude: String,
    /// Feature class (one character, e.g. `P` for populated places).
    pub feature_class: String,
    /// Feature code (e.g. `PPL`, `ADM3`).
    pub feature_code: String,
    /// ISO-3166 alpha-2 country code.
    pub country_code: String,
    /// Comma-separated alternate country codes.
    pub cc2: Option<String>,
    /// First-level administrative code.
    pub admin1_code: Option<String>,
    /// Second-level administrative code.
    pub admin2_code: Option<String>,
    /// Third-level administrative code.
    pub admin3_code: Option<String>,
    /// Fourth-level administrative code.
    pub admin4_code: Option<String>,
    /// Population count (raw column text).
    pub population: String,
    /// Elevation in meters.
    pub elevation: Option<String>,
    /// Digital elevation model value.
    pub dem: String,
    /// IANA timezone identifier.
    pub timezone: String,
    /// Date of last modification (`yyyy-MM-dd`).
    pub modification_date: String,
}

/// A city record paired with its parsed coordinates.
///
/// Only records whose latitude and longitude parse as finite floats make
/// it into the corpus, so these fields are always valid.
#[derive(Debug, Clone)]
pub struct IndexedCity {
    /// The full 19-column record.
    pub record: CityRecord,
    /// Parsed latitude.
    pub latitude: f64,
    /// Parsed longitude.
    pub longitude: f64,
}

/// A node in the administrative hierarchy (admin1 through admin4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEntry {
    /// Display name of the division.
    pub name: String,
    /// ASCII name of the division.
    pub ascii_name: String,
    /// GeoNames identifier of the division.
    #[serde(rename = "geoNameId")]
    pub geoname_id: String,
}

/// An administrative code field on a decorated result.
///
/// Starts out as the raw code string from the dump and is replaced by the
/// resolved hierarchy entry when the matching side table has one. The
/// untagged serialization keeps the output wire-compatible: either a bare
/// string (or `null` for an empty column) or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdminCode {
    /// The resolved `{name, asciiName, geoNameId}` hierarchy entry.
    Resolved(AdminEntry),
    /// The raw code string from the dump (`None` for an empty column).
    Raw(Option<String>),
}

impl AdminCode {
    /// Returns `true` if this code was resolved against a side table.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// A single alternate name for a `geoNameId` in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternateName {
    /// The name variant.
    pub alt_name: String,
    /// Whether this is the official/preferred name.
    pub is_preferred_name: bool,
    /// Whether this is a short form.
    pub is_short_name: bool,
    /// Whether this is a colloquial or slang term.
    pub is_colloquial: bool,
    /// Whether this name is historic.
    pub is_historic: bool,
}

/// Alternate names keyed `geoNameId -> isoLanguage -> name`.
pub type AlternateNamesMap = HashMap<String, HashMap<String, AlternateName>>;

/// A fully decorated reverse-geocoding result.
///
/// Carries the city columns, the four admin code fields (raw or resolved),
/// the per-language alternate names when loaded, and the haversine
/// distance from the query point in kilometers (computed at query time).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedCity {
    /// Unique GeoNames identifier.
    #[serde(rename = "geoNameId")]
    pub geoname_id: String,
    /// Name of the city.
    pub name: String,
    /// ASCII name of the city.
    pub ascii_name: String,
    /// Comma-separated alternate names (raw column text).
    pub alternate_names: Option<String>,
    /// Latitude as written in the dump.
    pub latitude: String,
    /// Longitude as written in the dump.
    pub longitude: String,
    /// Feature class.
    pub feature_class: String,
    /// Feature code.
    pub feature_code: String,
    /// ISO-3166 alpha-2 country code.
    pub country_code: String,
    /// Comma-separated alternate country codes.
    pub cc2: Option<String>,
    /// First-level admin code, raw or resolved.
    pub admin1_code: AdminCode,
    /// Second-level admin code, raw or resolved.
    pub admin2_code: AdminCode,
    /// Third-level admin code, raw or resolved.
    pub admin3_code: AdminCode,
    /// Fourth-level admin code, raw or resolved.
    pub admin4_code: AdminCode,
    /// Population count.
    pub population: String,
    /// Elevation in meters.
    pub elevation: Option<String>,
    /// Digital elevation model value.
    pub dem: String,
    /// IANA timezone identifier.
    pub timezone: String,
    /// Date of last modification.
    pub modification_date: String,
    /// Per-language alternate names, attached when the table is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_name: Option<HashMap<String, AlternateName>>,
    /// Haversine distance from the query point in kilometers.
    pub distance: f64,
}

impl GeocodedCity {
    /// Builds an undecorated result from a city record: all admin codes
    /// raw, no alternate names, distance zero.
    #[must_use]
    pub fn from_record(record: &CityRecord) -> Self {
        Self {
            geoname_id: record.geoname_id.clone(),
            name: record.name.clone(),
            ascii_name: record.ascii_name.clone(),
            alternate_names: record.alternate_names.clone(),
            latitude: record.latitude.clone(),
            longitude: record.longitude.clone(),
            feature_class: record.feature_class.clone(),
            feature_code: record.feature_code.clone(),
            country_code: record.country_code.clone(),
            cc2: record.cc2.clone(),
            admin1_code: AdminCode::Raw(record.admin1_code.clone()),
            admin2_code: AdminCode::Raw(record.admin2_code.clone()),
            admin3_code: AdminCode::Raw(record.admin3_code.clone()),
            admin4_code: AdminCode::Raw(record.admin4_code.clone()),
            population: record.population.clone(),
            elevation: record.elevation.clone(),
            dem: record.dem.clone(),
            timezone: record.timezone.clone(),
            modification_date: record.modification_date.clone(),
            alternate_name: None,
            distance: 0.0,
        }
    }
}

/// Which cities dump feeds the corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitiesFile {
    /// All cities with a population > 500.
    Cities500,
    /// All cities with a population > 1000 (the default).
    #[default]
    Cities1000,
    /// All cities with a population > 5000.
    Cities5000,
    /// All cities with a population > 15000.
    Cities15000,
}

impl CitiesFile {
    /// The dump base name as it appears on the GeoNames server.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cities500 => "cities500",
            Self::Cities1000 => "cities1000",
            Self::Cities5000 => "cities5000",
            Self::Cities15000 => "cities15000",
        }
    }
}

impl std::str::FromStr for CitiesFile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cities500" => Ok(Self::Cities500),
            "cities1000" => Ok(Self::Cities1000),
            "cities5000" => Ok(Self::Cities5000),
            "cities15000" => Ok(Self::Cities15000),
            other => Err(ConfigError::UnknownCitiesFile(other.to_string())),
        }
    }
}

impl std::fmt::Display for CitiesFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side tables to load during initialization.
///
/// A disabled table is simply absent from the engine and decoration for
/// that level is skipped silently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Load the admin1 code table.
    pub admin1: bool,
    /// Load the admin2 code table.
    pub admin2: bool,
    /// Load admin3 and admin4 (requires the allCountries dump).
    pub admin3_and_4: bool,
    /// Load the alternate names table.
    pub alternate_names: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            admin1: true,
            admin2: true,
            admin3_and_4: true,
            alternate_names: true,
        }
    }
}

/// Default base URL of the GeoNames dump export.
pub const DEFAULT_GEONAMES_URL: &str = "https://download.geonames.org/export/dump";

/// Configuration for [`init`](https://docs.rs/revgeo_geocoder).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Directory for the on-disk dump cache.
    pub dump_directory: PathBuf,
    /// Which cities dump to index.
    pub cities_file: CitiesFile,
    /// When non-empty, per-country dumps replace the cities dump.
    pub countries: Vec<String>,
    /// Which side tables to load.
    pub load: LoadOptions,
    /// Base URL of the GeoNames export (override point for mirrors).
    pub geonames_url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            dump_directory: std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("geonames_dump"),
            cities_file: CitiesFile::default(),
            countries: Vec::new(),
            load: LoadOptions::default(),
            geonames_url: DEFAULT_GEONAMES_URL.to_string(),
        }
    }
}

impl GeocoderConfig {
    /// Validates the configuration before any I/O happens.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCountryCode`] when a `countries`
    /// entry is not a two-letter ASCII code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for country in &self.countries {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::InvalidCountryCode(country.clone()));
            }
        }
        Ok(())
    }
}

/// Errors from configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The cities file override names no known dump.
    #[error("Unknown cities file: {0}")]
    UnknownCitiesFile(String),

    /// A countries entry is not a two-letter ISO-3166 code.
    #[error("Invalid country code: {0}")]
    InvalidCountryCode(String),
}
