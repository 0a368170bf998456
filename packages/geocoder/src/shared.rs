//! Process-wide singleton convenience layer.
//!
//! Wraps one [`ReverseGeocoder`] in a `tokio` once-cell. A lookup that
//! arrives before any explicit [`init`] triggers a lazy initialization
//! with the default configuration; callers that arrive while that
//! initialization is in flight await the same future and are served in
//! arrival order once it resolves. The core engine does not depend on
//! this module — it exists for callers that want the classic
//! init-once-then-look-up surface without threading a value around.

use revgeo_geocoder_models::{GeocodedCity, GeocoderConfig, Point};
use tokio::sync::OnceCell;

use crate::{GeocoderError, ReverseGeocoder};

static ENGINE: OnceCell<ReverseGeocoder> = OnceCell::const_new();

/// Initializes the shared engine with the given configuration.
///
/// Only the first call performs work; later calls (and lazy lookups)
/// return the already-built engine regardless of their configuration.
///
/// # Errors
///
/// Returns any [`ReverseGeocoder::init`] error. A failed attempt leaves
/// the cell empty, so a subsequent call may retry.
pub async fn init(config: GeocoderConfig) -> Result<&'static ReverseGeocoder, GeocoderError> {
    ENGINE
        .get_or_try_init(|| ReverseGeocoder::init(config))
        .await
}

/// Looks up a batch of points against the shared engine, lazily
/// initializing it with defaults when needed.
///
/// # Errors
///
/// Returns an error only when the lazy initialization fails.
pub async fn lookup(
    points: &[Point],
    max_results: usize,
) -> Result<Vec<Option<Vec<GeocodedCity>>>, GeocoderError> {
    let engine = ENGINE
        .get_or_try_init(|| ReverseGeocoder::init(GeocoderConfig::default()))
        .await?;
    Ok(engine.lookup(points, max_results))
}

/// Returns the shared engine if it has finished initializing.
#[must_use]
pub fn get() -> Option<&'static ReverseGeocoder> {
    ENGINE.get()
}
