#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the reverse geocoder server.
//!
//! Geocoding results themselves serialize straight from the engine's
//! record types; this crate only carries the envelope shapes.

use serde::{Deserialize, Serialize};

/// Health status for `/healthcheck` and `/deep-healthcheck`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the surface answering is healthy.
    pub healthy: bool,
    /// Server crate version.
    pub version: String,
}

/// Error envelope for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable description of what was rejected.
    pub error: String,
}

impl ApiError {
    /// Builds an error envelope from any displayable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
