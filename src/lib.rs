//! # Stopover
//!
//! GPS track stop detection and point-of-interest resolution.
//!
//! Feed an ordered, timestamped GPS track through a four-stage pipeline:
//! running-speed state detection with hysteresis, interval buffering,
//! centroid clustering of resting intervals, and reverse lookup of each
//! centroid against an external POI service with bounded 429 retries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use stopover::{ClassifierConfig, OverpassClient, Pipeline, ResolverConfig, TrackPoint};
//!
//! # async fn run(points: Vec<TrackPoint>) -> stopover::Result<()> {
//! let resolver_config = ResolverConfig::default();
//! let geocoder = OverpassClient::new(&resolver_config)?;
//! let pipeline = Pipeline::new(ClassifierConfig::default(), resolver_config, geocoder)?;
//!
//! let analysis = pipeline.analyze(&points).await;
//! for visit in &analysis.visits {
//!     println!(
//!         "{} for {:.0}s: {}",
//!         visit.centroid.latitude,
//!         visit.duration_secs,
//!         visit.name.as_deref().unwrap_or("(unresolved)")
//!     );
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, StopoverError};

// Geographic utilities (distance, map links)
pub mod geo_utils;

// Rolling speed window
pub mod window;
pub use window::SpeedWindow;

// State classification (hysteresis) and interval buffering
pub mod classifier;
pub use classifier::{
    Hysteresis, Interval, IntervalBuffer, StateClassifier, TrackState, TransitionPolicy,
    TravelStats,
};

// Centroid clustering of resting intervals
pub mod cluster;
pub use cluster::centroid;

// POI lookup adapter with bounded retry
pub mod resolver;
pub use resolver::{OverpassClient, PoiResolver, ReverseGeocoder};

// End-to-end orchestration
pub mod pipeline;
pub use pipeline::{Pipeline, PointOfInterest, TrackAnalysis};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One timestamped, geolocated track sample.
///
/// Produced by an external track parser; consumed read-only here. Points
/// are expected in non-decreasing time order and are never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Instantaneous speed in m/s when the source carries one; derived
    /// from displacement otherwise.
    pub speed: Option<f64>,
    /// Horizontal dilution of precision, when the source carries one.
    pub hdop: Option<f64>,
}

impl TrackPoint {
    pub fn new(time: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            time,
            latitude,
            longitude,
            speed: None,
            hdop: None,
        }
    }

    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the state classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Number of instantaneous speeds in the rolling window.
    /// Default: 45 (about 45s of 1 Hz samples)
    pub window_capacity: usize,

    /// Mean speed below which an Active track is considered at rest (m/s).
    /// Default: 0.3
    pub t_resting: f64,

    /// Mean speed above which a Resting track is considered moving (m/s).
    /// Must be above `t_resting`. Default: 0.8
    pub t_active: f64,

    /// Shortest time delta from which a speed may be derived (seconds).
    /// Deltas below this are skipped rather than producing an unbounded
    /// speed. Default: 0.5
    pub min_speed_interval_secs: f64,

    /// Longest time delta from which a derived speed is trusted (seconds).
    /// Default: 300
    pub unreliable_gap_secs: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_capacity: 45,
            t_resting: 0.3,
            t_active: 0.8,
            min_speed_interval_secs: 0.5,
            unreliable_gap_secs: 300.0,
        }
    }
}

impl ClassifierConfig {
    /// Validate threshold ordering and window size.
    ///
    /// Invalid values are rejected here, at construction, never deep
    /// inside the classification loop.
    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(StopoverError::ConfigError {
                message: "window_capacity must be at least 1".to_string(),
            });
        }
        if !(self.t_resting >= 0.0 && self.t_resting.is_finite() && self.t_active.is_finite()) {
            return Err(StopoverError::ConfigError {
                message: "speed thresholds must be finite and non-negative".to_string(),
            });
        }
        if self.t_resting >= self.t_active {
            return Err(StopoverError::ConfigError {
                message: format!(
                    "t_resting ({}) must be below t_active ({})",
                    self.t_resting, self.t_active
                ),
            });
        }
        if self.min_speed_interval_secs <= 0.0 || self.unreliable_gap_secs <= 0.0 {
            return Err(StopoverError::ConfigError {
                message: "speed-derivation time bounds must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for POI resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Overpass API endpoint.
    pub endpoint: String,

    /// Search radius around the centroid in meters. Default: 25
    pub search_radius_m: f64,

    /// Retries after a 429 before an interval degrades to unresolved.
    /// Default: 3
    pub max_retries: u32,

    /// Base backoff after a 429; doubles per consecutive 429.
    /// Default: 1s
    pub backoff: Duration,

    /// Per-request timeout. Default: 30s
    pub timeout: Duration,

    /// Concurrent lookups across different resting intervals.
    /// Default: 4
    pub max_concurrent_lookups: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://overpass-api.de/api/interpreter".to_string(),
            search_radius_m: 25.0,
            max_retries: 3,
            backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            max_concurrent_lookups: 4,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(StopoverError::ConfigError {
                message: "endpoint must not be empty".to_string(),
            });
        }
        if self.search_radius_m <= 0.0 {
            return Err(StopoverError::ConfigError {
                message: "search_radius_m must be positive".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(StopoverError::ConfigError {
                message: "max_retries must be at least 1".to_string(),
            });
        }
        if self.max_concurrent_lookups == 0 {
            return Err(StopoverError::ConfigError {
                message: "max_concurrent_lookups must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
