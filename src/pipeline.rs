//! End-to-end track analysis.
//!
//! One left-to-right pass feeds the classifier; each completed Resting
//! interval gets a centroid and a POI lookup. Active intervals never
//! trigger a lookup. Output is ordered by interval start time.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::info;
use serde::{Deserialize, Serialize};

use crate::classifier::{Interval, StateClassifier};
use crate::cluster::centroid;
use crate::resolver::{PoiResolver, ReverseGeocoder};
use crate::{ClassifierConfig, GpsPoint, ResolverConfig, Result, TrackPoint};

/// A resolved (or degraded) resting visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Arithmetic-mean coordinate of the resting interval
    pub centroid: GpsPoint,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: f64,
    /// Best candidate place name; `None` when nothing was found nearby
    /// or the lookup degraded
    pub name: Option<String>,
    /// All candidate names returned by the POI service
    pub candidates: Vec<String>,
    /// False when the lookup failed after exhausting its retry budget
    pub resolved: bool,
}

impl PointOfInterest {
    fn from_lookup(interval: &Interval, center: GpsPoint, names: Option<Vec<String>>) -> Self {
        let resolved = names.is_some();
        let candidates = names.unwrap_or_default();
        Self {
            centroid: center,
            start_time: interval.start_time(),
            end_time: interval.end_time(),
            duration_secs: interval.duration_secs(),
            name: candidates.first().cloned(),
            candidates,
            resolved,
        }
    }

    /// openstreetmap.org permalink for the visit location.
    pub fn osm_link(&self) -> String {
        crate::geo_utils::osm_link(&self.centroid)
    }
}

/// Full analysis output: resolved visits plus the raw interval list,
/// for callers that render resting extents or movement traces.
#[derive(Debug, Clone)]
pub struct TrackAnalysis {
    pub visits: Vec<PointOfInterest>,
    pub intervals: Vec<Interval>,
}

/// Post-processing hook for merging near-duplicate visits within a time
/// window. Deliberately a no-op today; visits pass through unchanged.
pub fn dedup_visits(visits: Vec<PointOfInterest>) -> Vec<PointOfInterest> {
    visits
}

/// Orchestrates classification, clustering, and POI resolution.
///
/// Configuration is validated at construction; a built pipeline has no
/// fatal error paths of its own.
pub struct Pipeline<G> {
    classifier_config: ClassifierConfig,
    resolver: PoiResolver<G>,
    max_concurrent_lookups: usize,
}

impl<G: ReverseGeocoder> Pipeline<G> {
    pub fn new(
        classifier_config: ClassifierConfig,
        resolver_config: ResolverConfig,
        geocoder: G,
    ) -> Result<Self> {
        classifier_config.validate()?;
        resolver_config.validate()?;
        Ok(Self {
            classifier_config,
            max_concurrent_lookups: resolver_config.max_concurrent_lookups,
            resolver: PoiResolver::new(geocoder, &resolver_config),
        })
    }

    /// Analyze an ordered track: classify into intervals, then resolve
    /// each resting interval's centroid.
    ///
    /// An empty track yields an empty analysis.
    pub async fn analyze(&self, points: &[TrackPoint]) -> TrackAnalysis {
        let intervals = self.classify(points);
        let visits = dedup_visits(self.resolve_resting(&intervals).await);
        TrackAnalysis { visits, intervals }
    }

    /// Classification pass over the track.
    ///
    /// Inherently sequential: each point's decision depends on the
    /// running mean built from the points before it. A fresh classifier
    /// is used per call; no state crosses track analyses.
    pub fn classify(&self, points: &[TrackPoint]) -> Vec<Interval> {
        let mut classifier = StateClassifier::new(&self.classifier_config);
        let mut intervals = Vec::new();
        for point in points {
            if let Some(interval) = classifier.classify(point.clone()) {
                intervals.push(interval);
            }
        }
        if let Some(interval) = classifier.finish() {
            intervals.push(interval);
        }
        info!(
            "classified {} points into {} intervals",
            points.len(),
            intervals.len()
        );
        intervals
    }

    /// Resolve centroids of resting intervals.
    ///
    /// Lookups for different intervals are independent; a bounded number
    /// run concurrently and results are restored to interval order
    /// before returning.
    async fn resolve_resting(&self, intervals: &[Interval]) -> Vec<PointOfInterest> {
        let jobs = intervals
            .iter()
            .filter(|interval| interval.state.is_resting())
            .enumerate()
            .filter_map(|(idx, interval)| {
                let center = centroid(interval)?;
                Some(async move {
                    let names = self.resolver.resolve(center).await;
                    (idx, PointOfInterest::from_lookup(interval, center, names))
                })
            });

        let mut visits: Vec<(usize, PointOfInterest)> = stream::iter(jobs)
            .buffer_unordered(self.max_concurrent_lookups)
            .collect()
            .await;
        visits.sort_by_key(|(idx, _)| *idx);

        let resolved = visits.iter().filter(|(_, v)| v.resolved).count();
        info!("resolved {}/{} resting intervals", resolved, visits.len());
        visits.into_iter().map(|(_, visit)| visit).collect()
    }
}
