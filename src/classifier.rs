//! Running-speed state classification with hysteresis.
//!
//! Consumes track points one at a time, maintains a rolling mean of
//! instantaneous speed, and cuts the track into alternating `Resting` /
//! `Active` intervals. Two distinct thresholds (hysteresis) keep a track
//! hovering near a single cutoff from oscillating state every sample.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::window::SpeedWindow;
use crate::{ClassifierConfig, TrackPoint};

/// Movement state attributed to an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    Resting,
    Active,
}

impl TrackState {
    pub fn is_resting(&self) -> bool {
        matches!(self, TrackState::Resting)
    }
}

/// Aggregate travel stats over an interval's points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelStats {
    /// Sum of pairwise great-circle distances in meters
    pub distance_m: f64,
    /// Wall-clock span in seconds
    pub duration_secs: f64,
    /// distance / duration, or 0 when the duration is zero
    pub average_speed: f64,
}

/// A maximal run of consecutive points attributed to one state.
///
/// Intervals are non-empty by construction: the classifier only flushes a
/// buffer that holds at least one point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interval {
    pub state: TrackState,
    pub points: Vec<TrackPoint>,
}

impl Interval {
    pub fn start_time(&self) -> DateTime<Utc> {
        self.points[0].time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.points[self.points.len() - 1].time
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end_time() - self.start_time()).num_milliseconds() as f64 / 1000.0
    }

    /// Total distance, duration, and average speed across the interval.
    pub fn travel_stats(&self) -> TravelStats {
        let mut distance_m = 0.0;
        for pair in self.points.windows(2) {
            distance_m += haversine_distance(&pair[0].position(), &pair[1].position());
        }
        let duration_secs = self.duration_secs();
        let average_speed = if duration_secs > 0.0 {
            distance_m / duration_secs
        } else {
            0.0
        };
        TravelStats {
            distance_m,
            duration_secs,
            average_speed,
        }
    }
}

/// Growable buffer of points belonging to the in-progress interval.
#[derive(Debug, Clone, Default)]
pub struct IntervalBuffer {
    points: Vec<TrackPoint>,
}

impl IntervalBuffer {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn append(&mut self, point: TrackPoint) {
        self.points.push(point);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Take the accumulated points as a completed interval, emptying the
    /// buffer. Callers guarantee the buffer is non-empty.
    pub fn flush(&mut self, state: TrackState) -> Interval {
        Interval {
            state,
            points: std::mem::take(&mut self.points),
        }
    }
}

/// Decision step mapping a running mean speed to the next state.
///
/// Kept behind a trait so threshold strategies can be swapped without
/// touching the classifier's buffering.
pub trait TransitionPolicy {
    fn next_state(&self, current: TrackState, mean_speed: f64) -> TrackState;
}

/// Two-threshold transition policy.
///
/// While `Resting`, only a mean above `t_active` switches to `Active`;
/// while `Active`, only a mean below `t_resting` switches to `Resting`.
/// Means inside the dead band never transition.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    t_resting: f64,
    t_active: f64,
}

impl Hysteresis {
    pub fn new(t_resting: f64, t_active: f64) -> Self {
        Self {
            t_resting,
            t_active,
        }
    }
}

impl TransitionPolicy for Hysteresis {
    fn next_state(&self, current: TrackState, mean_speed: f64) -> TrackState {
        match current {
            TrackState::Resting if mean_speed > self.t_active => TrackState::Active,
            TrackState::Active if mean_speed < self.t_resting => TrackState::Resting,
            _ => current,
        }
    }
}

/// Incremental state classifier over an ordered point stream.
///
/// One instance per track; no state is shared across analyses. The
/// initial state is `Resting` and the first interval is provisional
/// until the first transition confirms or replaces it.
#[derive(Debug)]
pub struct StateClassifier<P: TransitionPolicy = Hysteresis> {
    policy: P,
    window: SpeedWindow,
    buffer: IntervalBuffer,
    state: TrackState,
    prev: Option<TrackPoint>,
    min_speed_interval_secs: f64,
    unreliable_gap_secs: f64,
}

impl StateClassifier<Hysteresis> {
    /// Classifier with the standard hysteresis policy from `config`.
    pub fn new(config: &ClassifierConfig) -> Self {
        Self::with_policy(config, Hysteresis::new(config.t_resting, config.t_active))
    }
}

impl<P: TransitionPolicy> StateClassifier<P> {
    /// Classifier with a custom transition policy.
    pub fn with_policy(config: &ClassifierConfig, policy: P) -> Self {
        Self {
            policy,
            window: SpeedWindow::new(config.window_capacity),
            buffer: IntervalBuffer::new(),
            state: TrackState::Resting,
            prev: None,
            min_speed_interval_secs: config.min_speed_interval_secs,
            unreliable_gap_secs: config.unreliable_gap_secs,
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Instantaneous speed for a point: the point's own speed field when
    /// present, otherwise displacement over time since the previous point.
    ///
    /// A time delta below `min_speed_interval_secs` would blow the derived
    /// speed up without bound, and one above `unreliable_gap_secs` says
    /// nothing about movement inside the gap; both return `None` and the
    /// window update is skipped for that point. Spurious transitions after
    /// very large gaps remain a known limitation of the heuristic.
    fn instantaneous_speed(&self, point: &TrackPoint) -> Option<f64> {
        if let Some(speed) = point.speed {
            return Some(speed);
        }
        let prev = self.prev.as_ref()?;
        let dt = (point.time - prev.time).num_milliseconds() as f64 / 1000.0;
        // dt <= 0 is guarded independently of the configured lower bound:
        // distance / 0 would be infinite, or NaN with zero displacement,
        // and a NaN pushed into the window never drains out of its sum.
        if dt <= 0.0 || dt < self.min_speed_interval_secs || dt > self.unreliable_gap_secs {
            return None;
        }
        Some(haversine_distance(&prev.position(), &point.position()) / dt)
    }

    /// Feed one point; returns the just-completed interval when the
    /// running mean crosses a threshold.
    ///
    /// Boundary rule: the transition point opens the NEW interval; it is
    /// never the last member of the old one.
    pub fn classify(&mut self, point: TrackPoint) -> Option<Interval> {
        if let Some(speed) = self.instantaneous_speed(&point) {
            self.window.push(speed);
        }
        self.prev = Some(point.clone());

        let next = match self.window.mean() {
            Some(mean) => self.policy.next_state(self.state, mean),
            None => self.state,
        };

        if next != self.state {
            debug!(
                "state transition {:?} -> {:?} at {}",
                self.state, next, point.time
            );
            // An empty buffer means the provisional initial state never
            // accumulated a point; reseed without emitting.
            let completed = if self.buffer.is_empty() {
                None
            } else {
                Some(self.buffer.flush(self.state))
            };
            self.state = next;
            self.buffer.append(point);
            return completed;
        }

        self.buffer.append(point);
        None
    }

    /// Force-flush the trailing interval at end of track.
    pub fn finish(&mut self) -> Option<Interval> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.flush(self.state))
        }
    }
}
