// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection continuity tracking.
//
// Camera autofocus and motion cause single-frame detection dropouts. The
// tracker keeps the last observation through up to `miss_threshold`
// consecutive empty results and clears it on the next one.

use docscan_core::config::TrackerConfig;
use docscan_core::geometry::RectangleObservation;
use tracing::{debug, trace};

/// Logical tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// An observation is held and the overlay is shown.
    Tracking,
    /// No observation; overlay hidden.
    Idle,
}

/// What one detector result did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerTransition {
    /// Idle → Tracking.
    Acquired(RectangleObservation),
    /// Tracking → Tracking with a fresh observation.
    Replaced(RectangleObservation),
    /// Tracking → Tracking, previous observation kept.
    Held { misses: u32 },
    /// Tracking → Idle.
    Cleared,
    /// Idle → Idle.
    Empty,
}

impl TrackerTransition {
    /// Whether the overlay must be redrawn.
    pub fn changes_overlay(&self) -> bool {
        !matches!(self, Self::Held { .. } | Self::Empty)
    }
}

/// Holds the current observation and the consecutive-miss counter.
#[derive(Debug, Clone)]
pub struct DetectionTracker {
    observation: Option<RectangleObservation>,
    misses: u32,
    miss_threshold: u32,
}

impl Default for DetectionTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl DetectionTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            observation: None,
            misses: 0,
            miss_threshold: config.miss_threshold,
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.observation.is_some() {
            TrackerState::Tracking
        } else {
            TrackerState::Idle
        }
    }

    pub fn observation(&self) -> Option<RectangleObservation> {
        self.observation
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    /// Feed one detector result. Only the highest-ranked observation counts.
    pub fn update(&mut self, observations: &[RectangleObservation]) -> TrackerTransition {
        match observations.first() {
            Some(&observation) => {
                let acquired = self.observation.is_none();
                self.observation = Some(observation);
                self.misses = 0;
                if acquired {
                    debug!(confidence = observation.confidence, "Document acquired");
                    TrackerTransition::Acquired(observation)
                } else {
                    TrackerTransition::Replaced(observation)
                }
            }
            None if self.observation.is_none() => TrackerTransition::Empty,
            None if self.misses >= self.miss_threshold => {
                debug!(misses = self.misses, "Document lost");
                self.reset();
                TrackerTransition::Cleared
            }
            None => {
                self.misses += 1;
                trace!(misses = self.misses, "Detection dropout");
                TrackerTransition::Held {
                    misses: self.misses,
                }
            }
        }
    }

    /// Force Idle regardless of the miss counter.
    pub fn reset(&mut self) {
        self.observation = None;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_core::geometry::Point;

    fn observation(offset: f64) -> RectangleObservation {
        RectangleObservation {
            top_left: Point::new(0.2 + offset, 0.8),
            top_right: Point::new(0.8, 0.8),
            bottom_left: Point::new(0.2, 0.2),
            bottom_right: Point::new(0.8, 0.2),
            confidence: 1.0,
        }
    }

    #[test]
    fn five_empties_hold_sixth_clears() {
        let mut tracker = DetectionTracker::default();
        let first = observation(0.0);
        assert_eq!(tracker.update(&[first]), TrackerTransition::Acquired(first));

        for miss in 1..=5 {
            assert_eq!(tracker.update(&[]), TrackerTransition::Held { misses: miss });
            assert_eq!(tracker.observation(), Some(first));
        }
        assert_eq!(tracker.update(&[]), TrackerTransition::Cleared);
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert_eq!(tracker.misses(), 0);
    }

    #[test]
    fn new_observation_resets_misses() {
        let mut tracker = DetectionTracker::default();
        tracker.update(&[observation(0.0)]);
        tracker.update(&[]);
        tracker.update(&[]);
        let next = observation(0.05);
        assert_eq!(tracker.update(&[next]), TrackerTransition::Replaced(next));
        assert_eq!(tracker.misses(), 0);

        for _ in 0..5 {
            tracker.update(&[]);
        }
        assert_eq!(tracker.observation(), Some(next));
    }

    #[test]
    fn reset_dominates_at_every_miss_count() {
        for misses in 0..=5 {
            let mut tracker = DetectionTracker::default();
            tracker.update(&[observation(0.0)]);
            for _ in 0..misses {
                tracker.update(&[]);
            }
            assert_eq!(tracker.misses(), misses);
            tracker.reset();
            assert_eq!(tracker.observation(), None);
            assert_eq!(tracker.misses(), 0);
        }
    }

    #[test]
    fn idle_stays_idle_on_empty() {
        let mut tracker = DetectionTracker::default();
        for _ in 0..10 {
            assert_eq!(tracker.update(&[]), TrackerTransition::Empty);
        }
        assert!(!TrackerTransition::Empty.changes_overlay());
    }

    #[test]
    fn configurable_threshold() {
        let mut tracker = DetectionTracker::new(TrackerConfig { miss_threshold: 0 });
        tracker.update(&[observation(0.0)]);
        assert_eq!(tracker.update(&[]), TrackerTransition::Cleared);
    }
}
