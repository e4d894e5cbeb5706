//! Presence sources and the classifier person filter.
//!
//! The debouncer does not care how a sample was produced.  Anything that can
//! answer "is a person in front of the kiosk right now?" implements
//! [`PresenceSource`].  [`DetectorSource`] adapts an object classifier that
//! returns labelled bounding boxes, keeping only detections that look like a
//! visitor standing close to the screen.

use kiosk_types::{BoundingBox, KioskError, PresenceObservation};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One labelled box returned by an object classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    pub score: f32,
    pub bbox: BoundingBox,
}

/// Decides which detections count as a visitor.
///
/// The width floor filters out people walking past in the background: only a
/// box wide enough to be standing at the kiosk counts.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonFilter {
    pub class: String,
    /// Detections must score strictly above this.
    pub min_score: f32,
    /// Bounding boxes must be strictly wider than this, in pixels.
    pub min_width: f32,
}

impl Default for PersonFilter {
    fn default() -> Self {
        Self {
            class: "person".to_string(),
            min_score: 0.65,
            min_width: 160.0,
        }
    }
}

impl PersonFilter {
    /// The highest-scoring detection that passes the filter.
    pub fn best_match<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        detections
            .iter()
            .filter(|d| {
                d.class == self.class && d.score > self.min_score && d.bbox.width > self.min_width
            })
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }

    /// Collapse a frame's detections into one presence sample.
    pub fn observe(&self, detections: &[Detection]) -> PresenceObservation {
        match self.best_match(detections) {
            Some(d) => PresenceObservation {
                person_seen: true,
                confidence: d.score.clamp(0.0, 1.0),
                bbox: Some(d.bbox),
            },
            None => PresenceObservation::absent(),
        }
    }
}

/// Anything that can be polled for a presence sample.
pub trait PresenceSource: Send {
    /// Stable identifier for this source, e.g. `"front_camera"`.
    fn id(&self) -> &str;

    /// Take one sample.
    ///
    /// # Errors
    ///
    /// Returns [`KioskError::Sensor`]; `permanent: true` means polling should
    /// stop (permission denied, device missing).
    fn sample(&mut self) -> Result<PresenceObservation, KioskError>;
}

/// An object classifier run over the latest camera frame.
pub trait ObjectDetector: Send {
    fn detect(&mut self) -> Result<Vec<Detection>, KioskError>;
}

/// [`PresenceSource`] backed by an [`ObjectDetector`] and a [`PersonFilter`].
pub struct DetectorSource<D> {
    id: String,
    detector: D,
    filter: PersonFilter,
}

impl<D: ObjectDetector> DetectorSource<D> {
    pub fn new(id: impl Into<String>, detector: D, filter: PersonFilter) -> Self {
        Self {
            id: id.into(),
            detector,
            filter,
        }
    }
}

impl<D: ObjectDetector> PresenceSource for DetectorSource<D> {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> Result<PresenceObservation, KioskError> {
        let detections = self.detector.detect()?;
        let observation = self.filter.observe(&detections);
        trace!(source = %self.id, detections = detections.len(), seen = observation.person_seen, "presence sample");
        Ok(observation)
    }
}
