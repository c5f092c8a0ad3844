//! Recorded-stream replay.
//!
//! A recording is a JSON-lines file with one matcher observation per line:
//!
//! ```text
//! {"frame": 0, "at": "2024-01-10T09:00:00Z", "identity": "Alice", "confidence": 0.9, "region": {"x": 10, "y": 20, "width": 64, "height": 64}}
//! {"frame": 1, "at": "2024-01-10T09:00:05Z", "identity": null, "confidence": 0.3, "region": {"x": 12, "y": 20, "width": 64, "height": 64}}
//! {"frame": 2, "at": "2024-01-10T09:00:06Z", "region": {"x": 0, "y": 0, "width": 8, "height": 8}, "error": "crop out of bounds"}
//! {"frame": 3, "at": "2024-01-10T09:00:07Z"}
//! ```
//!
//! Observations sharing a `frame` number form one frame; the frame's
//! capture time is the `at` of its first observation. A line without a
//! `region` is an empty frame. A line with `error` makes the matcher fail
//! for that region.

use crate::models::{BoundingBox, Identity, IdentityCandidate};
use crate::services::{DEFAULT_ACCEPTANCE_THRESHOLD, Frame, FrameSource, Matcher, RegionDetector};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One line of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Frame number.
    pub frame: u64,
    /// Capture time.
    pub at: DateTime<Utc>,
    /// Matched name, or null for the unknown-marker.
    #[serde(default)]
    pub identity: Option<String>,
    /// Matcher confidence.
    #[serde(default)]
    pub confidence: f32,
    /// Region the observation belongs to; absent for an empty frame.
    #[serde(default)]
    pub region: Option<BoundingBox>,
    /// Matcher failure message for this region.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct RecordedFrame {
    captured_at: DateTime<Utc>,
    observations: Vec<Observation>,
}

/// A parsed recording that acts as detector and matcher for its frames.
#[derive(Debug, Clone)]
pub struct Recording {
    frames: BTreeMap<u64, RecordedFrame>,
    acceptance_threshold: f32,
}

impl Recording {
    /// Opens and parses a recording file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the file cannot be read and
    /// [`Error::InvalidInput`] for a malformed line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::OperationFailed {
            operation: "open_recording".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parses a recording from a reader.
    ///
    /// Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the 1-based line number of the
    /// first malformed line.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut frames: BTreeMap<u64, RecordedFrame> = BTreeMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_number = idx + 1;
            let line = line.map_err(|e| Error::OperationFailed {
                operation: "read_recording".to_string(),
                cause: e.to_string(),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let observation: Observation = serde_json::from_str(trimmed).map_err(|e| {
                Error::InvalidInput(format!("Line {line_number}: Failed to parse observation: {e}"))
            })?;
            if !observation.confidence.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "Line {line_number}: confidence must be a finite number"
                )));
            }

            frames
                .entry(observation.frame)
                .or_insert_with(|| RecordedFrame {
                    captured_at: observation.at,
                    observations: Vec::new(),
                })
                .observations
                .push(observation);
        }

        tracing::debug!(frames = frames.len(), "Recording loaded");
        Ok(Self {
            frames,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
        })
    }

    /// Sets the threshold this recording's matcher reports.
    #[must_use]
    pub const fn with_acceptance_threshold(mut self, threshold: f32) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if the recording has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns a frame source over the recording, in frame-number order.
    #[must_use]
    pub fn frames(&self) -> ReplayFrames {
        ReplayFrames {
            frames: self
                .frames
                .iter()
                .map(|(index, recorded)| Frame {
                    index: *index,
                    captured_at: recorded.captured_at,
                })
                .collect::<Vec<_>>()
                .into_iter(),
        }
    }

    fn observations(&self, frame: &Frame) -> &[Observation] {
        self.frames
            .get(&frame.index)
            .map(|recorded| recorded.observations.as_slice())
            .unwrap_or_default()
    }
}

impl RegionDetector for Recording {
    fn detect(&self, frame: &Frame) -> Vec<BoundingBox> {
        let mut regions: Vec<BoundingBox> = Vec::new();
        for region in self.observations(frame).iter().filter_map(|o| o.region) {
            if !regions.contains(&region) {
                regions.push(region);
            }
        }
        regions
    }
}

impl Matcher for Recording {
    fn acceptance_threshold(&self) -> f32 {
        self.acceptance_threshold
    }

    fn match_region(&self, frame: &Frame, region: &BoundingBox) -> Result<Vec<IdentityCandidate>> {
        let in_region = self
            .observations(frame)
            .iter()
            .filter(|o| o.region.as_ref() == Some(region));

        let mut candidates = Vec::new();
        for observation in in_region {
            if let Some(message) = &observation.error {
                return Err(Error::MatcherFailed(format!(
                    "frame {}: {message}",
                    frame.index
                )));
            }
            candidates.push(IdentityCandidate {
                identity: Identity::from(observation.identity.clone()),
                confidence: observation.confidence,
                region: *region,
            });
        }
        Ok(candidates)
    }
}

/// Frame source over a [`Recording`].
#[derive(Debug)]
pub struct ReplayFrames {
    frames: std::vec::IntoIter<Frame>,
}

impl FrameSource for ReplayFrames {
    fn next_frame(&mut self) -> Option<Frame> {
        self.frames.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
{"frame": 1, "at": "2024-01-10T09:00:05Z", "identity": "Alice", "confidence": 0.88, "region": {"x": 1, "y": 1, "width": 10, "height": 10}}
{"frame": 0, "at": "2024-01-10T09:00:00Z", "identity": "Alice", "confidence": 0.9, "region": {"x": 1, "y": 1, "width": 10, "height": 10}}
{"frame": 0, "at": "2024-01-10T09:00:00Z", "identity": null, "confidence": 0.3, "region": {"x": 50, "y": 1, "width": 10, "height": 10}}

{"frame": 2, "at": "2024-01-10T09:00:06Z", "region": {"x": 0, "y": 0, "width": 8, "height": 8}, "error": "crop out of bounds"}
{"frame": 3, "at": "2024-01-10T09:00:07Z"}
"#;

    fn recording() -> Recording {
        Recording::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_frames_are_ordered_by_number() {
        let recording = recording();
        assert_eq!(recording.len(), 4);

        let mut frames = recording.frames();
        let first = frames.next_frame().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.captured_at.to_rfc3339(), "2024-01-10T09:00:00+00:00");
        assert_eq!(frames.next_frame().unwrap().index, 1);
        assert_eq!(frames.next_frame().unwrap().index, 2);
        assert_eq!(frames.next_frame().unwrap().index, 3);
        assert!(frames.next_frame().is_none());
    }

    #[test]
    fn test_detect_and_match() {
        let recording = recording();
        let frame = recording.frames().next_frame().unwrap();

        let regions = recording.detect(&frame);
        assert_eq!(regions.len(), 2);

        let alice = recording.match_region(&frame, &regions[0]).unwrap();
        assert_eq!(alice, vec![IdentityCandidate::known("Alice", 0.9, regions[0])]);

        let unknown = recording.match_region(&frame, &regions[1]).unwrap();
        assert!(unknown[0].identity.is_unknown());

        let elsewhere = BoundingBox::new(99, 99, 1, 1);
        assert!(recording.match_region(&frame, &elsewhere).unwrap().is_empty());
    }

    #[test]
    fn test_error_line_fails_matcher() {
        let recording = recording();
        let mut frames = recording.frames();
        frames.next_frame();
        frames.next_frame();
        let broken = frames.next_frame().unwrap();

        let region = recording.detect(&broken)[0];
        let result = recording.match_region(&broken, &region);
        assert!(matches!(result, Err(Error::MatcherFailed(ref m)) if m.contains("crop out of bounds")));
    }

    #[test]
    fn test_empty_frame_has_no_regions() {
        let recording = recording();
        let empty = recording.frames().last_frame();
        assert!(recording.detect(&empty).is_empty());
    }

    #[test]
    fn test_malformed_line_reports_number() {
        let input = "{\"frame\": 0, \"at\": \"2024-01-10T09:00:00Z\"}\nnot json\n";
        let err = Recording::from_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m.starts_with("Line 2:")));
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let input = "{\"frame\": 0, \"at\": \"yesterday\"}\n";
        assert!(matches!(
            Recording::from_reader(input.as_bytes()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let recording = recording().with_acceptance_threshold(0.8);
        assert!((recording.acceptance_threshold() - 0.8).abs() < f32::EPSILON);
    }

    impl ReplayFrames {
        fn last_frame(mut self) -> Frame {
            let mut last = self.next_frame().unwrap();
            while let Some(frame) = self.next_frame() {
                last = frame;
            }
            last
        }
    }
}
