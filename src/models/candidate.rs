//! Matcher output types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity reported by the matcher for one face region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    /// A known student, by name.
    Known(String),
    /// The matcher's unknown-marker: no enrolled identity matched.
    Unknown,
}

impl Identity {
    /// Creates a known identity.
    ///
    /// Surrounding whitespace is trimmed so matcher names key the ledger the
    /// same way roster names do. A blank name is the unknown-marker.
    #[must_use]
    pub fn known(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.trim() {
            "" => Self::Unknown,
            trimmed => Self::Known(trimmed.to_string()),
        }
    }

    /// Returns the student name for known identities.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Known(name) => Some(name),
            Self::Unknown => None,
        }
    }

    /// Returns true for the unknown-marker.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl From<Option<String>> for Identity {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Unknown, Self::known)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(name) => write!(f, "{name}"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Axis-aligned face region within a frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a bounding box.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if the box has no area.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One matcher result for a detected face region.
///
/// Ephemeral: candidates are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityCandidate {
    /// Matched identity or the unknown-marker.
    pub identity: Identity,
    /// Matcher confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// Region the candidate was produced for.
    pub region: BoundingBox,
}

impl IdentityCandidate {
    /// Creates a candidate for a known identity.
    #[must_use]
    pub fn known(name: impl Into<String>, confidence: f32, region: BoundingBox) -> Self {
        Self {
            identity: Identity::known(name),
            confidence,
            region,
        }
    }

    /// Creates an unknown-marker candidate.
    #[must_use]
    pub const fn unknown(confidence: f32, region: BoundingBox) -> Self {
        Self {
            identity: Identity::Unknown,
            confidence,
            region,
        }
    }

    /// Returns the student name if the matcher would accept this candidate.
    ///
    /// NaN confidences are never accepted.
    #[must_use]
    pub fn accepted_name(&self, acceptance_threshold: f32) -> Option<&str> {
        if self.confidence >= acceptance_threshold {
            self.identity.name()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_is_unknown() {
        assert!(Identity::known("   ").is_unknown());
        assert!(Identity::from(None).is_unknown());
        assert_eq!(
            Identity::from(Some("Alice".to_string())),
            Identity::Known("Alice".to_string())
        );
    }

    #[test]
    fn test_known_name_is_trimmed() {
        assert_eq!(Identity::known(" Alice\t"), Identity::Known("Alice".to_string()));
        assert_eq!(
            Identity::from(Some("Bob ".to_string())).name(),
            Some("Bob")
        );
    }

    #[test]
    fn test_accepted_name_respects_threshold() {
        let region = BoundingBox::new(0, 0, 10, 10);
        let candidate = IdentityCandidate::known("Alice", 0.4, region);
        assert_eq!(candidate.accepted_name(0.4), Some("Alice"));
        assert_eq!(candidate.accepted_name(0.5), None);

        let unknown = IdentityCandidate::unknown(0.99, region);
        assert_eq!(unknown.accepted_name(0.0), None);
    }

    #[test]
    fn test_nan_confidence_is_rejected() {
        let candidate = IdentityCandidate::known("Alice", f32::NAN, BoundingBox::default());
        assert_eq!(candidate.accepted_name(0.0), None);
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(Identity::known("Bob").to_string(), "Bob");
        assert_eq!(Identity::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_empty_box() {
        assert!(BoundingBox::new(1, 1, 0, 5).is_empty());
        assert!(!BoundingBox::new(1, 1, 5, 5).is_empty());
    }
}
