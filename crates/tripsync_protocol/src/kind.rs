//! Record kinds participating in sync.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Logical entity type of a synchronized record.
///
/// The kind is part of a record's identity. Ordering is lexical on
/// [`RecordKind::as_str`], not declaration order, so that canonical batch
/// ordering is stable if variants are ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A saved place.
    Place,
    /// A trip grouping visits.
    Trip,
    /// A visit to a place during a trip.
    Visit,
    /// A spot within a place.
    Spot,
    /// A photo or video attached to another record.
    Media,
    /// A user-defined tag.
    Tag,
}

impl RecordKind {
    /// All record kinds.
    pub const ALL: [RecordKind; 6] = [
        RecordKind::Place,
        RecordKind::Trip,
        RecordKind::Visit,
        RecordKind::Spot,
        RecordKind::Media,
        RecordKind::Tag,
    ];

    /// Returns the lowercase name used for ordering and serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Place => "place",
            RecordKind::Trip => "trip",
            RecordKind::Visit => "visit",
            RecordKind::Spot => "spot",
            RecordKind::Media => "media",
            RecordKind::Tag => "tag",
        }
    }

    /// Returns the record type name used at the transport boundary.
    pub fn record_type(&self) -> &'static str {
        match self {
            RecordKind::Place => "Place",
            RecordKind::Trip => "Trip",
            RecordKind::Visit => "Visit",
            RecordKind::Spot => "Spot",
            RecordKind::Media => "Media",
            RecordKind::Tag => "Tag",
        }
    }
}

impl Ord for RecordKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for RecordKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = ProtocolError;

    /// Accepts either the lowercase name or the transport record type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s || kind.record_type() == s)
            .ok_or_else(|| ProtocolError::UnknownRecordKind(s.to_string()))
    }
}
