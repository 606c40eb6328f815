//! Stream model shared by the probe parser, the stream selector, and the
//! encoder argument builder.
//!
//! The encoder addresses streams relative to their kind (`0:a:1` is the second
//! audio stream), while the probe reports container-wide indices. A
//! [`StreamTable`] keeps the container index of the first stream of each kind
//! so that any record can be translated into its kind-relative index.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// StreamKind
// ---------------------------------------------------------------------------

/// Elementary stream kinds the converter cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

impl StreamKind {
    /// The specifier letter used by the encoder's per-kind map syntax.
    pub fn map_specifier(self) -> char {
        match self {
            Self::Video => 'v',
            Self::Audio => 'a',
            Self::Subtitle => 's',
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "Video"),
            Self::Audio => write!(f, "Audio"),
            Self::Subtitle => write!(f, "Subtitle"),
        }
    }
}

impl FromStr for StreamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Video" => Ok(Self::Video),
            "Audio" => Ok(Self::Audio),
            "Subtitle" => Ok(Self::Subtitle),
            other => Err(format!("unknown stream kind: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// StreamRecord
// ---------------------------------------------------------------------------

/// One stream line from the probe output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub kind: StreamKind,
    /// Container-wide stream index (`#0:<index>`).
    pub container_index: u32,
    /// Three-letter language tag, when the stream carries one.
    pub language: Option<String>,
}

impl StreamRecord {
    pub fn new(kind: StreamKind, container_index: u32, language: Option<&str>) -> Self {
        Self {
            kind,
            container_index,
            language: language.map(str::to_string),
        }
    }

    fn is_tagged(&self, language: &str) -> bool {
        self.language.as_deref() == Some(language)
    }
}

// ---------------------------------------------------------------------------
// StreamTable
// ---------------------------------------------------------------------------

/// Ordered stream records of one file plus per-kind base offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTable {
    records: Vec<StreamRecord>,
    first_audio_index: Option<u32>,
    first_subtitle_index: Option<u32>,
}

impl StreamTable {
    /// Build a table from records in probe order.
    ///
    /// The anchors are supplied by the parser rather than recomputed here,
    /// since the parser sees every stream line, including ones it does not
    /// keep as records.
    pub fn new(
        records: Vec<StreamRecord>,
        first_audio_index: Option<u32>,
        first_subtitle_index: Option<u32>,
    ) -> Self {
        Self {
            records,
            first_audio_index,
            first_subtitle_index,
        }
    }

    /// Build a table whose anchors are the first record of each kind.
    pub fn from_records(records: Vec<StreamRecord>) -> Self {
        let first = |kind| {
            records
                .iter()
                .find(|r| r.kind == kind)
                .map(|r| r.container_index)
        };
        let first_audio_index = first(StreamKind::Audio);
        let first_subtitle_index = first(StreamKind::Subtitle);
        Self::new(records, first_audio_index, first_subtitle_index)
    }

    pub fn records(&self) -> &[StreamRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of streams of the given kind.
    pub fn count(&self, kind: StreamKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Container index of the first stream of `kind`, or 0 when the kind
    /// never appeared. Video is always addressed as `0:v:0` and has no base.
    pub fn base_offset(&self, kind: StreamKind) -> u32 {
        match kind {
            StreamKind::Audio => self.first_audio_index.unwrap_or(0),
            StreamKind::Subtitle => self.first_subtitle_index.unwrap_or(0),
            StreamKind::Video => 0,
        }
    }

    /// Kind-relative index of a record. `None` if the record sits before its
    /// kind's anchor, which only happens for hand-built tables.
    pub fn relative_index(&self, record: &StreamRecord) -> Option<u32> {
        record
            .container_index
            .checked_sub(self.base_offset(record.kind))
    }

    /// Relative index of the earliest stream of `kind` tagged `language`.
    pub fn first_tagged(&self, kind: StreamKind, language: &str) -> Option<u32> {
        self.records
            .iter()
            .filter(|r| r.kind == kind && r.is_tagged(language))
            .find_map(|r| self.relative_index(r))
    }

    /// Relative index of the latest stream of `kind` tagged `language`.
    pub fn last_tagged(&self, kind: StreamKind, language: &str) -> Option<u32> {
        self.records
            .iter()
            .rev()
            .filter(|r| r.kind == kind && r.is_tagged(language))
            .find_map(|r| self.relative_index(r))
    }
}

// ---------------------------------------------------------------------------
// SelectedStreams
// ---------------------------------------------------------------------------

/// The streams kept for one file, as kind-relative indices.
///
/// Slots are positional: "primary" is the first configured language and
/// "secondary" the second, regardless of which languages those are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedStreams {
    pub audio_primary: Option<u32>,
    pub audio_secondary: Option<u32>,
    pub subtitle_primary: Option<u32>,
    pub subtitle_secondary: Option<u32>,
}

impl SelectedStreams {
    /// Present audio slots, primary first.
    pub fn audio(&self) -> impl Iterator<Item = u32> {
        [self.audio_primary, self.audio_secondary].into_iter().flatten()
    }

    /// Present subtitle slots, primary first.
    pub fn subtitles(&self) -> impl Iterator<Item = u32> {
        [self.subtitle_primary, self.subtitle_secondary]
            .into_iter()
            .flatten()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_primary.is_some() || self.audio_secondary.is_some()
    }
}

impl fmt::Display for SelectedStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |i| i.to_string());
        write!(
            f,
            "audio {}/{}, subtitles {}/{}",
            slot(self.audio_primary),
            slot(self.audio_secondary),
            slot(self.subtitle_primary),
            slot(self.subtitle_secondary),
        )
    }
}
