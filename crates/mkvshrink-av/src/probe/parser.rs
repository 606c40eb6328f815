//! Parser for ffprobe's human-readable stream listing.
//!
//! ffprobe prints one line per stream to stderr:
//!
//! ```text
//!   Stream #0:0: Video: hevc (Main 10), yuv420p10le(tv), 3840x2160
//!   Stream #0:1(rus): Audio: eac3, 48000 Hz, 5.1(side), fltp, 768 kb/s (default)
//!   Stream #0:3[0x1101](eng): Subtitle: subrip
//! ```
//!
//! Only Video, Audio and Subtitle lines become records; attachments, data
//! streams and everything else in the dump are skipped.

use mkvshrink_core::{StreamKind, StreamRecord, StreamTable};
use regex::Regex;

/// Compiled stream-line grammar. Build once and share across jobs.
#[derive(Debug, Clone)]
pub struct ProbeParser {
    stream_line: Regex,
}

impl ProbeParser {
    pub fn new() -> Result<Self, regex::Error> {
        // Group 1: container index, 2: optional language, 3: stream kind.
        let stream_line = Regex::new(
            r"^\s*Stream\s*#\d+:(\d+)(?:\[0x[0-9a-fA-F]+\])?(?:\((\w+)\))?:\s*(\w+):",
        )?;
        Ok(Self { stream_line })
    }

    /// Scan `text` once and collect every recognised stream line.
    ///
    /// The first Audio line and the first Subtitle line, whether tagged or
    /// not, fix the base offsets of their kind.
    pub fn parse(&self, text: &str) -> StreamTable {
        let mut records = Vec::new();
        let mut first_audio = None;
        let mut first_subtitle = None;

        for line in text.lines() {
            let Some(caps) = self.stream_line.captures(line) else {
                continue;
            };
            let Ok(kind) = caps[3].parse::<StreamKind>() else {
                continue;
            };
            let Ok(index) = caps[1].parse::<u32>() else {
                tracing::warn!(line, "Stream index out of range, skipping");
                continue;
            };

            match kind {
                StreamKind::Audio => {
                    first_audio.get_or_insert(index);
                }
                StreamKind::Subtitle => {
                    first_subtitle.get_or_insert(index);
                }
                StreamKind::Video => {}
            }

            let language = caps.get(2).map(|m| m.as_str());
            records.push(StreamRecord::new(kind, index, language));
        }

        tracing::trace!(
            streams = records.len(),
            ?first_audio,
            ?first_subtitle,
            "Parsed probe output"
        );
        StreamTable::new(records, first_audio, first_subtitle)
    }
}
