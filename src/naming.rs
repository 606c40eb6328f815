//! Output filename rules.
//!
//! Release names are reduced to the episode identifier (plus a title where the
//! name has no season/episode token) followed by the configured descriptor
//! suffix and the original extension:
//!
//! | Input                                 | Output                                 |
//! |---------------------------------------|----------------------------------------|
//! | `Show S03E01 WEB-DL 2160p.mkv`        | `Show S03E01.720p.H265.mkv`            |
//! | `01x00 Pilot [Tag].mkv`               | `S01E00.Pilot.720p.H265.mkv`           |
//! | `01. Episode Title.mkv`               | `E01.Episode Title.720p.H265.mkv`      |
//!
//! In the `NNxNN` form the title ends at the first `[`; in the `NN.` form it
//! ends at the first dot. Anything after that is release detail and dropped.
//!
//! Rules are tried in order and the first match wins. Running the transformer
//! on its own output does not reproduce that output; callers should skip
//! files that already carry the suffix (see [`NameTransformer::is_converted`]).

use std::path::Path;

use mkvshrink_core::Error;
use regex::{Captures, Regex};

/// Builds the name stem (without suffix and extension) from a match.
type Formatter = fn(&str, &Captures<'_>) -> String;

/// One naming convention.
#[derive(Debug, Clone)]
struct NamingRule {
    name: &'static str,
    pattern: Regex,
    format: Formatter,
}

/// Ordered set of naming rules plus the descriptor suffix.
#[derive(Debug, Clone)]
pub struct NameTransformer {
    rules: Vec<NamingRule>,
    suffix: String,
}

impl NameTransformer {
    pub fn new(suffix: impl Into<String>) -> Result<Self, regex::Error> {
        let rules = vec![
            NamingRule {
                name: "season-episode",
                pattern: Regex::new(r"(?i)s\d{2}e\d{2}(?:-?e\d{2})*")?,
                format: season_episode,
            },
            NamingRule {
                name: "cross",
                pattern: Regex::new(r"^(\d{2})x(\d{2})\s+([^\[\]]+?)\s*(?:\[.*)?$")?,
                format: cross,
            },
            NamingRule {
                name: "numbered",
                pattern: Regex::new(r"^(\d{2})\.\s+([^.]+?)\s*(?:\..*)?$")?,
                format: numbered,
            },
        ];

        Ok(Self {
            rules,
            suffix: suffix.into(),
        })
    }

    /// The descriptor appended to every output name.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Compute the output file name for `file_name`.
    ///
    /// # Errors
    ///
    /// [`Error::PatternNotFound`] when no rule matches.
    pub fn transform(&self, file_name: &str) -> mkvshrink_core::Result<String> {
        let (stem, ext) = split_extension(file_name);

        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(stem) {
                let base = (rule.format)(stem, &caps);
                tracing::trace!(rule = rule.name, file_name, "Naming rule matched");
                return Ok(format!("{base}{}{ext}", self.suffix));
            }
        }

        Err(Error::pattern_not_found(file_name))
    }

    /// Whether `file_name` already looks like the output of a conversion.
    pub fn is_converted(&self, file_name: &str) -> bool {
        let (stem, _) = split_extension(file_name);
        !self.suffix.is_empty() && stem.ends_with(&self.suffix)
    }
}

/// Split a file name into stem and extension, the latter including its dot.
fn split_extension(file_name: &str) -> (&str, &str) {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => file_name.split_at(file_name.len() - ext.len() - 1),
        None => (file_name, ""),
    }
}

/// `Show S03E01 WEB-DL` -> `Show S03E01`
fn season_episode(stem: &str, caps: &Captures<'_>) -> String {
    let Some(token) = caps.get(0) else {
        return stem.to_string();
    };
    format!("{}{}", &stem[..token.start()], token.as_str())
}

/// `01x00 Pilot [Tag] 1080p` -> `S01E00.Pilot`
fn cross(_stem: &str, caps: &Captures<'_>) -> String {
    format!("S{}E{}.{}", &caps[1], &caps[2], caps[3].trim())
}

/// `01. Episode Title.1080p.WEB` -> `E01.Episode Title`
fn numbered(_stem: &str, caps: &Captures<'_>) -> String {
    format!("E{}.{}", &caps[1], caps[2].trim())
}
