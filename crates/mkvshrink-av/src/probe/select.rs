//! Picks the audio and subtitle streams to keep for two languages.

use mkvshrink_core::config::{SelectionConfig, SubtitlePolicy};
use mkvshrink_core::{SelectedStreams, StreamKind, StreamTable};

/// Projects a [`StreamTable`] into the [`SelectedStreams`] for a language pair.
#[derive(Debug, Clone)]
pub struct StreamSelector {
    primary: String,
    secondary: String,
    subtitle_policy: SubtitlePolicy,
}

impl StreamSelector {
    pub fn new(
        primary: impl Into<String>,
        secondary: impl Into<String>,
        subtitle_policy: SubtitlePolicy,
    ) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            subtitle_policy,
        }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(
            &config.primary_language,
            &config.secondary_language,
            config.subtitle_policy,
        )
    }

    /// Audio keeps the first track per language. Subtitles follow the
    /// configured policy. A language that is absent leaves its slot empty.
    pub fn select(&self, table: &StreamTable) -> SelectedStreams {
        let subtitle = |lang: &str| match self.subtitle_policy {
            SubtitlePolicy::First => table.first_tagged(StreamKind::Subtitle, lang),
            SubtitlePolicy::Last => table.last_tagged(StreamKind::Subtitle, lang),
        };

        SelectedStreams {
            audio_primary: table.first_tagged(StreamKind::Audio, &self.primary),
            audio_secondary: table.first_tagged(StreamKind::Audio, &self.secondary),
            subtitle_primary: subtitle(&self.primary),
            subtitle_secondary: subtitle(&self.secondary),
        }
    }
}
