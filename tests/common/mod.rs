//! Shared test harness for integration tests.
//!
//! Provides [`FakeTools`], a pair of shell scripts standing in for ffprobe
//! and ffmpeg, and [`TestHarness`] which lays out a media directory next to
//! them. Unix only.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use mkvshrink_av::ToolRegistry;
use tempfile::TempDir;

/// ffprobe stand-in. Prints a stream listing to stderr based on the input
/// name:
///
/// - `*broken*`: an error, exit 1
/// - `*noaudio*`: video and a subtitle only
/// - `*eng-only*`: video plus one English audio track
/// - anything else: video, rus/rus/eng audio, rus/rus/eng subtitles
const FAKE_FFPROBE: &str = r#"#!/bin/sh
input="$3"
case "$input" in
  *broken*)
    echo "$input: Invalid data found when processing input" >&2
    exit 1
    ;;
  *noaudio*)
    echo "  Stream #0:0: Video: h264" >&2
    echo "  Stream #0:1(eng): Subtitle: subrip" >&2
    ;;
  *eng-only*)
    echo "  Stream #0:0: Video: h264" >&2
    echo "  Stream #0:1(eng): Audio: aac" >&2
    ;;
  *)
    echo "Input #0, matroska,webm, from '$input':" >&2
    echo "  Stream #0:0: Video: hevc (Main 10), 3840x2160" >&2
    echo "  Stream #0:1(rus): Audio: eac3, 48000 Hz, 5.1(side)" >&2
    echo "  Stream #0:2(rus): Audio: ac3, 48000 Hz, stereo" >&2
    echo "  Stream #0:3(eng): Audio: eac3, 48000 Hz, 5.1(side)" >&2
    echo "  Stream #0:4(rus): Subtitle: subrip (forced)" >&2
    echo "  Stream #0:5(rus): Subtitle: subrip" >&2
    echo "  Stream #0:6(eng): Subtitle: subrip" >&2
    echo "  Stream #0:7: Attachment: ttf" >&2
    ;;
esac
"#;

/// ffmpeg stand-in. Writes its argument list into the output file (the last
/// argument). Inputs named `*failenc*` get a partial output and exit 1.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
for a; do last="$a"; done
case "$*" in
  *failenc*)
    echo "partial" > "$last"
    echo "Conversion failed!" >&2
    exit 1
    ;;
esac
echo "$*" > "$last"
"#;

/// Paths of installed fake tools.
pub struct FakeTools {
    _dir: TempDir,
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl FakeTools {
    pub fn install() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = write_script(dir.path(), "ffprobe", FAKE_FFPROBE);
        let ffmpeg = write_script(dir.path(), "ffmpeg", FAKE_FFMPEG);
        Self {
            _dir: dir,
            ffprobe,
            ffmpeg,
        }
    }

    pub fn registry(&self) -> ToolRegistry {
        ToolRegistry::with_paths(&self.ffmpeg, &self.ffprobe)
    }

    /// A config file pointing at these tools.
    pub fn config_toml(&self) -> String {
        format!(
            "[tools]\nffmpeg_path = {:?}\nffprobe_path = {:?}\n",
            self.ffmpeg.to_string_lossy(),
            self.ffprobe.to_string_lossy()
        )
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Media directory plus fake tools.
pub struct TestHarness {
    pub tools: FakeTools,
    pub media: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            tools: FakeTools::install(),
            media: tempfile::tempdir().unwrap(),
        }
    }

    /// Create empty input files in the media directory.
    pub fn with_inputs(self, names: &[&str]) -> Self {
        for name in names {
            fs::write(self.media.path().join(name), b"").unwrap();
        }
        self
    }

    pub fn media_path(&self, name: &str) -> PathBuf {
        self.media.path().join(name)
    }

    /// File names currently in the media directory, sorted.
    pub fn listing(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.media.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Write a config file pointing at the fake tools and return its path.
    pub fn write_config(&self, extra: &str) -> PathBuf {
        let path = self.tools._dir.path().join("mkvshrink.toml");
        fs::write(&path, format!("{}{}", self.tools.config_toml(), extra)).unwrap();
        path
    }
}
