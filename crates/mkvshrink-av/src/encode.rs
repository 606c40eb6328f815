//! ffmpeg argument synthesis and execution.
//!
//! Video is always re-encoded with the fixed [`EncodeProfile`]; the selected
//! audio and subtitle streams are copied untouched. All codec flags come
//! before all `-map` directives and the output path is last.

use std::fmt;
use std::path::{Path, PathBuf};

use mkvshrink_core::config::EncodeConfig;
use mkvshrink_core::SelectedStreams;

use crate::command::ToolCommand;
use crate::tools::ToolConfig;

/// Fixed video encode settings shared by every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub crf: u32,
    pub scale_height: u32,
    pub overwrite: bool,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self::from_config(&EncodeConfig::default())
    }
}

impl EncodeProfile {
    pub fn from_config(config: &EncodeConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            crf: config.crf,
            scale_height: config.scale_height,
            overwrite: config.overwrite,
        }
    }
}

/// A complete ffmpeg argument list for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeArgs {
    args: Vec<String>,
    output: PathBuf,
    overwrite: bool,
}

impl EncodeArgs {
    /// Build the argument list for converting `input` into `output`.
    ///
    /// # Errors
    ///
    /// [`mkvshrink_core::Error::NoUsableAudio`] when neither audio slot is
    /// filled. No argument list is produced in that case.
    pub fn build(
        profile: &EncodeProfile,
        streams: &SelectedStreams,
        input: &Path,
        output: &Path,
    ) -> mkvshrink_core::Result<Self> {
        if !streams.has_audio() {
            return Err(mkvshrink_core::Error::NoUsableAudio {
                input: input.to_path_buf(),
            });
        }

        let mut args = Vec::with_capacity(32);
        if profile.overwrite {
            args.push("-y".to_string());
        }
        args.push("-i".to_string());
        args.push(input.to_string_lossy().into_owned());

        args.extend([
            "-c:v".to_string(),
            profile.video_codec.clone(),
            "-crf".to_string(),
            profile.crf.to_string(),
            "-vf".to_string(),
            format!("scale=-2:{}", profile.scale_height),
        ]);

        for (slot, _) in streams.audio().enumerate() {
            args.push(format!("-c:a:{slot}"));
            args.push("copy".to_string());
        }
        for (slot, _) in streams.subtitles().enumerate() {
            args.push(format!("-c:s:{slot}"));
            args.push("copy".to_string());
        }

        args.push("-map".to_string());
        args.push("0:v:0".to_string());
        for index in streams.audio() {
            args.push("-map".to_string());
            args.push(format!("0:a:{index}"));
        }
        for index in streams.subtitles() {
            args.push("-map".to_string());
            args.push(format!("0:s:{index}"));
        }

        args.push(output.to_string_lossy().into_owned());

        Ok(Self {
            args,
            output: output.to_path_buf(),
            overwrite: profile.overwrite,
        })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn into_vec(self) -> Vec<String> {
        self.args
    }

    /// The file the encoder will write.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl fmt::Display for EncodeArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, "'{}'", arg.replace('\'', r"'\''"))?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// Run ffmpeg with `args`.
///
/// On failure any partially written output is removed. A file that was
/// already there and that ffmpeg was not allowed to overwrite is left alone.
///
/// # Errors
///
/// [`mkvshrink_core::Error::EncodeFailed`] carrying the encoder's failure and,
/// if removing the partial output also failed, that error too.
pub async fn run_encode(ffmpeg: &ToolConfig, args: &EncodeArgs) -> mkvshrink_core::Result<()> {
    let output = args.output();
    let preexisting = !args.overwrite && output.exists();

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.args(args.as_slice().iter().cloned())
        .timeout(ffmpeg.timeout);

    tracing::debug!(output = %output.display(), "Encoding: {args}");

    let err = match cmd.execute().await {
        Ok(_) => return Ok(()),
        Err(e) => e,
    };

    let message = match err {
        mkvshrink_core::Error::Tool { message, .. } => message,
        other => other.to_string(),
    };

    let cleanup = if preexisting {
        None
    } else {
        match std::fs::remove_file(output) {
            Ok(()) => {
                tracing::debug!(output = %output.display(), "Removed partial output");
                None
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => Some(e),
        }
    };

    Err(mkvshrink_core::Error::EncodeFailed {
        message,
        output: output.to_path_buf(),
        cleanup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(streams: SelectedStreams) -> mkvshrink_core::Result<Vec<String>> {
        EncodeArgs::build(
            &EncodeProfile::default(),
            &streams,
            Path::new("in.mkv"),
            Path::new("out.mkv"),
        )
        .map(EncodeArgs::into_vec)
    }

    fn split(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    const HEAD: &str = "-i in.mkv -c:v libx265 -crf 23 -vf scale=-2:720";

    #[test]
    fn both_audio_both_subtitles() {
        let args = build(SelectedStreams {
            audio_primary: Some(0),
            audio_secondary: Some(2),
            subtitle_primary: Some(1),
            subtitle_secondary: Some(2),
        })
        .unwrap();
        assert_eq!(
            args,
            split(&format!(
                "{HEAD} -c:a:0 copy -c:a:1 copy -c:s:0 copy -c:s:1 copy \
                 -map 0:v:0 -map 0:a:0 -map 0:a:2 -map 0:s:1 -map 0:s:2 out.mkv"
            ))
        );
    }

    #[test]
    fn both_audio_primary_subtitle() {
        let args = build(SelectedStreams {
            audio_primary: Some(0),
            audio_secondary: Some(1),
            subtitle_primary: Some(0),
            subtitle_secondary: None,
        })
        .unwrap();
        assert_eq!(
            args,
            split(&format!(
                "{HEAD} -c:a:0 copy -c:a:1 copy -c:s:0 copy \
                 -map 0:v:0 -map 0:a:0 -map 0:a:1 -map 0:s:0 out.mkv"
            ))
        );
    }

    #[test]
    fn both_audio_secondary_subtitle() {
        let args = build(SelectedStreams {
            audio_primary: Some(0),
            audio_secondary: Some(1),
            subtitle_primary: None,
            subtitle_secondary: Some(3),
        })
        .unwrap();
        assert_eq!(
            args,
            split(&format!(
                "{HEAD} -c:a:0 copy -c:a:1 copy -c:s:0 copy \
                 -map 0:v:0 -map 0:a:0 -map 0:a:1 -map 0:s:3 out.mkv"
            ))
        );
    }

    #[test]
    fn both_audio_no_subtitles() {
        let args = build(SelectedStreams {
            audio_primary: Some(0),
            audio_secondary: Some(1),
            subtitle_primary: None,
            subtitle_secondary: None,
        })
        .unwrap();
        assert_eq!(
            args,
            split(&format!(
                "{HEAD} -c:a:0 copy -c:a:1 copy -map 0:v:0 -map 0:a:0 -map 0:a:1 out.mkv"
            ))
        );
    }

    #[test]
    fn primary_audio_only_with_subtitles() {
        let args = build(SelectedStreams {
            audio_primary: Some(1),
            audio_secondary: None,
            subtitle_primary: Some(0),
            subtitle_secondary: Some(1),
        })
        .unwrap();
        assert_eq!(
            args,
            split(&format!(
                "{HEAD} -c:a:0 copy -c:s:0 copy -c:s:1 copy \
                 -map 0:v:0 -map 0:a:1 -map 0:s:0 -map 0:s:1 out.mkv"
            ))
        );
    }

    #[test]
    fn primary_audio_only_no_subtitles() {
        let args = build(SelectedStreams {
            audio_primary: Some(0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            args,
            split(&format!("{HEAD} -c:a:0 copy -map 0:v:0 -map 0:a:0 out.mkv"))
        );
    }

    #[test]
    fn secondary_audio_takes_slot_zero() {
        let args = build(SelectedStreams {
            audio_primary: None,
            audio_secondary: Some(2),
            subtitle_primary: None,
            subtitle_secondary: Some(0),
        })
        .unwrap();
        assert_eq!(
            args,
            split(&format!(
                "{HEAD} -c:a:0 copy -c:s:0 copy -map 0:v:0 -map 0:a:2 -map 0:s:0 out.mkv"
            ))
        );
    }

    #[test]
    fn secondary_audio_only_no_subtitles() {
        let args = build(SelectedStreams {
            audio_secondary: Some(0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            args,
            split(&format!("{HEAD} -c:a:0 copy -map 0:v:0 -map 0:a:0 out.mkv"))
        );
    }

    #[test]
    fn no_audio_is_rejected() {
        let err = build(SelectedStreams {
            audio_primary: None,
            audio_secondary: None,
            subtitle_primary: Some(0),
            subtitle_secondary: Some(1),
        })
        .unwrap_err();
        assert!(matches!(err, mkvshrink_core::Error::NoUsableAudio { .. }));
    }

    #[test]
    fn profile_settings_and_overwrite_flag() {
        let profile = EncodeProfile {
            video_codec: "libsvtav1".into(),
            crf: 30,
            scale_height: 1080,
            overwrite: true,
        };
        let args = EncodeArgs::build(
            &profile,
            &SelectedStreams {
                audio_primary: Some(0),
                ..Default::default()
            },
            Path::new("in.mkv"),
            Path::new("out.mkv"),
        )
        .unwrap();
        let v = args.as_slice();
        assert_eq!(v[0], "-y");
        assert!(v.windows(2).any(|w| w == ["-c:v", "libsvtav1"]));
        assert!(v.windows(2).any(|w| w == ["-crf", "30"]));
        assert!(v.windows(2).any(|w| w == ["-vf", "scale=-2:1080"]));
        assert_eq!(v.last().unwrap(), "out.mkv");
        assert_eq!(args.output(), Path::new("out.mkv"));
    }

    #[test]
    fn display_quotes_paths_with_spaces() {
        let args = EncodeArgs::build(
            &EncodeProfile::default(),
            &SelectedStreams {
                audio_primary: Some(0),
                ..Default::default()
            },
            Path::new("My Show S01E01.mkv"),
            Path::new("My Show S01E01.720p.H265.mkv"),
        )
        .unwrap();
        let shown = args.to_string();
        assert!(shown.starts_with("-i 'My Show S01E01.mkv' -c:v libx265"));
        assert!(shown.ends_with("'My Show S01E01.720p.H265.mkv'"));
    }

    #[cfg(unix)]
    mod run {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_ffmpeg(dir: &Path, script: &str) -> ToolConfig {
            let path = dir.join("ffmpeg");
            std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            ToolConfig {
                name: "ffmpeg".into(),
                path,
                timeout: None,
            }
        }

        fn args_for(output: &Path, overwrite: bool) -> EncodeArgs {
            let profile = EncodeProfile {
                overwrite,
                ..Default::default()
            };
            EncodeArgs::build(
                &profile,
                &SelectedStreams {
                    audio_primary: Some(0),
                    ..Default::default()
                },
                Path::new("in.mkv"),
                output,
            )
            .unwrap()
        }

        #[tokio::test]
        async fn success_keeps_output() {
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("out.mkv");
            // Last argument is the output path.
            let ffmpeg = fake_ffmpeg(dir.path(), r#"for a; do last="$a"; done; echo done > "$last""#);

            run_encode(&ffmpeg, &args_for(&out, false)).await.unwrap();
            assert!(out.exists());
        }

        #[tokio::test]
        async fn failure_removes_partial_output() {
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("out.mkv");
            let ffmpeg = fake_ffmpeg(
                dir.path(),
                r#"for a; do last="$a"; done; echo partial > "$last"; echo 'Conversion failed!' >&2; exit 1"#,
            );

            let err = run_encode(&ffmpeg, &args_for(&out, false))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("Conversion failed!"));
            match err {
                mkvshrink_core::Error::EncodeFailed { cleanup, .. } => assert!(cleanup.is_none()),
                other => panic!("unexpected error: {other}"),
            }
            assert!(!out.exists());
        }

        #[tokio::test]
        async fn failure_without_output_is_not_a_cleanup_error() {
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("out.mkv");
            let ffmpeg = fake_ffmpeg(dir.path(), "exit 1");

            let err = run_encode(&ffmpeg, &args_for(&out, false))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                mkvshrink_core::Error::EncodeFailed { cleanup: None, .. }
            ));
        }

        #[tokio::test]
        async fn preexisting_output_is_not_removed_without_overwrite() {
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("out.mkv");
            std::fs::write(&out, b"earlier result").unwrap();
            let ffmpeg = fake_ffmpeg(dir.path(), "echo 'File exists' >&2; exit 1");

            assert!(run_encode(&ffmpeg, &args_for(&out, false)).await.is_err());
            assert_eq!(std::fs::read(&out).unwrap(), b"earlier result");
        }
    }
}
