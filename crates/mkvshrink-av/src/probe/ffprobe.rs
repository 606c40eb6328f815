//! Runs `ffprobe` on one input and parses its stream listing.
//!
//! ffprobe writes the listing to stderr, which is captured into a
//! [`ScratchFile`] and read back once the process exits.

use std::path::Path;

use mkvshrink_core::StreamTable;

use super::parser::ProbeParser;
use crate::command::{tail, ToolCommand};
use crate::scratch::ScratchFile;
use crate::tools::ToolConfig;

/// Diagnostic lines included when the probe fails.
const FAILURE_TAIL_LINES: usize = 5;

/// Probe `input` with the given ffprobe and return its stream table.
///
/// The scratch file lives in `scratch_dir` when given, otherwise next to the
/// input, and is removed before this function returns on every path.
///
/// # Errors
///
/// - [`mkvshrink_core::Error::Scratch`] if the scratch file cannot be
///   created, read, or removed.
/// - [`mkvshrink_core::Error::Tool`] if ffprobe cannot be spawned, times
///   out, or exits with a non-zero status.
pub async fn run_probe(
    ffprobe: &ToolConfig,
    parser: &ProbeParser,
    input: &Path,
    scratch_dir: Option<&Path>,
) -> mkvshrink_core::Result<StreamTable> {
    let scratch = ScratchFile::for_input(input, scratch_dir)?;

    let mut cmd = ToolCommand::new(ffprobe.path.clone());
    cmd.arg("-hide_banner")
        .arg("-i")
        .arg(input.to_string_lossy())
        .timeout(ffprobe.timeout);

    tracing::debug!(
        input = %input.display(),
        scratch = %scratch.path().display(),
        "Probing"
    );

    let status = cmd.execute_to_file(scratch.writer()?).await?;
    let text = scratch.read_to_string();
    let closed = scratch.close();

    if !status.success() {
        let mut message = match &text {
            Ok(text) => format!(
                "exited with status {status}: {}",
                tail(text, FAILURE_TAIL_LINES)
            ),
            Err(e) => format!("exited with status {status}; diagnostics unavailable: {e}"),
        };
        if let Err(e) = closed {
            message.push_str(&format!("; additionally {e}"));
        }
        return Err(mkvshrink_core::Error::tool(&ffprobe.name, message));
    }
    let text = text?;
    closed?;

    Ok(parser.parse(&text))
}
