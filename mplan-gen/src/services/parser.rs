//! Generator output parsing
//!
//! The generator reports structured results as line-oriented markers inside
//! otherwise free-form log text:
//!
//! ```text
//! AUDIO_FILE=<absolute path>      (artifact path, audio or image)
//! SONG_ID=<integer>
//! ARTIST_FILE=<absolute path>     (freshly written definition file)
//! LYRICS_START
//! <free text>
//! LYRICS_END
//! ```
//!
//! Markers appear at most once per invocation in well-formed output; when a
//! key repeats, the last occurrence wins (the output is a log, later lines
//! supersede earlier diagnostics). A missing marker is a `None` field, not
//! an error; significance is the caller's call.
//!
//! Display cleanup (ANSI escape stripping) is a separate pass from marker
//! extraction; both operate on the same raw text.

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Typed fields extracted from one invocation's combined output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorOutput {
    /// Produced artifact path (the AUDIO_FILE marker carries any artifact
    /// kind, a name kept for generator compatibility)
    pub artifact: Option<PathBuf>,
    /// Catalog id of a freshly created record
    pub song_id: Option<i64>,
    /// Path of a freshly written artist/genre definition file
    pub definition_file: Option<PathBuf>,
    /// Payload between the LYRICS_START / LYRICS_END sentinels, trimmed
    pub lyrics: Option<String>,
}

/// Extract marker fields from combined generator output
pub fn parse_markers(text: &str) -> GeneratorOutput {
    let mut parsed = GeneratorOutput::default();
    let mut lyrics_buf: Option<Vec<&str>> = None;

    for line in text.lines() {
        if let Some(buf) = lyrics_buf.as_mut() {
            if line.trim() == "LYRICS_END" {
                let payload = buf.join("\n").trim().to_string();
                parsed.lyrics = Some(payload);
                lyrics_buf = None;
            } else {
                buf.push(line);
            }
            continue;
        }

        if line.trim() == "LYRICS_START" {
            lyrics_buf = Some(Vec::new());
        } else if let Some(value) = line.strip_prefix("AUDIO_FILE=") {
            let value = value.trim();
            if !value.is_empty() {
                parsed.artifact = Some(PathBuf::from(value));
            }
        } else if let Some(value) = line.strip_prefix("SONG_ID=") {
            // Non-numeric values are log noise, not markers
            if let Ok(id) = value.trim().parse::<i64>() {
                parsed.song_id = Some(id);
            }
        } else if let Some(value) = line.strip_prefix("ARTIST_FILE=") {
            let value = value.trim();
            if !value.is_empty() {
                parsed.definition_file = Some(PathBuf::from(value));
            }
        }
    }

    // An unterminated lyrics block is discarded; the sentinel pair is the
    // contract.
    parsed
}

/// Strip terminal color/control escape sequences for display text
pub fn strip_ansi(text: &str) -> String {
    static ANSI_RE: OnceLock<Regex> = OnceLock::new();
    let re = ANSI_RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid regex"));
    re.replace_all(text, "").into_owned()
}
