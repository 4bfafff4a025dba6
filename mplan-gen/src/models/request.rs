//! Generation request parameters and argument mapping
//!
//! A `GenerationRequest` is the ephemeral payload of one synchronous
//! generation. `to_args()` maps it deterministically onto the generator's
//! command-line protocol: mode keyword first, then mode-specific positional
//! arguments in a fixed order, then the optional quality knobs.

use mplan_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Closed set of generation modes understood by the external generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// One artist, one concept, one song
    Standard,
    /// Two artists collaborate on one song
    Collab,
    /// Same concept, two competing versions
    Battle,
    /// 4-5 song EP around a theme
    Album,
    /// Auto-pick the artist from a mood description
    Vibe,
    /// Caller supplies lyrics, generator matches an artist
    Lyrics,
    /// Fuse two genre guides into one song
    Fusion,
    /// Sound-alike of a real-world artist
    Like,
    /// Re-style an existing catalog song
    Remix,
    /// Regenerate an existing catalog song with a new seed
    Reroll,
    /// Write a new artist definition file
    NewArtist,
    /// Write a new genre guide file
    NewGenre,
}

impl GenerationMode {
    /// Mode keyword as used in logs and persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Standard => "standard",
            GenerationMode::Collab => "collab",
            GenerationMode::Battle => "battle",
            GenerationMode::Album => "album",
            GenerationMode::Vibe => "vibe",
            GenerationMode::Lyrics => "lyrics",
            GenerationMode::Fusion => "fusion",
            GenerationMode::Like => "like",
            GenerationMode::Remix => "remix",
            GenerationMode::Reroll => "reroll",
            GenerationMode::NewArtist => "new-artist",
            GenerationMode::NewGenre => "new-genre",
        }
    }

    /// Hard wall-clock budget for one invocation of this mode
    ///
    /// Audio synthesis runs minutes; definition modes only drive the
    /// language model; battle renders two songs and album renders 4-5.
    pub fn timeout(&self) -> Duration {
        match self {
            GenerationMode::NewArtist | GenerationMode::NewGenre => Duration::from_secs(120),
            GenerationMode::Battle => Duration::from_secs(900),
            GenerationMode::Album => Duration::from_secs(1800),
            _ => Duration::from_secs(600),
        }
    }
}

/// Parameters for one synchronous generation
///
/// The variable parameter set is mode-dependent; `to_args()` validates
/// that the parameters the mode requires are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub mode: Option<GenerationMode>,
    /// Primary artist (standard, collab, battle, album, like, remix)
    pub artist: Option<String>,
    /// Second artist (collab, battle)
    pub artist2: Option<String>,
    /// Free-text song concept or album theme
    pub concept: Option<String>,
    /// Mood description (vibe mode)
    pub mood: Option<String>,
    /// Caller-supplied lyrics (lyrics mode)
    pub lyrics: Option<String>,
    /// Genre pair (fusion mode)
    pub genre1: Option<String>,
    pub genre2: Option<String>,
    /// Existing catalog song (remix, reroll)
    pub song_id: Option<i64>,
    /// Free-text description (new-artist, new-genre)
    pub description: Option<String>,
    /// Target duration in seconds
    pub duration: Option<u32>,
    /// Diffusion step count
    pub steps: Option<u32>,
    /// Quality preset: draft | normal | high | ultra
    pub quality: Option<String>,
    /// Number of takes to render
    pub takes: Option<u32>,
    /// Apply mastering chain after synthesis
    #[serde(default)]
    pub master: bool,
}

impl GenerationRequest {
    /// Mode of this request, defaulting to standard
    pub fn mode(&self) -> GenerationMode {
        self.mode.unwrap_or(GenerationMode::Standard)
    }

    /// Map the request onto the generator's argument vector
    ///
    /// Returns `Error::InvalidInput` when a parameter the mode requires is
    /// missing. The ordering per mode is fixed; callers must not reorder.
    pub fn to_args(&self) -> Result<Vec<String>> {
        let mut args = match self.mode() {
            GenerationMode::Standard => {
                vec![self.require_artist()?, self.require_concept()?]
            }
            GenerationMode::Collab => vec![
                "--collab".to_string(),
                self.require_artist()?,
                self.require_artist2()?,
                self.require_concept()?,
            ],
            GenerationMode::Battle => vec![
                "--battle".to_string(),
                self.require_artist()?,
                self.require_artist2()?,
                self.require_concept()?,
            ],
            GenerationMode::Album => vec![
                "--album".to_string(),
                self.require_artist()?,
                self.require_concept()?,
            ],
            GenerationMode::Vibe => vec![
                "--vibe".to_string(),
                self.require("mood", &self.mood)?,
                self.require_concept()?,
            ],
            GenerationMode::Lyrics => vec![
                "--lyrics".to_string(),
                self.require("lyrics", &self.lyrics)?,
            ],
            GenerationMode::Fusion => vec![
                "--fusion".to_string(),
                self.require("genre1", &self.genre1)?,
                self.require("genre2", &self.genre2)?,
                self.require_concept()?,
            ],
            GenerationMode::Like => vec![
                "--like".to_string(),
                self.require_artist()?,
                self.require_concept()?,
            ],
            GenerationMode::Remix => vec![
                "--remix".to_string(),
                self.require_song_id()?,
                self.require_artist()?,
            ],
            GenerationMode::Reroll => vec!["--reroll".to_string(), self.require_song_id()?],
            GenerationMode::NewArtist => vec![
                "--artist".to_string(),
                self.require("description", &self.description)?,
            ],
            GenerationMode::NewGenre => vec![
                "--genre".to_string(),
                self.require("description", &self.description)?,
            ],
        };

        // Optional knobs, fixed order after the positional arguments
        if let Some(duration) = self.duration {
            args.push("--duration".to_string());
            args.push(duration.to_string());
        }
        if let Some(steps) = self.steps {
            args.push("--steps".to_string());
            args.push(steps.to_string());
        }
        if let Some(quality) = &self.quality {
            args.push("--quality".to_string());
            args.push(quality.clone());
        }
        if let Some(takes) = self.takes {
            args.push("--takes".to_string());
            args.push(takes.to_string());
        }
        if self.master {
            args.push("--master".to_string());
        }

        Ok(args)
    }

    fn require(&self, name: &str, value: &Option<String>) -> Result<String> {
        value
            .as_ref()
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "mode '{}' requires parameter '{}'",
                    self.mode().as_str(),
                    name
                ))
            })
    }

    fn require_artist(&self) -> Result<String> {
        self.require("artist", &self.artist)
    }

    fn require_artist2(&self) -> Result<String> {
        self.require("artist2", &self.artist2)
    }

    fn require_concept(&self) -> Result<String> {
        self.require("concept", &self.concept)
    }

    fn require_song_id(&self) -> Result<String> {
        self.song_id.map(|id| id.to_string()).ok_or_else(|| {
            Error::InvalidInput(format!(
                "mode '{}' requires parameter 'song_id'",
                self.mode().as_str()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_request() -> GenerationRequest {
        GenerationRequest {
            mode: Some(GenerationMode::Standard),
            artist: Some("nova".to_string()),
            concept: Some("city lights".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn standard_mode_args_are_positional() {
        let args = standard_request().to_args().unwrap();
        assert_eq!(args, vec!["nova", "city lights"]);
    }

    #[test]
    fn collab_mode_leads_with_keyword() {
        let request = GenerationRequest {
            mode: Some(GenerationMode::Collab),
            artist: Some("ghost".to_string()),
            artist2: Some("velvet".to_string()),
            concept: Some("toxic love".to_string()),
            ..Default::default()
        };
        let args = request.to_args().unwrap();
        assert_eq!(args, vec!["--collab", "ghost", "velvet", "toxic love"]);
    }

    #[test]
    fn knobs_follow_positional_args_in_fixed_order() {
        let mut request = standard_request();
        request.duration = Some(120);
        request.steps = Some(60);
        request.quality = Some("high".to_string());
        request.master = true;

        let args = request.to_args().unwrap();
        assert_eq!(
            args,
            vec![
                "nova",
                "city lights",
                "--duration",
                "120",
                "--steps",
                "60",
                "--quality",
                "high",
                "--master"
            ]
        );
    }

    #[test]
    fn missing_required_parameter_is_invalid_input() {
        let request = GenerationRequest {
            mode: Some(GenerationMode::Vibe),
            concept: Some("missing someone".to_string()),
            ..Default::default()
        };
        let err = request.to_args().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("mood"));
    }

    #[test]
    fn reroll_requires_song_id() {
        let request = GenerationRequest {
            mode: Some(GenerationMode::Reroll),
            ..Default::default()
        };
        assert!(request.to_args().is_err());

        let request = GenerationRequest {
            mode: Some(GenerationMode::Reroll),
            song_id: Some(1738640123),
            ..Default::default()
        };
        assert_eq!(request.to_args().unwrap(), vec!["--reroll", "1738640123"]);
    }

    #[test]
    fn mode_defaults_to_standard() {
        let request = GenerationRequest {
            artist: Some("rust".to_string()),
            concept: Some("open road".to_string()),
            ..Default::default()
        };
        assert_eq!(request.mode(), GenerationMode::Standard);
    }

    #[test]
    fn timeouts_scale_with_mode_weight() {
        assert_eq!(
            GenerationMode::NewGenre.timeout(),
            Duration::from_secs(120)
        );
        assert_eq!(GenerationMode::Standard.timeout(), Duration::from_secs(600));
        assert_eq!(GenerationMode::Battle.timeout(), Duration::from_secs(900));
        assert_eq!(GenerationMode::Album.timeout(), Duration::from_secs(1800));
    }

    #[test]
    fn blank_parameter_counts_as_missing() {
        let mut request = standard_request();
        request.concept = Some("   ".to_string());
        assert!(request.to_args().is_err());
    }
}
