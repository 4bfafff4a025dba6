//! Configuration resolution for mplan-gen
//!
//! Generator program locations and the portrait artifact area resolve
//! relative to the root folder, with environment variable overrides
//! (ENV → default priority, per service convention).

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::portrait_jobs::DEFAULT_JOB_SLOTS;

/// Resolved generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Song/definition generator entry point
    pub generate_program: PathBuf,
    /// Portrait generator entry point
    pub portrait_program: PathBuf,
    /// Fixed working directory for generator invocations
    pub workdir: PathBuf,
    /// Durable artifact area for portrait jobs
    pub portraits_dir: PathBuf,
    /// Bound on concurrently running portrait jobs
    pub job_slots: usize,
    /// Optional upper bound on every invocation budget, in addition to the
    /// per-mode timeouts
    pub timeout_cap: Option<Duration>,
}

impl GeneratorConfig {
    /// Resolve configuration against the root folder
    pub fn resolve(root: &Path) -> Self {
        let generate_program = env_path("MPLAN_GENERATE_PROGRAM")
            .unwrap_or_else(|| root.join("generate.sh"));
        let portrait_program = env_path("MPLAN_PORTRAIT_PROGRAM")
            .unwrap_or_else(|| root.join("artist_photo.py"));
        let portraits_dir =
            env_path("MPLAN_PORTRAITS_DIR").unwrap_or_else(|| root.join("portraits"));
        let job_slots = std::env::var("MPLAN_JOB_SLOTS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_JOB_SLOTS);
        let timeout_cap = std::env::var("MPLAN_TIMEOUT_CAP_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .map(Duration::from_secs);

        Self {
            generate_program,
            portrait_program,
            workdir: root.to_path_buf(),
            portraits_dir,
            job_slots,
            timeout_cap,
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_relative_to_root() {
        std::env::remove_var("MPLAN_GENERATE_PROGRAM");
        std::env::remove_var("MPLAN_PORTRAITS_DIR");
        std::env::remove_var("MPLAN_TIMEOUT_CAP_SECS");
        let config = GeneratorConfig::resolve(Path::new("/data/mplan"));
        assert_eq!(
            config.generate_program,
            PathBuf::from("/data/mplan/generate.sh")
        );
        assert_eq!(config.portraits_dir, PathBuf::from("/data/mplan/portraits"));
        assert_eq!(config.workdir, PathBuf::from("/data/mplan"));
        assert_eq!(config.job_slots, DEFAULT_JOB_SLOTS);
        assert_eq!(config.timeout_cap, None);
    }
}
