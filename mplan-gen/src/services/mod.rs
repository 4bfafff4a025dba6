//! Service modules for the generation orchestration workflow
//!
//! - `invoker`: external generator child-process invocation with timeout
//! - `parser`: output marker extraction and display cleanup
//! - `coordinator`: synchronous single-shot generation
//! - `portrait_jobs`: async multi-candidate portrait job manager
//! - `guard`: per-actor concurrency guard

pub mod coordinator;
pub mod guard;
pub mod invoker;
pub mod parser;
pub mod portrait_jobs;

pub use coordinator::{GenerateError, GenerationCoordinator, GenerationOutcome};
pub use guard::{GenerationGuard, GenerationLease};
pub use invoker::{GeneratorInvoker, InvocationResult, InvokeError};
pub use parser::{parse_markers, strip_ansi, GeneratorOutput};
pub use portrait_jobs::{PortraitJobManager, CANDIDATES_PER_JOB, DEFAULT_JOB_SLOTS};
