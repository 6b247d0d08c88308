pub mod command;
pub mod orchestrator;

pub use command::{HeyCommand, LoadGenerator, LoadTest};
pub use orchestrator::{artifact_name, slugify_target, Orchestrator, RunOutcome};
