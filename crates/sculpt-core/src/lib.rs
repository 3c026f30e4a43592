//! Sculpt Core - natural-language scene editing pipeline
//!
//! Ties the workspace together:
//! - Interprets a command into action candidates
//! - Validates and applies them to the scene strictly in order
//! - Runs model imports for `search` actions, cancellable at every network wait
//! - Aggregates one feedback entry per action into a `CommandReport`
//!
//! # Example
//!
//! ```rust,ignore
//! use sculpt_core::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SculptConfig::load(Some("sculpt.toml".as_ref()))?;
//! let pipeline = CommandPipeline::from_config(&config)?;
//!
//! let report = pipeline.execute("add a red cube and a sphere").await?;
//! println!("{}", report.text());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod executor;
pub mod feedback;
pub mod pipeline;

pub use config::{
    AssetsSection, ConcurrencyPolicy, ConfigError, PipelineSection, SculptConfig, SearchMode, SearchModeKind,
};
pub use error::PipelineError;
pub use executor::{ActionExecutor, Applied, SideEffect};
pub use feedback::{CommandReport, EntryStatus, FeedbackEntry};
pub use pipeline::CommandPipeline;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the pipeline
    pub use crate::{
        CommandPipeline, CommandReport, ConcurrencyPolicy, EntryStatus, FeedbackEntry, PipelineError, SculptConfig,
        SearchMode,
    };
    pub use sculpt_scene::{ObjectId, SceneEvent, SceneSnapshot, ShapeKind};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
