pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod seeds;
pub mod server;
pub mod strategy;
pub mod usage;

pub use completion::{ChatCompletionClient, CompletionClient, SamplingConfig};
pub use config::{Config, ConfigManager};
pub use context::{ContextEnricher, HttpContextEnricher, LiveContext, Lookup};
pub use error::{CaptionError, ContextError};
pub use normalize::CaptionNormalizer;
pub use orchestrator::{CaptionOrchestrator, CaptionRequest, CaptionResult};
pub use seeds::SeedPool;
pub use strategy::Strategy;
pub use usage::UsageTracker;
