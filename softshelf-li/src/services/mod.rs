//! Ingest pipeline services

pub mod ai_client;
pub mod auto_matcher;
pub mod confidence;
pub mod filename_parser;
pub mod filename_validator;
pub mod reconciler;
pub mod review_queue;
pub mod scanner;
pub mod scheduler;
pub mod violations;

pub use ai_client::{AiProvider, Clarity, SynthesisError, TextSynthClient};
pub use auto_matcher::{AutoMatcher, MatchOptions};
pub use filename_parser::ParsedFilename;
pub use reconciler::Reconciler;
pub use review_queue::ReviewQueue;
pub use scanner::{ScanError, Scanner};
pub use scheduler::{IngestScheduler, SchedulerConfig};
pub use violations::ViolationOps;
