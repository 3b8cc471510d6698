// The engine: the top-level analysis pipeline and its HTTP handlers.

pub mod handlers;
pub mod pipeline;

pub use pipeline::{AnalysisRun, AtsEngine};
