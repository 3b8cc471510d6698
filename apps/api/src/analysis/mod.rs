// Component analysis: concurrent sub-analyses over the AI text capability.
// All provider calls go through llm_client::TextCapability.

pub mod analyzer;
pub mod components;
pub mod prompts;

pub use analyzer::ComponentAnalyzer;
pub use components::{ComponentName, ComponentReport, ComponentScore};
