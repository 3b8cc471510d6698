// Score aggregation: policy-driven weighting, bonus and status classification,
// plus the consistency validator that runs ahead of every aggregation.

pub mod aggregator;
pub mod policy;
pub mod recommendation;
pub mod validator;

pub use aggregator::{Aggregator, AtsResult};
pub use policy::{CategoryStatus, ScoringPolicy};
pub use recommendation::{build_recommendation, Recommendation};
