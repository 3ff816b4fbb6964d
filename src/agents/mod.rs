//! The three pipeline stages: plan generation, step execution, verification.

pub mod executor;
pub mod planner;
pub mod verifier;

pub use executor::Executor;
pub use planner::Planner;
pub use verifier::Verifier;
