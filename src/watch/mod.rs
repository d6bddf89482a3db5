pub mod engine;
pub mod reconciler;
pub mod rules;
pub mod snapshot;
