pub mod goals;
pub mod metrics;
pub mod period;
pub mod rules;
