pub mod patterns;
pub mod pipeline;
pub mod scorer;
pub mod search;
pub mod telemetry;
