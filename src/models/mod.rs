pub mod features;
pub mod landmarks;
pub mod metrics;
pub mod plan;
pub mod progress;
pub mod rewards;
pub mod session;
pub mod settings;
