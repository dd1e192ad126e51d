pub mod precision;
pub mod progress;
