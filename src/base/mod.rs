pub mod config;
pub mod counters;
pub mod monitor;
pub mod runner;
pub mod transaction;
