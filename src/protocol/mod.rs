pub mod transport;
pub mod ubx;
