// Domain layer: paywall models and the backend port. No I/O here.

pub mod model;
pub mod ports;
