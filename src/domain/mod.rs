// Market data domain
pub mod market;

// Forecasting domain (normalization, windowing, manifests)
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
