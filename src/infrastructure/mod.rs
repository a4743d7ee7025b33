pub mod core;
pub mod csv_data;
pub mod factory;
pub mod mock;
pub mod observability;
pub mod persistence;
pub mod yahoo;

pub use factory::ProviderFactory;
pub use persistence::ArtifactStore;
