// Market data domain
pub mod bar;
pub mod period;

pub use bar::{Bar, Series};
pub use period::Period;
