//! Chart engine: configuration, clock injection and the aggregate entry point

pub mod builder;
pub mod traits;

pub use builder::{ChartEngine, ChartEngineBuilder};
pub use traits::{Clock, FixedClock, SystemClock};
