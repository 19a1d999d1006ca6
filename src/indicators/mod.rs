pub mod registry;

pub use registry::{Category, IndicatorSpec, Registry, RowOrder};
