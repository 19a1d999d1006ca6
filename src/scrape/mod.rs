//! Markup -> dataset: locate the table, parse rows, coerce fields, assemble.

pub mod assembler;
pub mod locator;
pub mod normalize;
pub mod parser;

pub use assembler::{assemble, Dataset};
pub use locator::{locate, RowScope, TableSelector, TableTarget};
pub use normalize::{coerce_date, coerce_number, normalize_row};
pub use parser::{parse_row, Rejection, RowOutcome};
