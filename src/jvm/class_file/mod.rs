//! In-memory model of a `.class` file, and the loader which builds it

mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod parser;

pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use parser::*;
