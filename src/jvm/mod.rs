//! Reading, validating, and writing JVM class files
//!
//! Only the subset of the format needed by the interpreter is modelled in detail. Anything else
//! (unknown attributes in particular) is checked for well-formedness and then skipped.

mod access_flags;
pub mod binary_format;
pub mod class_file;
pub mod descriptors;
mod errors;
pub mod names;
pub mod utf8;
mod version;

pub use access_flags::*;
pub use binary_format::Serialize;
pub use class_file::{ClassFile, Constant, ConstantPool};
pub use descriptors::{FieldType, MethodDescriptor, ParseDescriptor, RenderDescriptor};
pub use errors::*;
pub use names::{BinaryName, Name, UnqualifiedName};
pub use version::*;
