//! Execution of loaded classes
//!
//! A [`Vm`] is one session: it owns the class registry, the heap, and the call stack. Classes
//! are resolved lazily from the working directory and the configured class path, and methods
//! are run by decoding their bytecode one instruction at a time.

mod bytecode;
mod classes;
mod errors;
mod frame;
mod heap;
mod interpreter;
pub mod natives;
mod settings;
mod stack;
mod value;
mod vm;

pub use bytecode::*;
pub use classes::*;
pub use errors::*;
pub use frame::*;
pub use heap::*;
pub use settings::*;
pub use stack::*;
pub use value::*;
pub use vm::*;
