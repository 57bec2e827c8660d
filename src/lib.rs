//! Loader and interpreter for a small subset of the Java Virtual Machine
//!
//! [`jvm`] reads and validates class files. [`runtime`] resolves classes against a class path
//! and executes their bytecode, with a few classes from `java.lang` simulated natively.

pub mod jvm;
pub mod runtime;
mod util;
