use crate::jvm;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

/// Faults which stop execution
#[derive(Debug)]
pub enum Error {
    /// No class file found for the class
    ClassResolutionFailed(String),

    /// Class file was found, but it failed to load
    ClassLoad { name: String, error: jvm::LoadError },

    /// The class passed to `Vm::run_main` could not be resolved
    MainClassResolutionFailed(Box<Error>),

    MethodResolutionFailed {
        class: String,
        name: String,
        descriptor: String,
    },
    FieldResolutionFailed {
        class: String,
        name: String,
        descriptor: String,
    },
    MainMethodNotFound(String),

    UnknownInstruction { opcode: u8, pc: usize },

    /// Operands of the instruction are truncated or malformed
    InvalidInstructionParameters { opcode: u8, pc: usize },
    InvalidBranchTarget { pc: usize, target: i64 },

    /// Constant pool entry has the wrong kind for the instruction using it
    InvalidConstant(u16),

    NullPointer,
    ArrayIndexOutOfBounds { index: i32, length: usize },
    NegativeArraySize(i32),
    InvalidArrayDimensions,

    /// Array element kind doesn't match the instruction
    InvalidArrayType,

    /// Operand word does not refer to a live object
    InvalidReference(u32),
    InvalidLocal(usize),
    StackUnderflow,

    /// Integer division or remainder by zero
    ArithmeticException,
    Unimplemented(&'static str),
    OutOfMemory,
    StackOverflow(usize),
    StepLimitExceeded(u64),
    IoError(io::Error),
}

impl Error {
    /// Stable numeric code for the error, as reported by the command line tool
    ///
    /// `0` is reserved for success.
    pub fn status_code(&self) -> i32 {
        match self {
            Error::MainClassResolutionFailed(_) => 2,
            Error::ClassResolutionFailed(_) | Error::ClassLoad { .. } => 3,
            Error::MethodResolutionFailed { .. } => 4,
            Error::FieldResolutionFailed { .. } => 5,
            Error::UnknownInstruction { .. } => 6,
            Error::OutOfMemory => 7,
            Error::MainMethodNotFound(_) => 8,
            Error::InvalidInstructionParameters { .. } => 9,
            Error::InvalidBranchTarget { .. } => 10,
            Error::InvalidConstant(_) => 11,
            Error::NullPointer => 12,
            Error::ArrayIndexOutOfBounds { .. } => 13,
            Error::NegativeArraySize(_) => 14,
            Error::InvalidArrayDimensions => 15,
            Error::InvalidArrayType => 16,
            Error::InvalidLocal(_) => 17,
            Error::StackUnderflow => 18,
            Error::ArithmeticException => 19,
            Error::Unimplemented(_) => 20,
            Error::StackOverflow(_) => 21,
            Error::StepLimitExceeded(_) => 22,
            Error::IoError(_) => 23,
            Error::InvalidReference(_) => 24,
        }
    }

    /// Innermost error (looking through `MainClassResolutionFailed`)
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::MainClassResolutionFailed(cause) => cause.root_cause(),
            other => other,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Error::ClassResolutionFailed(name) => write!(f, "Class resolution failed ({})", name),
            Error::ClassLoad { name, error } => {
                write!(f, "Class resolution failed ({}: {})", name, error)
            }
            Error::MainClassResolutionFailed(cause) => {
                write!(f, "Main class resolution failed ({})", cause)
            }
            Error::MethodResolutionFailed {
                class,
                name,
                descriptor,
            } => write!(
                f,
                "Method resolution failed ({}.{}{})",
                class, name, descriptor
            ),
            Error::FieldResolutionFailed {
                class,
                name,
                descriptor,
            } => write!(
                f,
                "Field resolution failed ({}.{}:{})",
                class, name, descriptor
            ),
            Error::MainMethodNotFound(class) => write!(f, "Main method not found ({})", class),
            Error::UnknownInstruction { opcode, pc } => {
                write!(f, "Unknown instruction (0x{:02X} at {})", opcode, pc)
            }
            Error::InvalidInstructionParameters { opcode, pc } => write!(
                f,
                "Invalid instruction parameters (0x{:02X} at {})",
                opcode, pc
            ),
            Error::InvalidBranchTarget { pc, target } => {
                write!(f, "Invalid branch target ({} from {})", target, pc)
            }
            Error::InvalidConstant(idx) => write!(f, "Invalid constant (#{})", idx),
            Error::NullPointer => f.write_str("Null pointer"),
            Error::ArrayIndexOutOfBounds { index, length } => write!(
                f,
                "Array index out of bounds (index {}, length {})",
                index, length
            ),
            Error::NegativeArraySize(count) => write!(f, "Negative array size ({})", count),
            Error::InvalidArrayDimensions => f.write_str("Invalid array dimensions"),
            Error::InvalidArrayType => f.write_str("Invalid array type"),
            Error::InvalidReference(handle) => write!(f, "Invalid reference ({})", handle),
            Error::InvalidLocal(idx) => write!(f, "Invalid local variable ({})", idx),
            Error::StackUnderflow => f.write_str("Operand stack underflow"),
            Error::ArithmeticException => f.write_str("Arithmetic exception (/ by zero)"),
            Error::Unimplemented(what) => write!(f, "Unimplemented ({})", what),
            Error::OutOfMemory => f.write_str("Out of memory"),
            Error::StackOverflow(depth) => write!(f, "Stack overflow (depth {})", depth),
            Error::StepLimitExceeded(steps) => {
                write!(f, "Step limit exceeded ({} instructions)", steps)
            }
            Error::IoError(err) => write!(f, "I/O error ({})", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ClassLoad { error, .. } => Some(error),
            Error::MainClassResolutionFailed(cause) => Some(cause.as_ref()),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Error {
        Error::OutOfMemory
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_and_messages() {
        let err = Error::MainClassResolutionFailed(Box::new(Error::ClassResolutionFailed(
            "Missing".to_string(),
        )));
        assert_eq!(err.status_code(), 2);
        assert_eq!(err.root_cause().status_code(), 3);
        assert_eq!(
            err.to_string(),
            "Main class resolution failed (Class resolution failed (Missing))"
        );

        let err = Error::ArrayIndexOutOfBounds {
            index: 3,
            length: 3,
        };
        assert_eq!(
            err.to_string(),
            "Array index out of bounds (index 3, length 3)"
        );
        assert_eq!(Error::OutOfMemory.status_code(), 7);
    }
}
