use crate::util::Width;
use std::fmt;

/// Reference to an object on the heap
///
/// Handles are opaque indices, never addresses. Handle `0` is `null`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Handle(pub u32);

impl Handle {
    pub const NULL: Handle = Handle(0);

    pub fn is_null(self) -> bool {
        self == Handle::NULL
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// What an operand word holds
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum OperandKind {
    Int,
    Float,
    Long,
    Double,
    Reference,
    ReturnAddress,
    Null,
}

/// One 32-bit word of the operand stack (or of local variables, static storage, instance slots)
///
/// `long` and `double` are stored as two words of the same kind, high word first.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Operand {
    pub kind: OperandKind,
    pub value: u32,
}

impl Default for Operand {
    fn default() -> Operand {
        Operand::int(0)
    }
}

impl Operand {
    pub const NULL: Operand = Operand {
        kind: OperandKind::Null,
        value: 0,
    };

    pub const fn int(value: i32) -> Operand {
        Operand {
            kind: OperandKind::Int,
            value: value as u32,
        }
    }

    pub fn float(value: f32) -> Operand {
        Operand {
            kind: OperandKind::Float,
            value: value.to_bits(),
        }
    }

    pub fn reference(handle: Handle) -> Operand {
        if handle.is_null() {
            Operand::NULL
        } else {
            Operand {
                kind: OperandKind::Reference,
                value: handle.0,
            }
        }
    }

    pub const fn return_address(pc: u32) -> Operand {
        Operand {
            kind: OperandKind::ReturnAddress,
            value: pc,
        }
    }

    /// High word, then low word
    pub const fn long(value: i64) -> [Operand; 2] {
        Operand::split(OperandKind::Long, value as u64)
    }

    /// High word, then low word
    pub fn double(value: f64) -> [Operand; 2] {
        Operand::split(OperandKind::Double, value.to_bits())
    }

    const fn split(kind: OperandKind, bits: u64) -> [Operand; 2] {
        [
            Operand {
                kind,
                value: (bits >> 32) as u32,
            },
            Operand {
                kind,
                value: bits as u32,
            },
        ]
    }

    /// Reassemble a category 2 value from its high and low words
    pub const fn join(high: Operand, low: Operand) -> u64 {
        ((high.value as u64) << 32) | low.value as u64
    }

    pub fn as_int(self) -> i32 {
        self.value as i32
    }

    pub fn as_float(self) -> f32 {
        f32::from_bits(self.value)
    }

    pub fn as_handle(self) -> Handle {
        match self.kind {
            OperandKind::Null => Handle::NULL,
            _ => Handle(self.value),
        }
    }
}

/// Typed value, as read from a field, an array, or the constant pool
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Value {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Reference(Handle),
}

impl Value {
    /// Operand words for the value (one or two)
    pub fn words(self) -> Vec<Operand> {
        match self {
            Value::Int(value) => vec![Operand::int(value)],
            Value::Float(value) => vec![Operand::float(value)],
            Value::Long(value) => Operand::long(value).to_vec(),
            Value::Double(value) => Operand::double(value).to_vec(),
            Value::Reference(handle) => vec![Operand::reference(handle)],
        }
    }
}

impl Width for Value {
    fn width(&self) -> usize {
        match self {
            Value::Long(_) | Value::Double(_) => 2,
            _ => 1,
        }
    }
}
