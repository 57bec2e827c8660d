//! Decoded form of JVM bytecode. The representation differs from the raw opcodes in a few ways
//! that make execution simpler:
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instructions it is allowed to modify
//!
//!   - Families of instructions (like the `iconst_<n>` constants, the array loads, or the
//!     conditional branches) get abstracted into one instruction with a field
//!
//!   - Branch offsets are resolved into absolute targets, and checked to be inside the code
//!

use super::{ArrayKind, Error};
use crate::jvm::descriptors::BaseType;
use std::cmp::Ordering;

/// JVM bytecode instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConst(i32), // covers `iconst_m1` through `iconst_5`
    LConst(i64),
    FConst(f32),
    DConst(f64),
    BiPush(i8),
    SiPush(i16),
    Ldc(u16), // covers both `ldc` and `ldc_w`
    Ldc2(u16),
    ILoad(u16), // covers `iload`, `iload_<n>`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    ArrayLoad(ArrayKind), // covers `iaload`, `laload`, ..., `saload`
    IStore(u16),          // covers `istore`, `istore_<n>`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    ArrayStore(ArrayKind),
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishl`, `ishr`, and `iushr`
    LSh(ShiftType), // covers `lshl`, `lshr`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    If(OrdComparison, usize),
    IfICmp(OrdComparison, usize),
    IfACmp(EqComparison, usize),
    IfNull(EqComparison, usize), // covers `ifnull` and `ifnonnull`
    Goto(usize),                 // covers `goto` and `goto_w`
    Jsr(usize),                  // covers `jsr` and `jsr_w`
    Ret(u16),
    TableSwitch {
        default: usize,
        low: i32,
        targets: Vec<usize>,
    },
    LookupSwitch {
        default: usize,
        targets: Vec<(i32, usize)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    GetStatic(u16),
    PutStatic(u16),
    GetField(u16),
    PutField(u16),
    Invoke(InvokeType, u16),
    InvokeDynamic(u16),
    New(u16),
    NewArray(BaseType),
    ANewArray(u16),
    ArrayLength,
    AThrow,
    CheckCast(u16),
    InstanceOf(u16),
    MonitorEnter,
    MonitorExit,
    MultiANewArray(u16, u8),
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

impl CompareMode {
    /// Result of `fcmp<mode>` or `dcmp<mode>` given how the operands compare
    pub fn result(self, ordering: Option<Ordering>) -> i32 {
        match (ordering, self) {
            (Some(Ordering::Less), _) | (None, CompareMode::L) => -1,
            (Some(Ordering::Equal), _) => 0,
            (Some(Ordering::Greater), _) | (None, CompareMode::G) => 1,
        }
    }
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl OrdComparison {
    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            OrdComparison::EQ => lhs == rhs,
            OrdComparison::GE => lhs >= rhs,
            OrdComparison::GT => lhs > rhs,
            OrdComparison::LE => lhs <= rhs,
            OrdComparison::LT => lhs < rhs,
            OrdComparison::NE => lhs != rhs,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl EqComparison {
    pub fn holds<T: PartialEq>(self, lhs: T, rhs: T) -> bool {
        match self {
            EqComparison::EQ => lhs == rhs,
            EqComparison::NE => lhs != rhs,
        }
    }
}

/// Type of method to invoke
///
/// Note: `InvokeDynamic` is kept separate because the constant argument it expects is not to a
/// `Constant::MethodRef`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface(u8), // `count` is of total arguments, where `long`/`double` count for 2
}

/// Cursor over the operands of the instruction starting at `start`
struct Operands<'a> {
    code: &'a [u8],
    start: usize,
    pos: usize,
    opcode: u8,
}

impl<'a> Operands<'a> {
    fn invalid(&self) -> Error {
        Error::InvalidInstructionParameters {
            opcode: self.opcode,
            pc: self.start,
        }
    }

    fn bytes<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let end = self.pos + N;
        let mut buffer = [0u8; N];
        buffer.copy_from_slice(self.code.get(self.pos..end).ok_or_else(|| self.invalid())?);
        self.pos = end;
        Ok(buffer)
    }

    fn u8(&mut self) -> Result<u8, Error> {
        self.bytes::<1>().map(|[byte]| byte)
    }

    fn i8(&mut self) -> Result<i8, Error> {
        self.u8().map(|byte| byte as i8)
    }

    fn u16(&mut self) -> Result<u16, Error> {
        self.bytes().map(u16::from_be_bytes)
    }

    fn i16(&mut self) -> Result<i16, Error> {
        self.bytes().map(i16::from_be_bytes)
    }

    fn i32(&mut self) -> Result<i32, Error> {
        self.bytes().map(i32::from_be_bytes)
    }

    /// Absolute target of a jump relative to the start of the instruction
    fn target(&self, offset: i32) -> Result<usize, Error> {
        let target = self.start as i64 + offset as i64;
        if target >= 0 && (target as usize) < self.code.len() {
            Ok(target as usize)
        } else {
            Err(Error::InvalidBranchTarget {
                pc: self.start,
                target,
            })
        }
    }

    fn branch16(&mut self) -> Result<usize, Error> {
        let offset = self.i16()?;
        self.target(offset as i32)
    }

    fn branch32(&mut self) -> Result<usize, Error> {
        let offset = self.i32()?;
        self.target(offset)
    }

    /// Skip to the next 4-byte boundary (measured from the start of the code)
    fn align(&mut self) -> Result<(), Error> {
        let padding = (4 - self.pos % 4) % 4;
        if self.pos + padding > self.code.len() {
            return Err(self.invalid());
        }
        self.pos += padding;
        Ok(())
    }

    /// Check that `count` entries of `entry_size` bytes could still follow
    fn check_remaining(&self, count: i64, entry_size: i64) -> Result<usize, Error> {
        let remaining = (self.code.len() - self.pos) as i64;
        if count < 0 || count * entry_size > remaining {
            Err(self.invalid())
        } else {
            Ok(count as usize)
        }
    }
}

/// Decode the instruction at `pc`, returning it along with the offset of the next instruction
pub fn decode(code: &[u8], pc: usize) -> Result<(Instruction, usize), Error> {
    use Instruction::*;

    let opcode = *code.get(pc).ok_or(Error::InvalidBranchTarget {
        pc,
        target: pc as i64,
    })?;
    let mut ops = Operands {
        code,
        start: pc,
        pos: pc + 1,
        opcode,
    };

    let instruction = match opcode {
        0x00 => Nop,
        0x01 => AConstNull,
        0x02..=0x08 => IConst(opcode as i32 - 0x03),
        0x09 | 0x0a => LConst(opcode as i64 - 0x09),
        0x0b..=0x0d => FConst((opcode - 0x0b) as f32),
        0x0e | 0x0f => DConst((opcode - 0x0e) as f64),
        0x10 => BiPush(ops.i8()?),
        0x11 => SiPush(ops.i16()?),
        0x12 => Ldc(ops.u8()? as u16),
        0x13 => Ldc(ops.u16()?),
        0x14 => Ldc2(ops.u16()?),
        0x15 => ILoad(ops.u8()? as u16),
        0x16 => LLoad(ops.u8()? as u16),
        0x17 => FLoad(ops.u8()? as u16),
        0x18 => DLoad(ops.u8()? as u16),
        0x19 => ALoad(ops.u8()? as u16),
        0x1a..=0x1d => ILoad((opcode - 0x1a) as u16),
        0x1e..=0x21 => LLoad((opcode - 0x1e) as u16),
        0x22..=0x25 => FLoad((opcode - 0x22) as u16),
        0x26..=0x29 => DLoad((opcode - 0x26) as u16),
        0x2a..=0x2d => ALoad((opcode - 0x2a) as u16),
        0x2e => ArrayLoad(ArrayKind::Int),
        0x2f => ArrayLoad(ArrayKind::Long),
        0x30 => ArrayLoad(ArrayKind::Float),
        0x31 => ArrayLoad(ArrayKind::Double),
        0x32 => ArrayLoad(ArrayKind::Reference),
        0x33 => ArrayLoad(ArrayKind::Byte),
        0x34 => ArrayLoad(ArrayKind::Char),
        0x35 => ArrayLoad(ArrayKind::Short),
        0x36 => IStore(ops.u8()? as u16),
        0x37 => LStore(ops.u8()? as u16),
        0x38 => FStore(ops.u8()? as u16),
        0x39 => DStore(ops.u8()? as u16),
        0x3a => AStore(ops.u8()? as u16),
        0x3b..=0x3e => IStore((opcode - 0x3b) as u16),
        0x3f..=0x42 => LStore((opcode - 0x3f) as u16),
        0x43..=0x46 => FStore((opcode - 0x43) as u16),
        0x47..=0x4a => DStore((opcode - 0x47) as u16),
        0x4b..=0x4e => AStore((opcode - 0x4b) as u16),
        0x4f => ArrayStore(ArrayKind::Int),
        0x50 => ArrayStore(ArrayKind::Long),
        0x51 => ArrayStore(ArrayKind::Float),
        0x52 => ArrayStore(ArrayKind::Double),
        0x53 => ArrayStore(ArrayKind::Reference),
        0x54 => ArrayStore(ArrayKind::Byte),
        0x55 => ArrayStore(ArrayKind::Char),
        0x56 => ArrayStore(ArrayKind::Short),
        0x57 => Pop,
        0x58 => Pop2,
        0x59 => Dup,
        0x5a => DupX1,
        0x5b => DupX2,
        0x5c => Dup2,
        0x5d => Dup2X1,
        0x5e => Dup2X2,
        0x5f => Swap,
        0x60 => IAdd,
        0x61 => LAdd,
        0x62 => FAdd,
        0x63 => DAdd,
        0x64 => ISub,
        0x65 => LSub,
        0x66 => FSub,
        0x67 => DSub,
        0x68 => IMul,
        0x69 => LMul,
        0x6a => FMul,
        0x6b => DMul,
        0x6c => IDiv,
        0x6d => LDiv,
        0x6e => FDiv,
        0x6f => DDiv,
        0x70 => IRem,
        0x71 => LRem,
        0x72 => FRem,
        0x73 => DRem,
        0x74 => INeg,
        0x75 => LNeg,
        0x76 => FNeg,
        0x77 => DNeg,
        0x78 => ISh(ShiftType::Left),
        0x79 => LSh(ShiftType::Left),
        0x7a => ISh(ShiftType::ArithmeticRight),
        0x7b => LSh(ShiftType::ArithmeticRight),
        0x7c => ISh(ShiftType::LogicalRight),
        0x7d => LSh(ShiftType::LogicalRight),
        0x7e => IAnd,
        0x7f => LAnd,
        0x80 => IOr,
        0x81 => LOr,
        0x82 => IXor,
        0x83 => LXor,
        0x84 => IInc(ops.u8()? as u16, ops.i8()? as i16),
        0x85 => I2L,
        0x86 => I2F,
        0x87 => I2D,
        0x88 => L2I,
        0x89 => L2F,
        0x8a => L2D,
        0x8b => F2I,
        0x8c => F2L,
        0x8d => F2D,
        0x8e => D2I,
        0x8f => D2L,
        0x90 => D2F,
        0x91 => I2B,
        0x92 => I2C,
        0x93 => I2S,
        0x94 => LCmp,
        0x95 => FCmp(CompareMode::L),
        0x96 => FCmp(CompareMode::G),
        0x97 => DCmp(CompareMode::L),
        0x98 => DCmp(CompareMode::G),
        0x99 => If(OrdComparison::EQ, ops.branch16()?),
        0x9a => If(OrdComparison::NE, ops.branch16()?),
        0x9b => If(OrdComparison::LT, ops.branch16()?),
        0x9c => If(OrdComparison::GE, ops.branch16()?),
        0x9d => If(OrdComparison::GT, ops.branch16()?),
        0x9e => If(OrdComparison::LE, ops.branch16()?),
        0x9f => IfICmp(OrdComparison::EQ, ops.branch16()?),
        0xa0 => IfICmp(OrdComparison::NE, ops.branch16()?),
        0xa1 => IfICmp(OrdComparison::LT, ops.branch16()?),
        0xa2 => IfICmp(OrdComparison::GE, ops.branch16()?),
        0xa3 => IfICmp(OrdComparison::GT, ops.branch16()?),
        0xa4 => IfICmp(OrdComparison::LE, ops.branch16()?),
        0xa5 => IfACmp(EqComparison::EQ, ops.branch16()?),
        0xa6 => IfACmp(EqComparison::NE, ops.branch16()?),
        0xa7 => Goto(ops.branch16()?),
        0xa8 => Jsr(ops.branch16()?),
        0xa9 => Ret(ops.u8()? as u16),
        0xaa => {
            ops.align()?;
            let default = ops.branch32()?;
            let low = ops.i32()?;
            let high = ops.i32()?;
            let count = ops.check_remaining(high as i64 - low as i64 + 1, 4)?;
            let targets = (0..count)
                .map(|_| ops.branch32())
                .collect::<Result<Vec<_>, _>>()?;
            TableSwitch {
                default,
                low,
                targets,
            }
        }
        0xab => {
            ops.align()?;
            let default = ops.branch32()?;
            let npairs = ops.i32()?;
            let count = ops.check_remaining(npairs as i64, 8)?;
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                let key = ops.i32()?;
                targets.push((key, ops.branch32()?));
            }
            LookupSwitch { default, targets }
        }
        0xac => IReturn,
        0xad => LReturn,
        0xae => FReturn,
        0xaf => DReturn,
        0xb0 => AReturn,
        0xb1 => Return,
        0xb2 => GetStatic(ops.u16()?),
        0xb3 => PutStatic(ops.u16()?),
        0xb4 => GetField(ops.u16()?),
        0xb5 => PutField(ops.u16()?),
        0xb6 => Invoke(InvokeType::Virtual, ops.u16()?),
        0xb7 => Invoke(InvokeType::Special, ops.u16()?),
        0xb8 => Invoke(InvokeType::Static, ops.u16()?),
        0xb9 => {
            let index = ops.u16()?;
            let count = ops.u8()?;
            if ops.u8()? != 0 {
                log::warn!("invokeinterface at {} has a non-zero reserved byte", pc);
            }
            Invoke(InvokeType::Interface(count), index)
        }
        0xba => {
            let index = ops.u16()?;
            ops.u16()?;
            InvokeDynamic(index)
        }
        0xbb => New(ops.u16()?),
        0xbc => {
            let atype = ops.u8()?;
            NewArray(BaseType::from_array_type_code(atype).ok_or_else(|| ops.invalid())?)
        }
        0xbd => ANewArray(ops.u16()?),
        0xbe => ArrayLength,
        0xbf => AThrow,
        0xc0 => CheckCast(ops.u16()?),
        0xc1 => InstanceOf(ops.u16()?),
        0xc2 => MonitorEnter,
        0xc3 => MonitorExit,
        0xc4 => match ops.u8()? {
            0x15 => ILoad(ops.u16()?),
            0x16 => LLoad(ops.u16()?),
            0x17 => FLoad(ops.u16()?),
            0x18 => DLoad(ops.u16()?),
            0x19 => ALoad(ops.u16()?),
            0x36 => IStore(ops.u16()?),
            0x37 => LStore(ops.u16()?),
            0x38 => FStore(ops.u16()?),
            0x39 => DStore(ops.u16()?),
            0x3a => AStore(ops.u16()?),
            0xa9 => Ret(ops.u16()?),
            0x84 => IInc(ops.u16()?, ops.i16()?),
            _ => return Err(ops.invalid()),
        },
        0xc5 => MultiANewArray(ops.u16()?, ops.u8()?),
        0xc6 => IfNull(EqComparison::EQ, ops.branch16()?),
        0xc7 => IfNull(EqComparison::NE, ops.branch16()?),
        0xc8 => Goto(ops.branch32()?),
        0xc9 => Jsr(ops.branch32()?),
        _ => return Err(Error::UnknownInstruction { opcode, pc }),
    };

    Ok((instruction, ops.pos))
}
