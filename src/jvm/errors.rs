use super::class_file::ConstantIndex;
use super::Version;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

/// Reasons a class file can fail to load
#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    InvalidMagic(u32),
    UnsupportedVersion(Version),
    InvalidConstantPoolCount,

    /// Input ended before the structure being read was complete
    UnexpectedEof(ReadContext),
    InvalidUtf8Bytes,
    InvalidConstantIndex(u16),
    UnknownConstantTag(u8),

    InvalidAccessFlags(FlagsOwner),
    ReservedAccessFlags(FlagsOwner),

    InvalidThisClassIndex(u16),
    InvalidSuperClassIndex(u16),
    InvalidInterfaceIndex(u16),

    InvalidFieldDescriptorIndex(u16),
    InvalidMethodDescriptorIndex(u16),
    InvalidNameIndex(u16),
    InvalidStringIndex(u16),
    InvalidClassIndex(u16),
    InvalidNameAndTypeIndex(u16),

    /// Attribute parser consumed a different number of bytes than the attribute declared
    AttributeLengthMismatch {
        declared: u32,
        consumed: u64,
    },
    InvalidConstantValueIndex(u16),
    InvalidSourceFileIndex(u16),
    InvalidInnerClassIndices,
    InvalidExceptionClassIndex(u16),
    InvalidCodeLength(u32),

    /// `Code` has fewer locals than the method's parameters need
    InvalidMaxLocals {
        max_locals: u16,
        parameters: usize,
    },

    /// There is data after the last class attribute
    TrailingBytes,
}

/// What was being read when input ran out
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ReadContext {
    Structure,
    ConstantPool,
    Utf8,
    Interfaces,
    AttributeInfo,
}

/// What a set of access flags was attached to
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FlagsOwner {
    Class,
    Field,
    Method,
    InnerClass,
}

impl Error {
    /// Stable numeric code for the error, as reported by the command line tool
    pub fn status_code(&self) -> i32 {
        match self {
            Error::UnsupportedVersion(_) => 1,
            Error::IoError(_) => 2,
            Error::InvalidMagic(_) => 3,
            Error::InvalidConstantPoolCount => 5,
            Error::UnexpectedEof(ReadContext::Structure) => 6,
            Error::UnexpectedEof(ReadContext::ConstantPool) => 7,
            Error::UnexpectedEof(ReadContext::Utf8) => 8,
            Error::UnexpectedEof(ReadContext::Interfaces) => 9,
            Error::UnexpectedEof(ReadContext::AttributeInfo) => 10,
            Error::InvalidUtf8Bytes => 11,
            Error::InvalidConstantIndex(_) => 12,
            Error::UnknownConstantTag(_) => 13,
            Error::InvalidAccessFlags(_) | Error::ReservedAccessFlags(FlagsOwner::InnerClass) => 14,
            Error::ReservedAccessFlags(FlagsOwner::Class) => 15,
            Error::ReservedAccessFlags(FlagsOwner::Method) => 16,
            Error::ReservedAccessFlags(FlagsOwner::Field) => 17,
            Error::InvalidThisClassIndex(_) => 18,
            Error::InvalidSuperClassIndex(_) => 19,
            Error::InvalidInterfaceIndex(_) => 20,
            Error::InvalidFieldDescriptorIndex(_) => 21,
            Error::InvalidMethodDescriptorIndex(_) => 22,
            Error::InvalidNameIndex(_) => 23,
            Error::InvalidStringIndex(_) => 24,
            Error::InvalidClassIndex(_) => 25,
            Error::InvalidNameAndTypeIndex(_) => 26,
            Error::AttributeLengthMismatch { .. } => 28,
            Error::InvalidConstantValueIndex(_) => 29,
            Error::InvalidSourceFileIndex(_) => 30,
            Error::InvalidInnerClassIndices => 31,
            Error::InvalidExceptionClassIndex(_) => 32,
            Error::InvalidCodeLength(_) => 33,
            Error::TrailingBytes => 34,
            Error::InvalidMaxLocals { .. } => 35,
        }
    }

    /// Turn a read failure into an error, remembering what was being read
    pub fn reading(context: ReadContext) -> impl Fn(io::Error) -> Error {
        move |err: io::Error| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                Error::UnexpectedEof(context)
            } else {
                Error::IoError(err)
            }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Error::IoError(err) => write!(f, "class file couldn't be opened ({})", err),
            Error::InvalidMagic(_) => f.write_str("signature (0xCAFEBABE) mismatch"),
            Error::UnsupportedVersion(_) => f.write_str("class file version isn't supported"),
            Error::InvalidConstantPoolCount => {
                f.write_str("constant pool count should be at least 1")
            }
            Error::UnexpectedEof(ReadContext::Structure) => {
                f.write_str("end of file found too soon")
            }
            Error::UnexpectedEof(ReadContext::ConstantPool) => {
                f.write_str("unexpected end of file while reading constant pool")
            }
            Error::UnexpectedEof(ReadContext::Utf8) => {
                f.write_str("unexpected end of file while reading UTF-8 stream")
            }
            Error::UnexpectedEof(ReadContext::Interfaces) => {
                f.write_str("unexpected end of file while reading interfaces' index")
            }
            Error::UnexpectedEof(ReadContext::AttributeInfo) => {
                f.write_str("unexpected end of file while reading attribute information")
            }
            Error::InvalidUtf8Bytes => f.write_str("invalid UTF-8 encoding"),
            Error::InvalidConstantIndex(_) => {
                f.write_str("invalid index for constant pool entry")
            }
            Error::UnknownConstantTag(_) => f.write_str("unknown constant pool entry tag"),
            Error::InvalidAccessFlags(_) => f.write_str("invalid combination of access flags"),
            Error::ReservedAccessFlags(owner) => {
                let owner = match owner {
                    FlagsOwner::Class => "class",
                    FlagsOwner::Field => "field",
                    FlagsOwner::Method => "method",
                    FlagsOwner::InnerClass => "inner class",
                };
                write!(f, "{} access flags contains bits that should be zero", owner)
            }
            Error::InvalidThisClassIndex(_) => {
                f.write_str("\"this Class\" field doesn't point to valid class index")
            }
            Error::InvalidSuperClassIndex(_) => {
                f.write_str("\"super class\" field doesn't point to valid class index")
            }
            Error::InvalidInterfaceIndex(_) => {
                f.write_str("interface index doesn't point to a valid class index")
            }
            Error::InvalidFieldDescriptorIndex(_) => f.write_str("field descriptor isn't valid"),
            Error::InvalidMethodDescriptorIndex(_) => {
                f.write_str("method descriptor isn't valid")
            }
            Error::InvalidNameIndex(_) => {
                f.write_str("name_index doesn't point to a valid name")
            }
            Error::InvalidStringIndex(_) => {
                f.write_str("string_index doesn't point to a valid UTF-8 stream")
            }
            Error::InvalidClassIndex(_) => {
                f.write_str("class_index doesn't point to a valid class name")
            }
            Error::InvalidNameAndTypeIndex(_) => f.write_str(
                "(NameAndType) name_index or descriptor_index doesn't point to a valid UTF-8 stream",
            ),
            Error::AttributeLengthMismatch { .. } => {
                f.write_str("Attribute length is different than expected")
            }
            Error::InvalidConstantValueIndex(_) => {
                f.write_str("constantvalue_index isn't a valid constant value index")
            }
            Error::InvalidSourceFileIndex(_) => {
                f.write_str("sourcefile_index isn't a valid source file index")
            }
            Error::InvalidInnerClassIndices => {
                f.write_str("InnerClass has at least one invalid index")
            }
            Error::InvalidExceptionClassIndex(_) => {
                f.write_str("Exceptions has an index that doesn't point to a valid class")
            }
            Error::InvalidCodeLength(_) => f.write_str(
                "Attribute code must have a length greater than 0 and less than 65536 bytes",
            ),
            Error::InvalidMaxLocals { .. } => {
                f.write_str("max_locals is too small to hold the method's parameters")
            }
            Error::TrailingBytes => f.write_str(
                "class file contains more data than expected, which wasn't processed",
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::reading(ReadContext::Structure)(err)
    }
}

/// How far loading got, compared with what the class file declared
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct LoadProgress {
    pub bytes_read: u64,

    /// Slots of the constant pool, including the unusable slot zero
    pub constant_pool: ListProgress,

    /// Pool index of the entry that failed validation
    pub invalid_constant: Option<ConstantIndex>,

    pub interfaces: ListProgress,
    pub fields: ListProgress,
    pub methods: ListProgress,

    /// The attribute list currently being parsed
    pub attributes: ListProgress,

    /// Tag of the last constant pool entry read
    pub last_tag: Option<u8>,
}

/// Entries of a counted list that were fully processed, and how many there should be
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct ListProgress {
    pub declared: u16,
    pub read: u16,
}

impl ListProgress {
    /// Start a list of `declared` entries
    pub fn start(&mut self, declared: u16) {
        *self = ListProgress { declared, read: 0 };
    }

    pub fn is_complete(&self) -> bool {
        self.read == self.declared
    }
}

impl Display for ListProgress {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.read, self.declared)
    }
}

/// A failed load, along with how far it got
#[derive(Debug)]
pub struct LoadError {
    pub error: Error,
    pub progress: LoadProgress,
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn eof_keeps_context() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "short");
        let err = Error::reading(ReadContext::Interfaces)(eof);
        assert!(matches!(err, Error::UnexpectedEof(ReadContext::Interfaces)));
        assert_eq!(err.status_code(), 9);

        let other = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(Error::from(other), Error::IoError(_)));
    }

    #[test]
    fn messages() {
        assert_eq!(
            Error::InvalidMagic(0xDEADBEEF).to_string(),
            "signature (0xCAFEBABE) mismatch"
        );
        assert_eq!(
            Error::ReservedAccessFlags(FlagsOwner::Method).to_string(),
            "method access flags contains bits that should be zero"
        );
        assert_eq!(Error::TrailingBytes.status_code(), 34);
        let locals = Error::InvalidMaxLocals {
            max_locals: 0,
            parameters: 1,
        };
        assert_eq!(locals.status_code(), 35);
    }
}
