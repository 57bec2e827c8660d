use crate::jvm::binary_format::{ClassReader, Serialize};
use crate::jvm::class_file::{ClassConstantIndex, Constant, ConstantIndex, ConstantPool, Utf8ConstantIndex};
use crate::jvm::{Error, InnerClassAccessFlags, ListProgress, ReadContext};
use byteorder::WriteBytesExt;
use std::io::Read;

/// Attributes (used in classes, fields, methods, and on the `Code` attribute)
///
/// Attributes the loader does not understand are skipped, and only their length is kept.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: AttributeInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    ConstantValue(ConstantValue),
    SourceFile(SourceFile),
    InnerClasses(InnerClasses),
    Code(Code),
    LineNumberTable(LineNumberTable),
    Exceptions(Exceptions),
    Deprecated,

    /// Skipped attribute, along with its length
    Unknown(u32),
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;

        let mut info: Vec<u8> = vec![];
        match &self.info {
            AttributeInfo::ConstantValue(attr) => attr.serialize(&mut info)?,
            AttributeInfo::SourceFile(attr) => attr.serialize(&mut info)?,
            AttributeInfo::InnerClasses(attr) => attr.serialize(&mut info)?,
            AttributeInfo::Code(attr) => attr.serialize(&mut info)?,
            AttributeInfo::LineNumberTable(attr) => attr.serialize(&mut info)?,
            AttributeInfo::Exceptions(attr) => attr.serialize(&mut info)?,
            AttributeInfo::Deprecated => (),
            AttributeInfo::Unknown(len) => info.resize(*len as usize, 0),
        }

        // Attribute info length is 4 bytes
        (info.len() as u32).serialize(writer)?;
        writer.write_all(&info)?;

        Ok(())
    }
}

impl Attribute {
    /// Make an attribute, adding its name to the constant pool if needed
    pub fn new<A: AttributeLike>(constants: &mut ConstantPool, attribute: A) -> Attribute {
        Attribute {
            name_index: constants.get_utf8(A::NAME),
            info: attribute.into_info(),
        }
    }

    /// Read one attribute, checking that its declared length matches what was parsed
    pub fn read<R: Read>(
        reader: &mut ClassReader<R>,
        constants: &ConstantPool,
    ) -> Result<Attribute, Error> {
        let eof = Error::reading(ReadContext::AttributeInfo);

        let name_index = reader.read_u16().map_err(&eof)?;
        let name = constants
            .utf8(ConstantIndex(name_index))
            .ok_or(Error::InvalidNameIndex(name_index))?;
        let declared = reader.read_u32().map_err(&eof)?;
        let start = reader.bytes_read();

        let info = match name {
            "ConstantValue" => {
                AttributeInfo::ConstantValue(ConstantValue::read(reader, constants)?)
            }
            "SourceFile" => AttributeInfo::SourceFile(SourceFile::read(reader, constants)?),
            "InnerClasses" => {
                AttributeInfo::InnerClasses(InnerClasses::read(reader, constants)?)
            }
            "Code" => AttributeInfo::Code(Code::read(reader, constants)?),
            "LineNumberTable" => AttributeInfo::LineNumberTable(LineNumberTable::read(reader)?),
            "Exceptions" => AttributeInfo::Exceptions(Exceptions::read(reader, constants)?),
            "Deprecated" => AttributeInfo::Deprecated,
            _ => {
                reader.skip(declared as u64).map_err(&eof)?;
                AttributeInfo::Unknown(declared)
            }
        };

        let consumed = reader.bytes_read() - start;
        if consumed != declared as u64 {
            return Err(Error::AttributeLengthMismatch { declared, consumed });
        }

        Ok(Attribute {
            name_index: Utf8ConstantIndex(ConstantIndex(name_index)),
            info,
        })
    }

    /// Read a `u16`-prefixed list of attributes
    ///
    /// `progress` counts the attributes successfully parsed, so that it is accurate even on
    /// failure.
    pub fn read_list<R: Read>(
        reader: &mut ClassReader<R>,
        constants: &ConstantPool,
        progress: &mut ListProgress,
    ) -> Result<Vec<Attribute>, Error> {
        *progress = ListProgress::default();
        let count = reader
            .read_u16()
            .map_err(Error::reading(ReadContext::AttributeInfo))?;
        progress.start(count);
        let mut attributes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            attributes.push(Attribute::read(reader, constants)?);
            progress.read += 1;
        }
        Ok(attributes)
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;

    fn into_info(self) -> AttributeInfo;
}

fn read_index<R: Read>(reader: &mut ClassReader<R>) -> Result<u16, Error> {
    reader
        .read_u16()
        .map_err(Error::reading(ReadContext::AttributeInfo))
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantValue(pub ConstantIndex);

impl ConstantValue {
    fn read<R: Read>(reader: &mut ClassReader<R>, constants: &ConstantPool) -> Result<Self, Error> {
        let index = read_index(reader)?;
        match constants.get(ConstantIndex(index)) {
            Some(
                Constant::Integer(_)
                | Constant::Float(_)
                | Constant::Long(_)
                | Constant::Double(_)
                | Constant::String(_),
            ) => Ok(ConstantValue(ConstantIndex(index))),
            _ => Err(Error::InvalidConstantValueIndex(index)),
        }
    }
}

impl Serialize for ConstantValue {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for ConstantValue {
    const NAME: &'static str = "ConstantValue";

    fn into_info(self) -> AttributeInfo {
        AttributeInfo::ConstantValue(self)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFile(pub Utf8ConstantIndex);

impl SourceFile {
    fn read<R: Read>(reader: &mut ClassReader<R>, constants: &ConstantPool) -> Result<Self, Error> {
        let index = read_index(reader)?;
        if constants.is_utf8(ConstantIndex(index)) {
            Ok(SourceFile(Utf8ConstantIndex(ConstantIndex(index))))
        } else {
            Err(Error::InvalidSourceFileIndex(index))
        }
    }
}

impl Serialize for SourceFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for SourceFile {
    const NAME: &'static str = "SourceFile";

    fn into_info(self) -> AttributeInfo {
        AttributeInfo::SourceFile(self)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.6
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClasses(pub Vec<InnerClass>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class: ClassConstantIndex,

    /// `None` for top-level, local, and anonymous classes
    pub outer_class: Option<ClassConstantIndex>,

    /// `None` for anonymous classes
    pub inner_name: Option<Utf8ConstantIndex>,

    pub access_flags: InnerClassAccessFlags,
}

impl InnerClasses {
    fn read<R: Read>(reader: &mut ClassReader<R>, constants: &ConstantPool) -> Result<Self, Error> {
        let count = read_index(reader)?;
        let mut classes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let inner = read_index(reader)?;
            let outer = read_index(reader)?;
            let name = read_index(reader)?;
            let access_flags = InnerClassAccessFlags::check(read_index(reader)?)?;

            let valid = constants.is_class(ConstantIndex(inner))
                && (outer == 0 || constants.is_class(ConstantIndex(outer)))
                && (name == 0 || constants.is_utf8(ConstantIndex(name)));
            if !valid {
                return Err(Error::InvalidInnerClassIndices);
            }

            classes.push(InnerClass {
                inner_class: ClassConstantIndex(ConstantIndex(inner)),
                outer_class: Some(outer)
                    .filter(|idx| *idx != 0)
                    .map(|idx| ClassConstantIndex(ConstantIndex(idx))),
                inner_name: Some(name)
                    .filter(|idx| *idx != 0)
                    .map(|idx| Utf8ConstantIndex(ConstantIndex(idx))),
                access_flags,
            });
        }
        Ok(InnerClasses(classes))
    }
}

impl Serialize for InnerClasses {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for InnerClasses {
    const NAME: &'static str = "InnerClasses";

    fn into_info(self) -> AttributeInfo {
        AttributeInfo::InnerClasses(self)
    }
}

impl Serialize for InnerClass {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.inner_class.serialize(writer)?;
        self.outer_class.map_or(0, |idx| idx.0 .0).serialize(writer)?;
        self.inner_name.map_or(0, |idx| idx.0 .0).serialize(writer)?;
        self.access_flags.serialize(writer)?;
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.3
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl Code {
    /// Largest permitted length (exclusive) of the bytecode array
    pub const MAX_CODE_LENGTH: u32 = 65536;

    fn read<R: Read>(reader: &mut ClassReader<R>, constants: &ConstantPool) -> Result<Self, Error> {
        let eof = Error::reading(ReadContext::AttributeInfo);

        let max_stack = reader.read_u16().map_err(&eof)?;
        let max_locals = reader.read_u16().map_err(&eof)?;
        let code_length = reader.read_u32().map_err(&eof)?;
        if code_length == 0 || code_length >= Code::MAX_CODE_LENGTH {
            return Err(Error::InvalidCodeLength(code_length));
        }
        let code_array = reader.read_bytes(code_length as usize).map_err(&eof)?;

        let handler_count = reader.read_u16().map_err(&eof)?;
        let mut exception_table = Vec::with_capacity(handler_count as usize);
        for _ in 0..handler_count {
            let start_pc = reader.read_u16().map_err(&eof)?;
            let end_pc = reader.read_u16().map_err(&eof)?;
            let handler_pc = reader.read_u16().map_err(&eof)?;
            let catch_type = reader.read_u16().map_err(&eof)?;
            if catch_type != 0 && !constants.is_class(ConstantIndex(catch_type)) {
                return Err(Error::InvalidExceptionClassIndex(catch_type));
            }
            exception_table.push(ExceptionHandler {
                start_pc,
                end_pc,
                handler_pc,
                catch_type: Some(catch_type)
                    .filter(|idx| *idx != 0)
                    .map(|idx| ClassConstantIndex(ConstantIndex(idx))),
            });
        }

        let attributes = Attribute::read_list(reader, constants, &mut ListProgress::default())?;

        Ok(Code {
            max_stack,
            max_locals,
            code_array,
            exception_table,
            attributes,
        })
    }
}

impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        (self.code_array.len() as u32).serialize(writer)?;
        writer.write_all(&self.code_array)?;
        self.exception_table.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";

    fn into_info(self) -> AttributeInfo {
        AttributeInfo::Code(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of exception handler range (inclusive)
    pub start_pc: u16,

    /// End of exception handler range (exclusive)
    pub end_pc: u16,

    /// Start of the exception handler
    pub handler_pc: u16,

    /// `None` catches everything
    pub catch_type: Option<ClassConstantIndex>,
}

impl Serialize for ExceptionHandler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        self.catch_type.map_or(0, |idx| idx.0 .0).serialize(writer)?;
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.12
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumberTable(pub Vec<LineNumber>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

impl LineNumberTable {
    fn read<R: Read>(reader: &mut ClassReader<R>) -> Result<Self, Error> {
        let count = read_index(reader)?;
        let mut lines = Vec::with_capacity(count as usize);
        for _ in 0..count {
            lines.push(LineNumber {
                start_pc: read_index(reader)?,
                line_number: read_index(reader)?,
            });
        }
        Ok(LineNumberTable(lines))
    }
}

impl Serialize for LineNumberTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Serialize for LineNumber {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.line_number.serialize(writer)
    }
}

impl AttributeLike for LineNumberTable {
    const NAME: &'static str = "LineNumberTable";

    fn into_info(self) -> AttributeInfo {
        AttributeInfo::LineNumberTable(self)
    }
}

/// Checked exceptions a method may throw
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.5
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exceptions(pub Vec<ClassConstantIndex>);

impl Exceptions {
    fn read<R: Read>(reader: &mut ClassReader<R>, constants: &ConstantPool) -> Result<Self, Error> {
        let count = read_index(reader)?;
        let mut classes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let index = read_index(reader)?;
            if !constants.is_class(ConstantIndex(index)) {
                return Err(Error::InvalidExceptionClassIndex(index));
            }
            classes.push(ClassConstantIndex(ConstantIndex(index)));
        }
        Ok(Exceptions(classes))
    }
}

impl Serialize for Exceptions {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for Exceptions {
    const NAME: &'static str = "Exceptions";

    fn into_info(self) -> AttributeInfo {
        AttributeInfo::Exceptions(self)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.15
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deprecated;

impl Serialize for Deprecated {
    fn serialize<W: WriteBytesExt>(&self, _writer: &mut W) -> std::io::Result<()> {
        Ok(())
    }
}

impl AttributeLike for Deprecated {
    const NAME: &'static str = "Deprecated";

    fn into_info(self) -> AttributeInfo {
        AttributeInfo::Deprecated
    }
}

/// Find the first attribute of a given kind in a list
pub fn find_code(attributes: &[Attribute]) -> Option<&Code> {
    attributes.iter().find_map(|attribute| match &attribute.info {
        AttributeInfo::Code(code) => Some(code),
        _ => None,
    })
}

pub fn find_constant_value(attributes: &[Attribute]) -> Option<ConstantValue> {
    attributes.iter().find_map(|attribute| match &attribute.info {
        AttributeInfo::ConstantValue(value) => Some(*value),
        _ => None,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::FlagsOwner;

    fn read(bytes: &[u8], constants: &ConstantPool) -> Result<Attribute, Error> {
        Attribute::read(&mut ClassReader::new(bytes), constants)
    }

    fn encode(attribute: &Attribute) -> Vec<u8> {
        let mut bytes = vec![];
        attribute.serialize(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn constant_value() {
        let mut constants = ConstantPool::new();
        let number = constants.push(Constant::Integer(42));
        let attribute = Attribute::new(&mut constants, ConstantValue(number));
        let bytes = encode(&attribute);
        assert_eq!(bytes, vec![0, 2, 0, 0, 0, 2, 0, 1]);
        assert_eq!(read(&bytes, &constants).unwrap(), attribute);

        // Points at its own name, which is not a loadable constant
        let bad = vec![0, 2, 0, 0, 0, 2, 0, 2];
        assert!(matches!(
            read(&bad, &constants),
            Err(Error::InvalidConstantValueIndex(2))
        ));
    }

    #[test]
    fn length_mismatch() {
        let mut constants = ConstantPool::new();
        constants.get_utf8("SourceFile");
        let bytes = vec![0, 1, 0, 0, 0, 3, 0, 1, 0];
        assert!(matches!(
            read(&bytes, &constants),
            Err(Error::AttributeLengthMismatch {
                declared: 3,
                consumed: 2
            })
        ));
    }

    #[test]
    fn unknown_attributes_are_skipped() {
        let mut constants = ConstantPool::new();
        constants.get_utf8("Signature");
        let bytes = vec![0, 1, 0, 0, 0, 2, 9, 9];
        let attribute = read(&bytes, &constants).unwrap();
        assert_eq!(attribute.info, AttributeInfo::Unknown(2));

        let truncated = vec![0, 1, 0, 0, 0, 4, 9, 9];
        assert!(matches!(
            read(&truncated, &constants),
            Err(Error::UnexpectedEof(ReadContext::AttributeInfo))
        ));
    }

    #[test]
    fn code_with_nested_attributes() {
        let mut constants = ConstantPool::new();
        let line_numbers = Attribute::new(
            &mut constants,
            LineNumberTable(vec![LineNumber {
                start_pc: 0,
                line_number: 7,
            }]),
        );
        let code = Attribute::new(
            &mut constants,
            Code {
                max_stack: 1,
                max_locals: 1,
                code_array: vec![0xB1],
                exception_table: vec![],
                attributes: vec![line_numbers],
            },
        );
        let bytes = encode(&code);
        assert_eq!(read(&bytes, &constants).unwrap(), code);
        assert!(find_code(&[code]).is_some());
    }

    #[test]
    fn code_length_bounds() {
        let mut constants = ConstantPool::new();
        constants.get_utf8("Code");
        let empty_code = vec![0, 1, 0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            read(&empty_code, &constants),
            Err(Error::InvalidCodeLength(0))
        ));
    }

    #[test]
    fn name_must_be_utf8() {
        let mut constants = ConstantPool::new();
        constants.push(Constant::Integer(1));
        assert!(matches!(
            read(&[0, 1, 0, 0, 0, 0], &constants),
            Err(Error::InvalidNameIndex(1))
        ));
        assert!(matches!(
            read(&[0, 9, 0, 0, 0, 0], &constants),
            Err(Error::InvalidNameIndex(9))
        ));
    }

    #[test]
    fn inner_classes_and_exceptions() {
        let mut constants = ConstantPool::new();
        let outer = constants.get_class("Outer");
        let inner = constants.get_class("Outer$Inner");
        let name = constants.get_utf8("Inner");
        let attribute = Attribute::new(
            &mut constants,
            InnerClasses(vec![InnerClass {
                inner_class: inner,
                outer_class: Some(outer),
                inner_name: Some(name),
                access_flags: InnerClassAccessFlags::PUBLIC | InnerClassAccessFlags::STATIC,
            }]),
        );
        let mut bytes = encode(&attribute);
        assert_eq!(read(&bytes, &constants).unwrap(), attribute);

        // `ACC_SUPER` has no meaning on an inner class
        let len = bytes.len();
        bytes[len - 1] |= 0x20;
        assert!(matches!(
            read(&bytes, &constants),
            Err(Error::ReservedAccessFlags(FlagsOwner::InnerClass))
        ));

        let exceptions = Attribute::new(&mut constants, Exceptions(vec![inner]));
        bytes = encode(&exceptions);
        assert_eq!(read(&bytes, &constants).unwrap(), exceptions);

        // Point the exception at a UTF-8 entry instead
        let len = bytes.len();
        bytes[len - 1] = name.0 .0 as u8;
        assert!(matches!(
            read(&bytes, &constants),
            Err(Error::InvalidExceptionClassIndex(_))
        ));
    }
}
