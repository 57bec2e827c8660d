use crate::jvm::binary_format::{ClassReader, Serialize};
use crate::jvm::descriptors::{parse_field_descriptor, parse_method_descriptor};
use crate::jvm::names::{BinaryName, Name, UnqualifiedName};
use crate::jvm::utf8::{decode_modified_utf8, encode_modified_utf8, is_valid_byte};
use crate::jvm::{Error, ReadContext};
use crate::util::{Offset, OffsetResult, OffsetVec, Width};
use byteorder::WriteBytesExt;
use std::io::Read;

/// Entry in the constant pool of a class
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.4
#[derive(Clone, PartialEq, Debug)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(f32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`
    Double(f64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Decoded contents of a `CONSTANT_Utf8_info`
    ///
    /// Malformed sequences have been replaced with `U+FFFD`.
    Utf8(String),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute (not into the constant pool)
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(string) => {
                1u8.serialize(writer)?;
                let buffer: Vec<u8> = encode_modified_utf8(string);
                (buffer.len() as u16).serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(float) => {
                4u8.serialize(writer)?;
                float.serialize(writer)?;
            }
            Constant::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(double) => {
                6u8.serialize(writer)?;
                double.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(utf8) => {
                8u8.serialize(writer)?;
                utf8.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                (if *is_interface { 11u8 } else { 10u8 }).serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                15u8.serialize(writer)?;
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => {
                16u8.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                18u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                method_descriptor.serialize(writer)?;
            }
        };
        Ok(())
    }
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the JVM specification:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

impl Constant {
    /// Read one constant pool entry
    ///
    /// `count` is the `constant_pool_count` from the class header: every index read must be in
    /// `[1, count)`.
    pub fn read<R: Read>(reader: &mut ClassReader<R>, tag: u8, count: u16) -> Result<Constant, Error> {
        let eof = Error::reading(ReadContext::ConstantPool);
        let index = |reader: &mut ClassReader<R>| -> Result<ConstantIndex, Error> {
            let idx = reader.read_u16().map_err(&eof)?;
            if idx == 0 || idx >= count {
                Err(Error::InvalidConstantIndex(idx))
            } else {
                Ok(ConstantIndex(idx))
            }
        };

        let constant = match tag {
            1 => {
                let len = reader.read_u16().map_err(&eof)?;
                let bytes = reader
                    .read_bytes(len as usize)
                    .map_err(Error::reading(ReadContext::Utf8))?;
                if !bytes.iter().copied().all(is_valid_byte) {
                    return Err(Error::InvalidUtf8Bytes);
                }
                Constant::Utf8(decode_modified_utf8(&bytes))
            }
            3 => Constant::Integer(reader.read_i32().map_err(&eof)?),
            4 => Constant::Float(reader.read_f32().map_err(&eof)?),
            5 => Constant::Long(reader.read_i64().map_err(&eof)?),
            6 => Constant::Double(reader.read_f64().map_err(&eof)?),
            7 => Constant::Class(Utf8ConstantIndex(index(reader)?)),
            8 => Constant::String(Utf8ConstantIndex(index(reader)?)),
            9 => {
                let class = ClassConstantIndex(index(reader)?);
                let name_and_type = NameAndTypeConstantIndex(index(reader)?);
                Constant::FieldRef(class, name_and_type)
            }
            10 | 11 => Constant::MethodRef {
                class: ClassConstantIndex(index(reader)?),
                name_and_type: NameAndTypeConstantIndex(index(reader)?),
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex(index(reader)?),
                descriptor: Utf8ConstantIndex(index(reader)?),
            },
            15 => {
                let kind = reader.read_u8().map_err(&eof)?;
                let handle_kind = HandleKind::from_u8(kind).ok_or(Error::UnknownConstantTag(tag))?;
                Constant::MethodHandle {
                    handle_kind,
                    member: index(reader)?,
                }
            }
            16 => Constant::MethodType {
                descriptor: Utf8ConstantIndex(index(reader)?),
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: reader.read_u16().map_err(&eof)?,
                method_descriptor: NameAndTypeConstantIndex(index(reader)?),
            },
            _ => return Err(Error::UnknownConstantTag(tag)),
        };
        Ok(constant)
    }
}

/// Untyped index into the constant pool
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// Declare indices into the constant pool which are known to point at a particular kind of entry
macro_rules! typed_indices {
    ($($(#[$attr:meta])* $name:ident,)*) => {
        $(
            $(#[$attr])*
            #[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
            pub struct $name(pub ConstantIndex);

            impl From<$name> for ConstantIndex {
                fn from(index: $name) -> ConstantIndex {
                    index.0
                }
            }

            impl Serialize for $name {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    self.0.serialize(writer)
                }
            }
        )*
    };
}

typed_indices! {
    /// Index of a `CONSTANT_Utf8_info`
    Utf8ConstantIndex,
    /// Index of a `CONSTANT_String_info`
    StringConstantIndex,
    /// Index of a `CONSTANT_NameAndType_info`
    NameAndTypeConstantIndex,
    /// Index of a `CONSTANT_Class_info`
    ClassConstantIndex,
    /// Index of a `CONSTANT_Fieldref_info`
    FieldRefConstantIndex,
    /// Index of a `CONSTANT_Methodref_info` or `CONSTANT_InterfaceMethodref_info`
    MethodRefConstantIndex,
}

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl HandleKind {
    pub fn from_u8(kind: u8) -> Option<HandleKind> {
        Some(match kind {
            1 => HandleKind::GetField,
            2 => HandleKind::GetStatic,
            3 => HandleKind::PutField,
            4 => HandleKind::PutStatic,
            5 => HandleKind::InvokeVirtual,
            6 => HandleKind::InvokeStatic,
            7 => HandleKind::InvokeSpecial,
            8 => HandleKind::NewInvokeSpecial,
            9 => HandleKind::InvokeInterface,
            _ => return None,
        })
    }
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let byte: u8 = match self {
            HandleKind::GetField => 1,
            HandleKind::GetStatic => 2,
            HandleKind::PutField => 3,
            HandleKind::PutStatic => 4,
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        };
        byte.serialize(writer)
    }
}

/// Field or method reference, with all of its indirections resolved
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct MemberRef<'a> {
    pub class_name: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// Constant pool of a class
///
/// Indexing starts at 1 and the slot after a `long` or `double` cannot be addressed: looking it
/// up fails exactly like an out-of-range index.
#[derive(Clone, PartialEq, Debug)]
pub struct ConstantPool(OffsetVec<Constant>);

impl Default for ConstantPool {
    fn default() -> Self {
        ConstantPool::new()
    }
}

impl ConstantPool {
    pub fn new() -> ConstantPool {
        ConstantPool(OffsetVec::new_starting_at(Offset(1)))
    }

    /// Value of `constant_pool_count` (one more than the largest usable index)
    pub fn count(&self) -> u16 {
        self.0.offset_len().0 as u16
    }

    /// Number of entries (not slots)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add an entry at the end of the pool
    pub fn push(&mut self, constant: Constant) -> ConstantIndex {
        let offset = self.0.push(constant);
        ConstantIndex(offset.0 as u16)
    }

    pub fn get(&self, index: impl Into<ConstantIndex>) -> Option<&Constant> {
        let index: ConstantIndex = index.into();
        match self.0.get_offset(Offset(index.0 as usize)) {
            OffsetResult::Ok(_, constant) => Some(constant),
            OffsetResult::InvalidOffset(_) | OffsetResult::TooLarge => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> + '_ {
        self.0
            .iter()
            .map(|(offset, _, constant)| (ConstantIndex(offset.0 as u16), constant))
    }

    pub fn utf8(&self, index: impl Into<ConstantIndex>) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Utf8(text)) => Some(text),
            _ => None,
        }
    }

    pub fn is_utf8(&self, index: impl Into<ConstantIndex>) -> bool {
        self.utf8(index).is_some()
    }

    pub fn is_class(&self, index: impl Into<ConstantIndex>) -> bool {
        matches!(self.get(index), Some(Constant::Class(_)))
    }

    /// Name of the class at a `CONSTANT_Class_info` index
    pub fn class_name(&self, index: impl Into<ConstantIndex>) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Class(name)) => self.utf8(*name),
            _ => None,
        }
    }

    /// Name and descriptor of a `CONSTANT_NameAndType_info`
    pub fn name_and_type(&self, index: impl Into<ConstantIndex>) -> Option<(&str, &str)> {
        match self.get(index) {
            Some(Constant::NameAndType { name, descriptor }) => {
                Some((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => None,
        }
    }

    /// Resolve a `Fieldref`, `Methodref`, or `InterfaceMethodref`
    pub fn member_ref(&self, index: impl Into<ConstantIndex>) -> Option<MemberRef<'_>> {
        let (class, name_and_type) = match self.get(index)? {
            Constant::FieldRef(class, name_and_type) => (*class, *name_and_type),
            Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => (*class, *name_and_type),
            _ => return None,
        };
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Some(MemberRef {
            class_name: self.class_name(class)?,
            name,
            descriptor,
        })
    }

    /// Get or insert a UTF-8 constant
    pub fn get_utf8(&mut self, text: &str) -> Utf8ConstantIndex {
        let existing = self.iter().find_map(|(index, constant)| match constant {
            Constant::Utf8(other) if other == text => Some(index),
            _ => None,
        });
        Utf8ConstantIndex(existing.unwrap_or_else(|| self.push(Constant::Utf8(text.to_owned()))))
    }

    /// Get or insert a class constant
    pub fn get_class(&mut self, name: &str) -> ClassConstantIndex {
        let name = self.get_utf8(name);
        ClassConstantIndex(self.get_or_push(Constant::Class(name)))
    }

    /// Get or insert a string constant
    pub fn get_string(&mut self, text: &str) -> StringConstantIndex {
        let utf8 = self.get_utf8(text);
        StringConstantIndex(self.get_or_push(Constant::String(utf8)))
    }

    /// Get or insert a name and type constant
    pub fn get_name_and_type(&mut self, name: &str, descriptor: &str) -> NameAndTypeConstantIndex {
        let name = self.get_utf8(name);
        let descriptor = self.get_utf8(descriptor);
        NameAndTypeConstantIndex(self.get_or_push(Constant::NameAndType { name, descriptor }))
    }

    /// Get or insert a field reference
    pub fn get_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> FieldRefConstantIndex {
        let class = self.get_class(class);
        let name_and_type = self.get_name_and_type(name, descriptor);
        FieldRefConstantIndex(self.get_or_push(Constant::FieldRef(class, name_and_type)))
    }

    /// Get or insert a method reference
    pub fn get_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> MethodRefConstantIndex {
        let class = self.get_class(class);
        let name_and_type = self.get_name_and_type(name, descriptor);
        MethodRefConstantIndex(self.get_or_push(Constant::MethodRef {
            class,
            name_and_type,
            is_interface,
        }))
    }

    /// Get or insert a numeric (or other leaf) constant
    pub fn get_or_push(&mut self, constant: Constant) -> ConstantIndex {
        let existing = self
            .iter()
            .find_map(|(index, other)| if *other == constant { Some(index) } else { None });
        match existing {
            Some(index) => index,
            None => self.push(constant),
        }
    }

    /// Check the cross-references between entries
    ///
    /// On failure, `failed` holds the pool index of the offending entry. The unusable slots after
    /// `long` and `double` entries are never visited.
    pub fn validate(&self, failed: &mut Option<ConstantIndex>) -> Result<(), Error> {
        for (index, constant) in self.iter() {
            *failed = Some(index);
            self.validate_entry(constant)?;
        }
        *failed = None;
        Ok(())
    }

    fn validate_entry(&self, constant: &Constant) -> Result<(), Error> {
        match constant {
            Constant::Class(name) => {
                let valid = self
                    .utf8(*name)
                    .map_or(false, |name| BinaryName::check_valid(name).is_ok());
                if !valid {
                    return Err(Error::InvalidNameIndex(name.0 .0));
                }
            }
            Constant::String(utf8) => {
                if !self.is_utf8(*utf8) {
                    return Err(Error::InvalidStringIndex(utf8.0 .0));
                }
            }
            Constant::FieldRef(class, name_and_type) => {
                self.validate_member(*class, *name_and_type, true)?
            }
            Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => self.validate_member(*class, *name_and_type, false)?,
            Constant::NameAndType { name, descriptor } => {
                if !self.is_utf8(*name) || !self.is_utf8(*descriptor) {
                    return Err(Error::InvalidNameAndTypeIndex(name.0 .0));
                }
            }
            Constant::Utf8(_)
            | Constant::Integer(_)
            | Constant::Float(_)
            | Constant::Long(_)
            | Constant::Double(_)
            | Constant::MethodHandle { .. }
            | Constant::MethodType { .. }
            | Constant::InvokeDynamic { .. } => (),
        }
        Ok(())
    }

    fn validate_member(
        &self,
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_field: bool,
    ) -> Result<(), Error> {
        if !self.is_class(class) {
            return Err(Error::InvalidClassIndex(class.0 .0));
        }

        let (name_index, descriptor_index) = match self.get(name_and_type) {
            Some(Constant::NameAndType { name, descriptor }) => (*name, *descriptor),
            _ => return Err(Error::InvalidNameIndex(name_and_type.0 .0)),
        };

        let name = self
            .utf8(name_index)
            .ok_or(Error::InvalidNameAndTypeIndex(name_and_type.0 .0))?;
        let name_ok = if is_field {
            UnqualifiedName::check_valid(name).is_ok()
        } else {
            UnqualifiedName::check_valid_method(name).is_ok()
        };
        if !name_ok {
            return Err(Error::InvalidNameIndex(name_index.0 .0));
        }

        let descriptor = self
            .utf8(descriptor_index)
            .ok_or(Error::InvalidNameAndTypeIndex(name_and_type.0 .0))?;
        if is_field {
            parse_field_descriptor(descriptor)
                .map_err(|_| Error::InvalidFieldDescriptorIndex(descriptor_index.0 .0))?;
        } else {
            parse_method_descriptor(descriptor)
                .map_err(|_| Error::InvalidMethodDescriptorIndex(descriptor_index.0 .0))?;
        }

        Ok(())
    }
}

/// Count is `constant_pool_count`, which includes the unusable zero slot and phantom slots
impl Serialize for ConstantPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.count().serialize(writer)?;
        for (_, constant) in self.iter() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn read(bytes: &[u8], count: u16) -> Result<Constant, Error> {
        let mut reader = ClassReader::new(&bytes[1..]);
        Constant::read(&mut reader, bytes[0], count)
    }

    #[test]
    fn reading_entries() {
        assert_eq!(read(&[7, 0, 2], 3).unwrap(), Constant::Class(Utf8ConstantIndex(ConstantIndex(2))));
        assert_eq!(
            read(&[1, 0, 3, b'a', b'b', b'c'], 3).unwrap(),
            Constant::Utf8("abc".to_string())
        );
        assert_eq!(read(&[5, 0, 0, 0, 1, 0, 0, 0, 2], 3).unwrap(), Constant::Long(0x1_0000_0002));
        assert_eq!(
            read(&[15, 6, 0, 1], 3).unwrap(),
            Constant::MethodHandle {
                handle_kind: HandleKind::InvokeStatic,
                member: ConstantIndex(1),
            }
        );
    }

    #[test]
    fn reading_bad_entries() {
        assert!(matches!(read(&[7, 0, 0], 3), Err(Error::InvalidConstantIndex(0))));
        assert!(matches!(read(&[7, 0, 3], 3), Err(Error::InvalidConstantIndex(3))));
        assert!(matches!(read(&[2, 0, 0], 3), Err(Error::UnknownConstantTag(2))));
        assert!(matches!(
            read(&[1, 0, 2, b'a', 0], 3),
            Err(Error::InvalidUtf8Bytes)
        ));
        assert!(matches!(
            read(&[1, 0, 3, b'a'], 3),
            Err(Error::UnexpectedEof(ReadContext::Utf8))
        ));
        assert!(matches!(
            read(&[9, 0, 1], 3),
            Err(Error::UnexpectedEof(ReadContext::ConstantPool))
        ));
    }

    #[test]
    fn phantom_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.push(Constant::Long(7));
        let after = pool.push(Constant::Integer(3));
        assert_eq!(long, ConstantIndex(1));
        assert_eq!(after, ConstantIndex(3));
        assert_eq!(pool.count(), 4);
        assert_eq!(pool.get(ConstantIndex(2)), None);
        assert_eq!(pool.get(ConstantIndex(0)), None);
        assert_eq!(pool.get(ConstantIndex(4)), None);
        assert_eq!(pool.get(ConstantIndex(3)), Some(&Constant::Integer(3)));
    }

    #[test]
    fn member_refs_resolve() {
        let mut pool = ConstantPool::new();
        let method = pool.get_method_ref("Foo", "bar", "(I)V", false);
        assert_eq!(
            pool.member_ref(method),
            Some(MemberRef {
                class_name: "Foo",
                name: "bar",
                descriptor: "(I)V",
            })
        );
        assert_eq!(pool.get_utf8("Foo"), pool.get_utf8("Foo"));
        let mut failed = None;
        pool.validate(&mut failed).unwrap();
        assert_eq!(failed, None);
    }

    #[test]
    fn validation_failures() {
        let mut pool = ConstantPool::new();
        let bad_name = pool.get_utf8("1Foo");
        pool.push(Constant::Class(bad_name));
        let mut failed = None;
        assert!(matches!(pool.validate(&mut failed), Err(Error::InvalidNameIndex(1))));
        assert_eq!(failed, Some(ConstantIndex(2)));

        // Slots 2 and 3 hold the long, so the bad class sits in slot 5
        let mut pool = ConstantPool::new();
        pool.get_utf8("ok");
        pool.push(Constant::Long(7));
        let bad_name = pool.get_utf8("1Foo");
        pool.push(Constant::Class(bad_name));
        let mut failed = None;
        assert!(matches!(pool.validate(&mut failed), Err(Error::InvalidNameIndex(4))));
        assert_eq!(failed, Some(ConstantIndex(5)));

        let mut pool = ConstantPool::new();
        let number = pool.push(Constant::Integer(1));
        pool.push(Constant::String(Utf8ConstantIndex(number)));
        assert!(matches!(pool.validate(&mut None), Err(Error::InvalidStringIndex(1))));

        let mut pool = ConstantPool::new();
        pool.get_field_ref("Foo", "x", "Q");
        assert!(matches!(
            pool.validate(&mut None),
            Err(Error::InvalidFieldDescriptorIndex(_))
        ));

        let mut pool = ConstantPool::new();
        pool.get_method_ref("Foo", "<init>", "()V", false);
        assert!(pool.validate(&mut None).is_ok());
        pool.get_field_ref("Foo", "<init>", "I");
        assert!(matches!(pool.validate(&mut None), Err(Error::InvalidNameIndex(_))));
    }
}
