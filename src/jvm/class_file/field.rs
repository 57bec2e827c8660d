use crate::jvm::binary_format::Serialize;
use crate::jvm::class_file::{find_constant_value, Attribute, ConstantPool, ConstantValue, Utf8ConstantIndex};
use crate::jvm::FieldAccessFlags;
use byteorder::WriteBytesExt;

/// Field declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.5
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub access_flags: FieldAccessFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,

    /// Slot of the field in static storage or in instance storage (depending on whether the
    /// field is static). Not part of the class file format: it is assigned during loading.
    pub offset: usize,
}

impl Field {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::STATIC)
    }

    pub fn name<'a>(&self, constants: &'a ConstantPool) -> &'a str {
        constants.utf8(self.name_index).unwrap_or_default()
    }

    pub fn descriptor<'a>(&self, constants: &'a ConstantPool) -> &'a str {
        constants.utf8(self.descriptor_index).unwrap_or_default()
    }

    /// Number of slots the field takes up (`long` and `double` take two)
    pub fn width(&self, constants: &ConstantPool) -> usize {
        match self.descriptor(constants).as_bytes().first() {
            Some(b'J' | b'D') => 2,
            _ => 1,
        }
    }

    pub fn constant_value(&self) -> Option<ConstantValue> {
        find_constant_value(&self.attributes)
    }
}

impl Serialize for Field {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}
