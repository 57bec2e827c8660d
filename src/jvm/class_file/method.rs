use crate::jvm::binary_format::Serialize;
use crate::jvm::class_file::{find_code, Attribute, Code, ConstantPool, Utf8ConstantIndex};
use crate::jvm::MethodAccessFlags;
use byteorder::WriteBytesExt;

/// Method declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.6
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Method {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn name<'a>(&self, constants: &'a ConstantPool) -> &'a str {
        constants.utf8(self.name_index).unwrap_or_default()
    }

    pub fn descriptor<'a>(&self, constants: &'a ConstantPool) -> &'a str {
        constants.utf8(self.descriptor_index).unwrap_or_default()
    }

    /// Bytecode of the method (absent for `abstract` and `native` methods)
    pub fn code(&self) -> Option<&Code> {
        find_code(&self.attributes)
    }
}

impl Serialize for Method {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}
