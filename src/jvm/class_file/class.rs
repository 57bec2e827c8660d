use crate::jvm::binary_format::Serialize;
use crate::jvm::class_file::{Attribute, ClassConstantIndex, ClassParser, ConstantPool, Field, Method};
use crate::jvm::{ClassAccessFlags, Error, LoadError, LoadProgress, Version};
use byteorder::WriteBytesExt;
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

/// Representation of the [`class` file format of the JVM][0]
///
/// Besides the structures of the format, this also tracks how many static and instance slots
/// the declared fields need (see `Field::offset`).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub version: Version,
    pub constants: ConstantPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: ClassConstantIndex,

    /// Only `java/lang/Object` has no super class
    pub super_class: Option<ClassConstantIndex>,
    pub interfaces: Vec<ClassConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,

    pub static_field_count: usize,
    pub instance_field_count: usize,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    pub const MAGIC: u32 = 0xCAFEBABE;

    /// Parse and validate a class file
    pub fn parse<R: Read>(reader: R) -> Result<ClassFile, LoadError> {
        ClassParser::new(reader).parse().map(|(class, _)| class)
    }

    /// Parse and validate a class file, also reporting what was read
    pub fn parse_with_progress<R: Read>(reader: R) -> Result<(ClassFile, LoadProgress), LoadError> {
        ClassParser::new(reader).parse()
    }

    /// Parse and validate a class file on disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ClassFile, LoadError> {
        ClassFile::from_path_with_progress(path).map(|(class, _)| class)
    }

    pub fn from_path_with_progress<P: AsRef<Path>>(
        path: P,
    ) -> Result<(ClassFile, LoadProgress), LoadError> {
        let file = fs::File::open(path).map_err(|err| LoadError {
            error: Error::IoError(err),
            progress: LoadProgress::default(),
        })?;
        ClassFile::parse_with_progress(BufReader::new(file))
    }

    /// Save the class file to disk
    pub fn save_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        create_missing_directories: bool,
    ) -> std::io::Result<()> {
        let path = path.as_ref();
        if create_missing_directories {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut class_file = fs::File::create(path)?;
        self.serialize(&mut class_file)
    }

    /// Binary name of the class (eg. `java/lang/Object`)
    pub fn name(&self) -> &str {
        self.constants.class_name(self.this_class).unwrap_or_default()
    }

    pub fn super_class_name(&self) -> Option<&str> {
        self.super_class
            .and_then(|super_class| self.constants.class_name(super_class))
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.interfaces
            .iter()
            .filter_map(move |interface| self.constants.class_name(*interface))
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    /// Find a method declared in this class (not in super classes)
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods.iter().find(|method| {
            method.name(&self.constants) == name
                && method.descriptor(&self.constants) == descriptor
        })
    }

    /// Find a field declared in this class (not in super classes)
    pub fn find_field(&self, name: &str, descriptor: &str) -> Option<&Field> {
        self.fields.iter().find(|field| {
            field.name(&self.constants) == name && field.descriptor(&self.constants) == descriptor
        })
    }

    /// Check that the simple name of the class matches the file it was loaded from
    ///
    /// Only the last segment of the binary name is compared against the file stem, so
    /// `pkg/Main` matches `out/Main.class`.
    pub fn name_matches_path<P: AsRef<Path>>(&self, path: P) -> bool {
        let simple_name = self.name().rsplit('/').next().unwrap_or_default();
        path.as_ref()
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map_or(false, |stem| stem == simple_name)
    }
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        ClassFile::MAGIC.serialize(writer)?;
        self.version.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.map_or(0, |idx| idx.0 .0).serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}
