use crate::jvm::binary_format::ClassReader;
use crate::jvm::class_file::{
    find_code, Attribute, ClassConstantIndex, ClassFile, Constant, ConstantIndex, ConstantPool, Field,
    Method, Utf8ConstantIndex,
};
use crate::jvm::descriptors::{parse_field_descriptor, parse_method_descriptor};
use crate::jvm::names::{Name, UnqualifiedName};
use crate::jvm::{
    ClassAccessFlags, Error, FieldAccessFlags, ListProgress, LoadError, LoadProgress,
    MethodAccessFlags, ReadContext, Version,
};
use crate::util::Width;
use std::io::Read;

/// Reads and validates a class file, one section after another
///
/// The first problem stops parsing. Whatever the outcome, `progress` says how far parsing got.
pub struct ClassParser<R> {
    reader: ClassReader<R>,
    progress: LoadProgress,
}

impl<R: Read> ClassParser<R> {
    pub fn new(reader: R) -> ClassParser<R> {
        ClassParser {
            reader: ClassReader::new(reader),
            progress: LoadProgress::default(),
        }
    }

    /// Parse the whole class file, including the check for trailing data
    ///
    /// On success, `bytes_read` of the progress is the length of the class file.
    pub fn parse(mut self) -> Result<(ClassFile, LoadProgress), LoadError> {
        let result = self.parse_class();
        self.progress.bytes_read = self.reader.bytes_read();
        match result {
            Ok(class) => {
                log::trace!("parsed class file: {:?}", self.progress);
                Ok((class, self.progress))
            }
            Err(error) => {
                log::debug!("class file rejected ({}): {:?}", error, self.progress);
                Err(LoadError {
                    error,
                    progress: self.progress,
                })
            }
        }
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        self.reader
            .read_u16()
            .map_err(Error::reading(ReadContext::Structure))
    }

    fn parse_class(&mut self) -> Result<ClassFile, Error> {
        let magic = self
            .reader
            .read_u32()
            .map_err(Error::reading(ReadContext::Structure))?;
        if magic != ClassFile::MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let version = Version {
            minor_version: self.read_u16()?,
            major_version: self.read_u16()?,
        };
        if !version.is_supported() {
            return Err(Error::UnsupportedVersion(version));
        }

        let constants = self.parse_constants()?;
        constants.validate(&mut self.progress.invalid_constant)?;

        let access_flags = ClassAccessFlags::check(self.read_u16()?)?;

        let this_class = self.read_u16()?;
        if !constants.is_class(ConstantIndex(this_class)) {
            return Err(Error::InvalidThisClassIndex(this_class));
        }

        let super_class = match self.read_u16()? {
            0 => None,
            idx if constants.is_class(ConstantIndex(idx)) => {
                Some(ClassConstantIndex(ConstantIndex(idx)))
            }
            idx => return Err(Error::InvalidSuperClassIndex(idx)),
        };

        let interfaces = self.parse_interfaces(&constants)?;

        let mut static_field_count = 0;
        let mut instance_field_count = 0;
        let field_count = self.read_u16()?;
        self.progress.fields.start(field_count);
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let mut field = self.parse_field(&constants, access_flags)?;
            let counter = if field.is_static() {
                &mut static_field_count
            } else {
                &mut instance_field_count
            };
            field.offset = *counter;
            *counter += field.width(&constants);
            fields.push(field);
            self.progress.fields.read += 1;
        }

        let method_count = self.read_u16()?;
        self.progress.methods.start(method_count);
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(self.parse_method(&constants)?);
            self.progress.methods.read += 1;
        }

        let attributes =
            Attribute::read_list(&mut self.reader, &constants, &mut self.progress.attributes)?;

        if !self.reader.at_end()? {
            return Err(Error::TrailingBytes);
        }

        Ok(ClassFile {
            version,
            constants,
            access_flags,
            this_class: ClassConstantIndex(ConstantIndex(this_class)),
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            static_field_count,
            instance_field_count,
        })
    }

    /// Read entries until `constant_pool_count` slots are filled (`long` and `double` entries
    /// fill two)
    fn parse_constants(&mut self) -> Result<ConstantPool, Error> {
        let count = self.read_u16()?;
        if count == 0 {
            return Err(Error::InvalidConstantPoolCount);
        }
        self.progress.constant_pool = ListProgress {
            declared: count,
            read: 1,
        };

        let mut constants = ConstantPool::new();
        while constants.count() < count {
            let tag = self
                .reader
                .read_u8()
                .map_err(Error::reading(ReadContext::ConstantPool))?;
            self.progress.last_tag = Some(tag);
            let constant = Constant::read(&mut self.reader, tag, count)?;

            // The unusable slot after a wide constant must still be inside the pool
            if constants.count() as usize + constant.width() > count as usize {
                return Err(Error::InvalidConstantPoolCount);
            }
            constants.push(constant);
            self.progress.constant_pool.read = constants.count();
        }

        Ok(constants)
    }

    fn parse_interfaces(&mut self, constants: &ConstantPool) -> Result<Vec<ClassConstantIndex>, Error> {
        let eof = Error::reading(ReadContext::Interfaces);
        let count = self.reader.read_u16().map_err(&eof)?;
        self.progress.interfaces.start(count);
        let mut interfaces = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let idx = self.reader.read_u16().map_err(&eof)?;
            if !constants.is_class(ConstantIndex(idx)) {
                return Err(Error::InvalidInterfaceIndex(idx));
            }
            interfaces.push(ClassConstantIndex(ConstantIndex(idx)));
            self.progress.interfaces.read += 1;
        }
        Ok(interfaces)
    }

    fn parse_field(
        &mut self,
        constants: &ConstantPool,
        class_flags: ClassAccessFlags,
    ) -> Result<Field, Error> {
        let access_flags = FieldAccessFlags::check(self.read_u16()?, class_flags)?;

        let name_index = self.read_u16()?;
        let name_ok = constants
            .utf8(ConstantIndex(name_index))
            .map_or(false, |name| UnqualifiedName::check_valid(name).is_ok());
        if !name_ok {
            return Err(Error::InvalidNameIndex(name_index));
        }

        let descriptor_index = self.read_u16()?;
        let descriptor_ok = constants
            .utf8(ConstantIndex(descriptor_index))
            .map_or(false, |descriptor| parse_field_descriptor(descriptor).is_ok());
        if !descriptor_ok {
            return Err(Error::InvalidFieldDescriptorIndex(descriptor_index));
        }

        let attributes =
            Attribute::read_list(&mut self.reader, constants, &mut self.progress.attributes)?;

        Ok(Field {
            access_flags,
            name_index: Utf8ConstantIndex(ConstantIndex(name_index)),
            descriptor_index: Utf8ConstantIndex(ConstantIndex(descriptor_index)),
            attributes,
            offset: 0,
        })
    }

    fn parse_method(&mut self, constants: &ConstantPool) -> Result<Method, Error> {
        let access_flags = MethodAccessFlags::check(self.read_u16()?)?;

        let name_index = self.read_u16()?;
        let name_ok = constants
            .utf8(ConstantIndex(name_index))
            .map_or(false, |name| UnqualifiedName::check_valid_method(name).is_ok());
        if !name_ok {
            return Err(Error::InvalidNameIndex(name_index));
        }

        let descriptor_index = self.read_u16()?;
        let descriptor = constants
            .utf8(ConstantIndex(descriptor_index))
            .and_then(|descriptor| parse_method_descriptor(descriptor).ok())
            .ok_or(Error::InvalidMethodDescriptorIndex(descriptor_index))?;

        let attributes =
            Attribute::read_list(&mut self.reader, constants, &mut self.progress.attributes)?;

        // Arguments are copied into the first locals on invocation
        if let Some(code) = find_code(&attributes) {
            let has_this_param = !access_flags.contains(MethodAccessFlags::STATIC);
            let parameters = descriptor.parameter_length(has_this_param);
            if (code.max_locals as usize) < parameters {
                return Err(Error::InvalidMaxLocals {
                    max_locals: code.max_locals,
                    parameters,
                });
            }
        }

        Ok(Method {
            access_flags,
            name_index: Utf8ConstantIndex(ConstantIndex(name_index)),
            descriptor_index: Utf8ConstantIndex(ConstantIndex(descriptor_index)),
            attributes,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::binary_format::Serialize;
    use crate::jvm::class_file::{Code, ConstantValue};

    /// `public class Minimal extends java/lang/Object` with nothing in it
    fn minimal() -> ClassFile {
        let mut constants = ConstantPool::new();
        let this_class = constants.get_class("Minimal");
        let super_class = constants.get_class("java/lang/Object");
        ClassFile {
            version: Version::JAVA8,
            constants,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this_class,
            super_class: Some(super_class),
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
            static_field_count: 0,
            instance_field_count: 0,
        }
    }

    fn encode(class: &ClassFile) -> Vec<u8> {
        let mut bytes = vec![];
        class.serialize(&mut bytes).unwrap();
        bytes
    }

    fn add_field(class: &mut ClassFile, flags: FieldAccessFlags, name: &str, descriptor: &str) {
        let name_index = class.constants.get_utf8(name);
        let descriptor_index = class.constants.get_utf8(descriptor);
        class.fields.push(Field {
            access_flags: flags,
            name_index,
            descriptor_index,
            attributes: vec![],
            offset: 0,
        });
    }

    #[test]
    fn minimal_class() {
        let bytes = encode(&minimal());
        let parsed = ClassFile::parse(bytes.as_slice()).unwrap();
        assert_eq!(parsed.name(), "Minimal");
        assert_eq!(parsed.super_class_name(), Some("java/lang/Object"));
        assert_eq!(parsed.constants.len(), 4);
        assert_eq!(encode(&parsed), bytes);
    }

    #[test]
    fn header_errors() {
        let mut bytes = encode(&minimal());
        bytes[0] = 0xCB;
        let err = ClassFile::parse(bytes.as_slice()).unwrap_err();
        assert!(matches!(err.error, Error::InvalidMagic(0xCBFEBABE)));

        let mut bytes = encode(&minimal());
        bytes[7] = 53;
        let err = ClassFile::parse(bytes.as_slice()).unwrap_err();
        assert!(matches!(err.error, Error::UnsupportedVersion(_)));
        assert_eq!(err.progress.bytes_read, 8);

        let mut bytes = encode(&minimal());
        bytes[8] = 0;
        bytes[9] = 0;
        let err = ClassFile::parse(bytes.as_slice()).unwrap_err();
        assert!(matches!(err.error, Error::InvalidConstantPoolCount));

        let bytes = encode(&minimal());
        let err = ClassFile::parse(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(
            err.error,
            Error::UnexpectedEof(ReadContext::AttributeInfo)
        ));
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = encode(&minimal());
        bytes.push(0);
        let err = ClassFile::parse(bytes.as_slice()).unwrap_err();
        assert!(matches!(err.error, Error::TrailingBytes));
    }

    #[test]
    fn field_offsets() {
        let mut class = minimal();
        let private = FieldAccessFlags::PRIVATE;
        let statik = FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC;
        add_field(&mut class, private, "a", "I");
        add_field(&mut class, statik, "s", "J");
        add_field(&mut class, private, "b", "D");
        add_field(&mut class, statik, "t", "Ljava/lang/String;");
        add_field(&mut class, private, "c", "[I");

        let parsed = ClassFile::parse(encode(&class).as_slice()).unwrap();
        let offsets: Vec<usize> = parsed.fields.iter().map(|field| field.offset).collect();
        assert_eq!(offsets, vec![0, 0, 1, 2, 3]);
        assert_eq!(parsed.static_field_count, 3);
        assert_eq!(parsed.instance_field_count, 4);
    }

    #[test]
    fn member_errors() {
        let mut class = minimal();
        add_field(&mut class, FieldAccessFlags::PUBLIC, "x", "V");
        let err = ClassFile::parse(encode(&class).as_slice()).unwrap_err();
        assert!(matches!(err.error, Error::InvalidFieldDescriptorIndex(_)));
        assert_eq!(err.progress.fields.read, 0);

        let mut class = minimal();
        add_field(&mut class, FieldAccessFlags::PUBLIC, "ok", "I");
        add_field(&mut class, FieldAccessFlags::PUBLIC, "9lives", "I");
        let err = ClassFile::parse(encode(&class).as_slice()).unwrap_err();
        assert!(matches!(err.error, Error::InvalidNameIndex(_)));
        assert_eq!(err.progress.fields.read, 1);

        let mut class = minimal();
        let name_index = class.constants.get_utf8("<clinit>");
        let descriptor_index = class.constants.get_utf8("()V");
        let code = Attribute::new(
            &mut class.constants,
            Code {
                max_stack: 0,
                max_locals: 0,
                code_array: vec![0xB1],
                exception_table: vec![],
                attributes: vec![],
            },
        );
        class.methods.push(Method {
            access_flags: MethodAccessFlags::STATIC,
            name_index,
            descriptor_index,
            attributes: vec![code],
        });
        let parsed = ClassFile::parse(encode(&class).as_slice()).unwrap();
        assert!(parsed.find_method("<clinit>", "()V").unwrap().code().is_some());
    }

    #[test]
    fn interface_and_super_errors() {
        let mut class = minimal();
        let not_a_class = class.constants.get_utf8("Minimal");
        class.interfaces.push(ClassConstantIndex(not_a_class.0));
        let err = ClassFile::parse(encode(&class).as_slice()).unwrap_err();
        assert!(matches!(err.error, Error::InvalidInterfaceIndex(1)));

        let mut class = minimal();
        class.super_class = Some(ClassConstantIndex(ConstantIndex(1)));
        let err = ClassFile::parse(encode(&class).as_slice()).unwrap_err();
        assert!(matches!(err.error, Error::InvalidSuperClassIndex(1)));

        let mut class = minimal();
        class.super_class = None;
        assert!(ClassFile::parse(encode(&class).as_slice()).is_ok());
    }

    #[test]
    fn wide_constants() {
        let mut class = minimal();
        let value = class.constants.push(Constant::Long(-1));
        class.constants.push(Constant::Double(f64::NAN));
        let mut field = FieldAccessFlags::STATIC | FieldAccessFlags::FINAL;
        field |= FieldAccessFlags::PUBLIC;
        add_field(&mut class, field, "BIG", "J");
        let constant_value = Attribute::new(&mut class.constants, ConstantValue(value));
        class.fields[0].attributes.push(constant_value);

        let bytes = encode(&class);
        let parsed = ClassFile::parse(bytes.as_slice()).unwrap();
        assert_eq!(parsed.fields[0].constant_value(), Some(ConstantValue(value)));
        assert_eq!(parsed.constants.get(ConstantIndex(value.0 + 1)), None);
        assert_eq!(encode(&parsed), bytes);
        assert_eq!(parsed.static_field_count, 2);
    }

    #[test]
    fn progress_counts() {
        // Cut off in the middle of the first UTF-8 entry
        let bytes = encode(&minimal());
        let err = ClassFile::parse(&bytes[..14]).unwrap_err();
        assert!(matches!(err.error, Error::UnexpectedEof(ReadContext::Utf8)));
        assert_eq!(err.progress.bytes_read, 13);
        assert_eq!(
            err.progress.constant_pool,
            ListProgress {
                declared: 5,
                read: 1
            }
        );
        assert_eq!(err.progress.last_tag, Some(1));
    }
}
