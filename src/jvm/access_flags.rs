use super::{Error, FlagsOwner, Serialize};
use bitflags::bitflags;
use byteorder::WriteBytesExt;
use std::io::Result;

bitflags! {
    /// Access flags on classes
    ///
    /// Only the flags accepted by the loader are defined: any other bit is reserved.
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Access flags on fields
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.5-200-A.1
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
    }
}

bitflags! {
    /// Access flags on inner classes
    ///
    /// Only undefined bits are rejected.
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.6-300-D.1-D.1
    pub struct InnerClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

/// At most one of `public`, `private`, `protected`
fn single_visibility(public: bool, private: bool, protected: bool) -> bool {
    [public, private, protected].iter().filter(|set| **set).count() <= 1
}

impl ClassAccessFlags {
    /// Decode and validate the access flags of a class
    ///
    /// Interfaces must be `abstract`, and may not be `final` or `super`.
    pub fn check(bits: u16) -> std::result::Result<ClassAccessFlags, Error> {
        let flags = ClassAccessFlags::from_bits(bits)
            .ok_or(Error::ReservedAccessFlags(FlagsOwner::Class))?;

        if flags.contains(ClassAccessFlags::INTERFACE)
            && (!flags.contains(ClassAccessFlags::ABSTRACT)
                || flags.intersects(ClassAccessFlags::FINAL | ClassAccessFlags::SUPER))
        {
            return Err(Error::InvalidAccessFlags(FlagsOwner::Class));
        }

        Ok(flags)
    }
}

impl MethodAccessFlags {
    /// Decode and validate the access flags of a method
    pub fn check(bits: u16) -> std::result::Result<MethodAccessFlags, Error> {
        let flags = MethodAccessFlags::from_bits(bits)
            .ok_or(Error::ReservedAccessFlags(FlagsOwner::Method))?;

        let incompatible_with_abstract = MethodAccessFlags::FINAL
            | MethodAccessFlags::NATIVE
            | MethodAccessFlags::PRIVATE
            | MethodAccessFlags::STATIC
            | MethodAccessFlags::STRICT
            | MethodAccessFlags::SYNCHRONIZED;
        let abstract_conflict = flags.contains(MethodAccessFlags::ABSTRACT)
            && flags.intersects(incompatible_with_abstract);

        let visibility_ok = single_visibility(
            flags.contains(MethodAccessFlags::PUBLIC),
            flags.contains(MethodAccessFlags::PRIVATE),
            flags.contains(MethodAccessFlags::PROTECTED),
        );

        if abstract_conflict || !visibility_ok {
            Err(Error::InvalidAccessFlags(FlagsOwner::Method))
        } else {
            Ok(flags)
        }
    }
}

impl FieldAccessFlags {
    /// Decode and validate the access flags of a field
    ///
    /// Fields of an interface must be `public static final`.
    pub fn check(
        bits: u16,
        class_flags: ClassAccessFlags,
    ) -> std::result::Result<FieldAccessFlags, Error> {
        let flags = FieldAccessFlags::from_bits(bits)
            .ok_or(Error::ReservedAccessFlags(FlagsOwner::Field))?;

        let interface_constant =
            FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL;
        let interface_ok = !class_flags.contains(ClassAccessFlags::INTERFACE)
            || flags.contains(interface_constant);

        let visibility_ok = single_visibility(
            flags.contains(FieldAccessFlags::PUBLIC),
            flags.contains(FieldAccessFlags::PRIVATE),
            flags.contains(FieldAccessFlags::PROTECTED),
        );

        if interface_ok && visibility_ok {
            Ok(flags)
        } else {
            Err(Error::InvalidAccessFlags(FlagsOwner::Field))
        }
    }
}

impl InnerClassAccessFlags {
    pub fn check(bits: u16) -> std::result::Result<InnerClassAccessFlags, Error> {
        InnerClassAccessFlags::from_bits(bits)
            .ok_or(Error::ReservedAccessFlags(FlagsOwner::InnerClass))
    }
}

impl Serialize for ClassAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for MethodAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for FieldAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for InnerClassAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn class_flags() {
        assert_eq!(
            ClassAccessFlags::check(0x0021).unwrap(),
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER
        );
        assert!(ClassAccessFlags::check(0x0601).is_ok());
        assert!(matches!(
            ClassAccessFlags::check(0x1021),
            Err(Error::ReservedAccessFlags(FlagsOwner::Class))
        ));
        assert!(matches!(
            ClassAccessFlags::check(0x0201),
            Err(Error::InvalidAccessFlags(FlagsOwner::Class))
        ));
        assert!(matches!(
            ClassAccessFlags::check(0x0621),
            Err(Error::InvalidAccessFlags(FlagsOwner::Class))
        ));
    }

    #[test]
    fn method_flags() {
        assert!(MethodAccessFlags::check(0x0009).is_ok());
        assert!(MethodAccessFlags::check(0x0401).is_ok());
        assert!(matches!(
            MethodAccessFlags::check(0x0408),
            Err(Error::InvalidAccessFlags(FlagsOwner::Method))
        ));
        assert!(matches!(
            MethodAccessFlags::check(0x0003),
            Err(Error::InvalidAccessFlags(FlagsOwner::Method))
        ));
        assert!(matches!(
            MethodAccessFlags::check(0x0200),
            Err(Error::ReservedAccessFlags(FlagsOwner::Method))
        ));
    }

    #[test]
    fn field_flags() {
        let plain = ClassAccessFlags::PUBLIC;
        let interface = ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;

        assert!(FieldAccessFlags::check(0x0002, plain).is_ok());
        assert!(FieldAccessFlags::check(0x0019, interface).is_ok());
        assert!(matches!(
            FieldAccessFlags::check(0x0009, interface),
            Err(Error::InvalidAccessFlags(FlagsOwner::Field))
        ));
        assert!(matches!(
            FieldAccessFlags::check(0x0006, plain),
            Err(Error::InvalidAccessFlags(FlagsOwner::Field))
        ));
        assert!(matches!(
            FieldAccessFlags::check(0x1002, plain),
            Err(Error::ReservedAccessFlags(FlagsOwner::Field))
        ));
    }
}
