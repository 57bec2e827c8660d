use super::{FieldType, ParseDescriptor};
use std::borrow::Cow;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Names of methods, fields
///
/// See <https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.2.2>
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct UnqualifiedName(Cow<'static, str>);

/// Names of classes and interfaces, using `/` as the package separator
///
/// Array classes (eg. `[Ljava/lang/String;`) are also valid binary names.
///
/// See <https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct BinaryName(Cow<'static, str>);

pub trait Name: Sized {
    /// Check if a string would be a valid name
    fn check_valid(name: impl AsRef<str>) -> Result<(), String>;

    /// Extact the raw underlying string data:
    fn as_cow(&self) -> &Cow<'static, str>;

    /// Extact the raw underlying string name
    fn as_str(&self) -> &str {
        self.as_cow().as_ref()
    }

    /// Try to construct a name from a string
    fn from_string(name: String) -> Result<Self, String>;
}

/// Check the identifier rules shared by every kind of name
///
///   - it is not empty
///   - no segment starts with a digit
///   - only letters, digits, `_`, and `$` are allowed (plus `/` between segments of a class name)
fn check_identifier(name: &str, allow_slash: bool) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name is empty".to_string());
    }

    let mut segment_start = true;
    for c in name.chars() {
        let allowed = c.is_alphabetic()
            || c == '_'
            || c == '$'
            || (c.is_ascii_digit() && !segment_start)
            || (c == '/' && allow_slash && !segment_start);
        if !allowed {
            return Err(format!(
                "Name '{}' contains an illegal character '{}'",
                name,
                c.escape_default()
            ));
        }
        segment_start = c == '/';
    }

    Ok(())
}

impl UnqualifiedName {
    /// Like `check_valid`, but also accepting the two special method names
    pub fn check_valid_method(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name == Self::INIT.as_str() || name == Self::CLINIT.as_str() {
            Ok(())
        } else {
            Self::check_valid(name)
        }
    }

    const fn name(value: &'static str) -> UnqualifiedName {
        UnqualifiedName(Cow::Borrowed(value))
    }

    // Special unqualified names - only these are allowed to have angle brackets in them
    pub const INIT: Self = Self::name("<init>");
    pub const CLINIT: Self = Self::name("<clinit>");

    pub const MAIN: Self = Self::name("main");
    pub const PRINTLN: Self = Self::name("println");
    pub const CURRENTTIMEMILLIS: Self = Self::name("currentTimeMillis");
}

impl Name for UnqualifiedName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        check_identifier(name.as_ref(), false)
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        match Self::check_valid(&name) {
            Ok(()) => Ok(UnqualifiedName(Cow::Owned(name))),
            Err(msg) => Err(msg),
        }
    }
}

impl BinaryName {
    const fn name(value: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(value))
    }

    // JDK names
    pub const OBJECT: Self = Self::name("java/lang/Object");
    pub const STRING: Self = Self::name("java/lang/String");
    pub const SYSTEM: Self = Self::name("java/lang/System");
    pub const PRINTSTREAM: Self = Self::name("java/io/PrintStream");
}

impl Name for BinaryName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.starts_with('[') {
            FieldType::<BinaryName>::parse(name)
                .map(|_| ())
                .map_err(|err| format!("Invalid array class name '{}': {}", name, err))
        } else {
            check_identifier(name, true)
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        match Self::check_valid(&name) {
            Ok(()) => Ok(BinaryName(Cow::Owned(name))),
            Err(msg) => Err(msg),
        }
    }
}

impl Debug for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Debug for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Display for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}
