use super::Serialize;
use byteorder::WriteBytesExt;
use std::io::Result;
use std::ops::RangeInclusive;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub minor_version: u16,
    pub major_version: u16,
}

impl Version {
    /// JVM class file version corresponding to Java SE 8 (released March 2014)
    pub const JAVA8: Version = Version {
        minor_version: 0,
        major_version: 52,
    };

    /// Major versions the loader accepts (JDK 1.1 through Java SE 8)
    pub const SUPPORTED_MAJOR: RangeInclusive<u16> = 45..=52;

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED_MAJOR.contains(&self.major_version)
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}
