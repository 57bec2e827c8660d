use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Result};

/// Utility trait for serializing data inside class files
///
/// Java class files have some peculiarities that make it useful to define an extra trait (instead
/// of just using `serde`):
///
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is usually `u16`
///
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(*self)
    }
}

impl Serialize for u32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(*self)
    }
}

impl Serialize for i8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i8(*self)
    }
}

impl Serialize for i16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i16::<BigEndian>(*self)
    }
}

impl Serialize for i32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(*self)
    }
}

impl Serialize for i64 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<BigEndian>(*self)
    }
}

/// Floats go out as their raw bits so that NaN payloads survive
impl Serialize for f32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(self.to_bits())
    }
}

impl Serialize for f64 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<BigEndian>(self.to_bits())
    }
}

/// Size in `u16` is the first thing serialized
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        (self.len() as u16).serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

/// Big-endian reader which keeps track of how many bytes it has consumed
///
/// The running count is what lets attribute parsing cross-check declared lengths against what
/// was actually read, and what lets a failed load report how far it got.
pub struct ClassReader<R> {
    inner: R,
    bytes_read: u64,
}

impl<R: Read> ClassReader<R> {
    pub fn new(inner: R) -> ClassReader<R> {
        ClassReader {
            inner,
            bytes_read: 0,
        }
    }

    /// Total number of bytes consumed so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.inner.read_u8()?;
        self.bytes_read += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let value = self.inner.read_u16::<BigEndian>()?;
        self.bytes_read += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.inner.read_u32::<BigEndian>()?;
        self.bytes_read += 4;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self.inner.read_i32::<BigEndian>()?;
        self.bytes_read += 4;
        Ok(value)
    }

    /// Reads the high word then the low word
    pub fn read_i64(&mut self) -> Result<i64> {
        let value = self.inner.read_i64::<BigEndian>()?;
        self.bytes_read += 8;
        Ok(value)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_u32().map(f32::from_bits)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let bits = self.inner.read_u64::<BigEndian>()?;
        self.bytes_read += 8;
        Ok(f64::from_bits(bits))
    }

    /// Read exactly `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0; len];
        self.inner.read_exact(&mut buffer)?;
        self.bytes_read += len as u64;
        Ok(buffer)
    }

    /// Discard exactly `len` bytes
    pub fn skip(&mut self, len: u64) -> Result<()> {
        let skipped = io::copy(&mut (&mut self.inner).take(len), &mut io::sink())?;
        self.bytes_read += skipped;
        if skipped < len {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "failed to skip attribute payload",
            ))
        } else {
            Ok(())
        }
    }

    /// Check whether the underlying input is exhausted
    ///
    /// Note: this consumes a byte if there is one (it is only used for the final check)
    pub fn at_end(&mut self) -> Result<bool> {
        let mut buffer = [0u8; 1];
        loop {
            match self.inner.read(&mut buffer) {
                Ok(0) => return Ok(true),
                Ok(_) => return Ok(false),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}
