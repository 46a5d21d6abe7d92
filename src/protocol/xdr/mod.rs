//! XDR is a standard for the description and encoding of data.
//! It is useful for transferring data between different computer
//! architectures, and it has been used to communicate data between such
//! diverse machines as the SUN WORKSTATION*, VAX*, IBM-PC*, and Cray*
//!
//! <https://datatracker.ietf.org/doc/html/rfc4506>
//!
//! Its Rust-specific implementation is presented below.
//! Where appropriate, the standard types of the XDR language have
//! been replaced by similar types of the Rust language. For example,
//! the 32-bit `unsigned int` type was replaced by the `u32` type, and the
//! `opaque<>` type was replaced by `[u8]`.
//!
//! Serialization writes into any [`std::io::Write`]. Deserialization reads
//! from a byte slice cursor (`&mut &[u8]`), so every declared length is
//! checked against what is actually left in the buffer before a single byte
//! is consumed. A short buffer is reported as a length mismatch and leaves
//! the cursor where it was.

use std::io::Write;

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};

pub mod mount;
pub mod nfs3;
pub mod portmap;
pub mod rpc;
mod utils;

pub use utils::{ensure_remaining, invalid_data, padding_len};

/// XDR assumes big endian encoding.
pub type XDREndian = BigEndian;

pub trait Serialize {
    /// Serializes the implementing type to the provided writer.
    ///
    /// ## Parameters
    /// * `dest` - Where will the value be serialized to.
    ///
    /// ## Returns
    /// * `std::io::Result<()>` - Ok(()) on success, or an error if serialization fails.
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

pub trait Deserialize {
    /// Deserializes data from the front of `src` into the implementing type,
    /// advancing `src` past the consumed bytes.
    ///
    /// ## Parameters
    /// * `src` - Remaining input. Left untouched when a length check fails.
    ///
    /// ## Returns
    /// * `std::io::Result<()>` - Ok(()) on success, or an error if deserialization fails.
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()>;
}

/// Deserialization based on the [Default] trait of the type T.
///
/// # Parameters
/// * src - From where the value will be deserialized
///
/// # Returns
/// * `std::io::Result<T>` - the value on success, or an error if deserialization fails.
pub fn deserialize<T>(src: &mut &[u8]) -> std::io::Result<T>
where
    T: Deserialize + Default,
{
    let mut val = T::default();
    val.deserialize(src)?;

    Ok(val)
}

/// Serializes `value` into a freshly allocated buffer.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.serialize(&mut buf)?;
    Ok(buf)
}

/// Number of bytes `value` takes once serialized, without allocating.
pub fn encoded_len<T: Serialize + ?Sized>(value: &T) -> std::io::Result<usize> {
    let mut counter = ByteCounter(0);
    value.serialize(&mut counter)?;
    Ok(counter.0)
}

struct ByteCounter(usize);

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Marker trait for XDR `enum` type serialization.
pub trait SerializeEnum: ToPrimitive {}

/// Enumerations have the same representation as signed integers.
impl<T: SerializeEnum> Serialize for T {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        if let Some(val) = self.to_i32() {
            return dest.write_i32::<XDREndian>(val);
        }
        Err(utils::invalid_data("Invalid enum value"))
    }
}

/// Marker trait for XDR `enum` type deserialization.
pub trait DeserializeEnum: FromPrimitive {}

/// Enumerations have the same representation as signed integers.
impl<T: DeserializeEnum> Deserialize for T {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        utils::ensure_remaining(src, 4)?;
        let val = src.read_i32::<XDREndian>()?;
        if let Some(val) = FromPrimitive::from_i32(val) {
            *self = val;
            return Ok(());
        }

        Err(utils::invalid_data("Invalid enum value"))
    }
}

/// XDR `void`: no bytes at all, used for procedures without arguments.
impl Serialize for () {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }
}

impl Deserialize for () {
    fn deserialize(&mut self, _src: &mut &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}

/// XDR `bool` type serialization implementation.
///
/// ```text
/// bool identifier;
/// ```
///
/// This is equivalent to:
///
/// ```text
///  enum { FALSE = 0, TRUE = 1 } identifier;
/// ```
impl Serialize for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<XDREndian>(if *self { 1 } else { 0 })
    }
}

/// XDR `bool` type deserialization implementation.
impl Deserialize for bool {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        utils::ensure_remaining(src, 4)?;
        match src.read_i32::<XDREndian>()? {
            0 => *self = false,
            1 => *self = true,
            _ => return Err(utils::invalid_data("Invalid value for bool enum")),
        }
        Ok(())
    }
}

/// XDR `unsigned int` type serialization implementation.
impl Serialize for u32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(*self)
    }
}

/// XDR `unsigned int` type deserialization implementation.
impl Deserialize for u32 {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        utils::ensure_remaining(src, 4)?;
        *self = src.read_u32::<XDREndian>()?;
        Ok(())
    }
}

/// XDR `unsigned hyper` type serialization implementation.
impl Serialize for u64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u64::<XDREndian>(*self)
    }
}

/// XDR `unsigned hyper` type deserialization implementation.
impl Deserialize for u64 {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        utils::ensure_remaining(src, 8)?;
        *self = src.read_u64::<XDREndian>()?;
        Ok(())
    }
}

/// Object lengths in XDR are always serialized as [u32]. This wrapper
/// type provides a way to serialize the [usize] type common to Rust as [u32].
#[derive(Default)]
struct UsizeAsU32(usize);

/// Try to convert [usize] to [u32] and serialize.
impl Serialize for UsizeAsU32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        let Some(val) = self.0.to_u32() else {
            return Err(utils::invalid_data("cannot cast `usize` to `u32`"));
        };

        val.serialize(dest)
    }
}

/// Try to deserialize [u32] and convert to [usize].
impl Deserialize for UsizeAsU32 {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        let Some(val) = deserialize::<u32>(src)?.to_usize() else {
            return Err(utils::invalid_data("cannot cast `u32` to `usize`"));
        };

        self.0 = val;
        Ok(())
    }
}

/// XDR Variable-Length Opaque Data serialization implementation.
impl Serialize for [u8] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        UsizeAsU32(self.len()).serialize(dest)?;
        dest.write_all(self)?;
        utils::write_padding(self.len(), dest)?;

        Ok(())
    }
}

impl Serialize for Vec<u8> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_slice().serialize(dest)
    }
}

/// XDR Variable-Length Opaque Data deserialization implementation.
///
/// The declared length must fit in what remains of `src`; otherwise nothing
/// is consumed.
impl Deserialize for Vec<u8> {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        let mut probe = *src;
        let length = deserialize::<UsizeAsU32>(&mut probe)?.0;
        let body = utils::take_padded(&mut probe, length)?;

        self.clear();
        self.extend_from_slice(body);
        *src = probe;
        Ok(())
    }
}

/// XDR String serialization implementation: the raw bytes as opaque data.
impl Serialize for str {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_bytes().serialize(dest)
    }
}

impl Serialize for String {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_str().serialize(dest)
    }
}

/// XDR String deserialization implementation.
impl Deserialize for String {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        let mut probe = *src;
        let bytes = deserialize::<Vec<u8>>(&mut probe)?;
        *self = String::from_utf8(bytes).map_err(|_| utils::invalid_data("string is not UTF-8"))?;
        *src = probe;
        Ok(())
    }
}

/// XDR variable-length array of `unsigned int`.
///
/// Serialized as a 4-byte count followed by that many 4-byte integers.
impl Serialize for [u32] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        UsizeAsU32(self.len()).serialize(dest)?;
        for i in self {
            i.serialize(dest)?;
        }

        Ok(())
    }
}

impl Serialize for Vec<u32> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_slice().serialize(dest)
    }
}

impl Deserialize for Vec<u32> {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        let mut probe = *src;
        let length = deserialize::<UsizeAsU32>(&mut probe)?.0;
        let needed = length
            .checked_mul(4)
            .ok_or_else(|| utils::invalid_data("array length overflows usize"))?;
        utils::ensure_remaining(probe, needed)?;

        self.clear();
        for _ in 0..length {
            self.push(deserialize::<u32>(&mut probe)?);
        }
        *src = probe;
        Ok(())
    }
}

/// Macro for implementing XDR serialization for structs.
///
/// This macro simplifies implementation of the XDR trait for struct types
/// by serializing each field in sequence.
#[macro_export]
macro_rules! SerializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl $crate::protocol::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                $($crate::protocol::xdr::Serialize::serialize(&self.$element, dest)?;)*
                Ok(())
            }
        }
    };
}

/// Macro for implementing XDR deserialization for structs, field by field.
#[macro_export]
macro_rules! DeserializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl $crate::protocol::xdr::Deserialize for $t {
            fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
                $($crate::protocol::xdr::Deserialize::deserialize(&mut self.$element, src)?;)*
                Ok(())
            }
        }
    };
}

/// XDR optional data (`bool` discriminant) for a two-armed enum whose
/// first arm is `Void`.
#[macro_export]
macro_rules! SerializeBoolUnion {
    (
        $t:ident,
        $enumcase:ident,
        $enumtype:ty
    ) => {
        impl $crate::protocol::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                use $crate::protocol::xdr::Serialize;
                match self {
                    $t::Void => false.serialize(dest),
                    $t::$enumcase(v) => {
                        true.serialize(dest)?;
                        v.serialize(dest)
                    }
                }
            }
        }
    };
}

#[macro_export]
macro_rules! DeserializeBoolUnion {
    (
        $t:ident,
        $enumcase:ident,
        $enumtype:ty
    ) => {
        impl $crate::protocol::xdr::Deserialize for $t {
            fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
                if $crate::protocol::xdr::deserialize::<bool>(src)? {
                    *self = $t::$enumcase($crate::protocol::xdr::deserialize::<$enumtype>(src)?);
                } else {
                    *self = $t::Void;
                }
                Ok(())
            }
        }
    };
}

// Re-export public types for use in other modules
pub use crate::DeserializeBoolUnion;
pub use crate::DeserializeStruct;
pub use crate::SerializeBoolUnion;
pub use crate::SerializeStruct;
