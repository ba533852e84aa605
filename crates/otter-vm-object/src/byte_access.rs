//! Typed loads and stores on byte buffers
//!
//! Backing store access for typed arrays and DataView-like views. An element
//! lives at `offset + index * bytes_per_element`; every access is checked
//! against the buffer length for the element width.

use half::f16;

use crate::error::{VmError, VmResult};

/// Byte order of multi-byte elements
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
    /// Byte order of the host
    Native,
}

/// Endian-aware element access
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteArrayAccess {
    order: ByteOrder,
}

/// Little-endian accessor
pub const LITTLE_ENDIAN_ORDER: ByteArrayAccess = ByteArrayAccess::new(ByteOrder::Little);
/// Big-endian accessor
pub const BIG_ENDIAN_ORDER: ByteArrayAccess = ByteArrayAccess::new(ByteOrder::Big);
/// Host-order accessor
pub const NATIVE_ORDER: ByteArrayAccess = ByteArrayAccess::new(ByteOrder::Native);

macro_rules! element_access {
    ($(($get:ident, $put:ident, $ty:ty)),* $(,)?) => {
        $(
            #[doc = concat!("Load a `", stringify!($ty), "`")]
            pub fn $get(
                &self,
                buffer: &[u8],
                offset: usize,
                index: usize,
                bytes_per_element: usize,
            ) -> VmResult<$ty> {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                let start = byte_index(buffer.len(), offset, index, bytes_per_element, WIDTH)?;
                let mut bytes = [0u8; WIDTH];
                bytes.copy_from_slice(&buffer[start..start + WIDTH]);
                Ok(match self.order {
                    ByteOrder::Little => <$ty>::from_le_bytes(bytes),
                    ByteOrder::Big => <$ty>::from_be_bytes(bytes),
                    ByteOrder::Native => <$ty>::from_ne_bytes(bytes),
                })
            }

            #[doc = concat!("Store a `", stringify!($ty), "`")]
            pub fn $put(
                &self,
                buffer: &mut [u8],
                offset: usize,
                index: usize,
                bytes_per_element: usize,
                value: $ty,
            ) -> VmResult<()> {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                let start = byte_index(buffer.len(), offset, index, bytes_per_element, WIDTH)?;
                let bytes = match self.order {
                    ByteOrder::Little => value.to_le_bytes(),
                    ByteOrder::Big => value.to_be_bytes(),
                    ByteOrder::Native => value.to_ne_bytes(),
                };
                buffer[start..start + WIDTH].copy_from_slice(&bytes);
                Ok(())
            }
        )*
    };
}

/// Start of the element, or `OutOfBounds` when `width` bytes from there do
/// not fit in `length`.
fn byte_index(
    length: usize,
    offset: usize,
    index: usize,
    bytes_per_element: usize,
    width: usize,
) -> VmResult<usize> {
    let start = index
        .checked_mul(bytes_per_element)
        .and_then(|n| n.checked_add(offset));
    match start {
        Some(start) if start.checked_add(width).is_some_and(|end| end <= length) => Ok(start),
        _ => Err(VmError::OutOfBounds {
            offset: start.unwrap_or(usize::MAX),
            width,
            length,
        }),
    }
}

impl ByteArrayAccess {
    /// Accessor for `order`
    pub const fn new(order: ByteOrder) -> Self {
        Self { order }
    }

    /// Byte order
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    element_access! {
        (get_int8, put_int8, i8),
        (get_uint8, put_uint8, u8),
        (get_int16, put_int16, i16),
        (get_uint16, put_uint16, u16),
        (get_int32, put_int32, i32),
        (get_uint32, put_uint32, u32),
        (get_int64, put_int64, i64),
        (get_float32, put_float32, f32),
        (get_float64, put_float64, f64),
    }

    /// Load a half-precision float, widened to `f32`
    pub fn get_float16(
        &self,
        buffer: &[u8],
        offset: usize,
        index: usize,
        bytes_per_element: usize,
    ) -> VmResult<f32> {
        let bits = self.get_uint16(buffer, offset, index, bytes_per_element)?;
        Ok(f16::from_bits(bits).to_f32())
    }

    /// Store `value` rounded to half precision
    pub fn put_float16(
        &self,
        buffer: &mut [u8],
        offset: usize,
        index: usize,
        bytes_per_element: usize,
        value: f32,
    ) -> VmResult<()> {
        let bits = f16::from_f32(value).to_bits();
        self.put_uint16(buffer, offset, index, bytes_per_element, bits)
    }
}
