use std::fmt;

use crate::coding::{Decode, DecodeError, Encode};

/// A QUIC-style variable-length integer, limited to 62 bits.
///
/// The two most significant bits of the first byte encode the length:
/// - `00` → 1 byte (6 bits)
/// - `01` → 2 bytes (14 bits)
/// - `10` → 4 bytes (30 bits)
/// - `11` → 8 bytes (62 bits)
///
/// The same wire bytes decode regardless of the integer width the caller wants, provided the value fits.
/// Non-minimal encodings are accepted.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarInt(u64);

impl VarInt {
	/// The largest value that can be encoded: 2^62 - 1.
	pub const MAX: Self = Self((1 << 62) - 1);

	/// The largest value that survives a round trip through a 64-bit float: 2^53 - 1.
	pub const MAX_U53: Self = Self((1 << 53) - 1);

	pub const ZERO: Self = Self(0);

	pub const fn from_u32(value: u32) -> Self {
		Self(value as u64)
	}

	pub const fn from_u64(value: u64) -> Option<Self> {
		if value <= Self::MAX.0 { Some(Self(value)) } else { None }
	}

	pub const fn from_u128(value: u128) -> Option<Self> {
		if value <= Self::MAX.0 as u128 {
			Some(Self(value as u64))
		} else {
			None
		}
	}

	pub const fn into_inner(self) -> u64 {
		self.0
	}

	/// The number of bytes needed for the minimal encoding.
	pub const fn size(self) -> usize {
		if self.0 < 0x40 {
			1
		} else if self.0 < 0x4000 {
			2
		} else if self.0 < 0x4000_0000 {
			4
		} else {
			8
		}
	}
}

impl fmt::Debug for VarInt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl fmt::Display for VarInt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl From<u32> for VarInt {
	fn from(value: u32) -> Self {
		Self::from_u32(value)
	}
}

impl From<VarInt> for u64 {
	fn from(value: VarInt) -> Self {
		value.0
	}
}

impl TryFrom<u64> for VarInt {
	type Error = BoundsExceeded;

	fn try_from(value: u64) -> Result<Self, Self::Error> {
		Self::from_u64(value).ok_or(BoundsExceeded)
	}
}

impl TryFrom<usize> for VarInt {
	type Error = BoundsExceeded;

	fn try_from(value: usize) -> Result<Self, Self::Error> {
		Self::try_from(value as u64)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("value exceeds varint bounds")]
pub struct BoundsExceeded;

impl Decode for VarInt {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		if !r.has_remaining() {
			return Err(DecodeError::Short);
		}

		let first = r.chunk()[0];
		let size = 1usize << (first >> 6);

		if r.remaining() < size {
			return Err(DecodeError::Short);
		}

		let value = match size {
			1 => (r.get_u8() & 0x3f) as u64,
			2 => (r.get_u16() & 0x3fff) as u64,
			4 => (r.get_u32() & 0x3fff_ffff) as u64,
			8 => r.get_u64() & 0x3fff_ffff_ffff_ffff,
			_ => unreachable!(),
		};

		Ok(Self(value))
	}
}

impl Encode for VarInt {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self.size() {
			1 => w.put_u8(self.0 as u8),
			2 => w.put_u16(0x4000 | self.0 as u16),
			4 => w.put_u32(0x8000_0000 | self.0 as u32),
			8 => w.put_u64(0xc000_0000_0000_0000 | self.0),
			_ => unreachable!(),
		}
	}
}

// u64 is the 62-bit domain.
impl Decode for u64 {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		VarInt::decode(r).map(u64::from)
	}
}

impl Encode for u64 {
	/// Panics if the value exceeds 2^62 - 1.
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		VarInt::try_from(*self).expect("u62 overflow").encode(w)
	}
}

// usize is only used for lengths and counts, which are in the 53-bit domain.
impl Decode for usize {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = decode_u53(r)?;
		usize::try_from(v).map_err(|_| DecodeError::BoundsExceeded)
	}
}

impl Encode for usize {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, *self as u64)
	}
}

/// Decode a varint that must fit in 53 bits.
pub fn decode_u53<R: bytes::Buf>(r: &mut R) -> Result<u64, DecodeError> {
	let v = VarInt::decode(r)?;
	if v > VarInt::MAX_U53 {
		return Err(DecodeError::BoundsExceeded);
	}

	Ok(v.into_inner())
}

/// Encode a varint that must fit in 53 bits.
///
/// Panics if the value is larger, as that's a bug in the caller.
pub fn encode_u53<W: bytes::BufMut>(w: &mut W, v: u64) {
	assert!(v <= VarInt::MAX_U53.into_inner(), "u53 overflow: {v}");
	VarInt(v).encode(w)
}

/// Decode an optional u62 using the "+1, 0 = unset" sentinel.
impl Decode for Option<u64> {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(match u64::decode(r)? {
			0 => None,
			v => Some(v - 1),
		})
	}
}

impl Encode for Option<u64> {
	/// Panics if the value is [VarInt::MAX], as there's no room for the sentinel.
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self {
			None => 0u64.encode(w),
			Some(v) => v.checked_add(1).expect("sentinel overflow").encode(w),
		}
	}
}

/// Decode an optional u53 using the "+1, 0 = unset" sentinel.
pub fn decode_u53_maybe<R: bytes::Buf>(r: &mut R) -> Result<Option<u64>, DecodeError> {
	Ok(match decode_u53(r)? {
		0 => None,
		v => Some(v - 1),
	})
}

pub fn encode_u53_maybe<W: bytes::BufMut>(w: &mut W, v: Option<u64>) {
	match v {
		None => encode_u53(w, 0),
		Some(v) => encode_u53(w, v + 1),
	}
}
