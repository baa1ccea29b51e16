use std::string::FromUtf8Error;
use thiserror::Error;

/// Read the value from the buffer.
///
/// If [DecodeError::Short] is returned, the caller should try again with more data.
/// Nothing should be considered consumed on error; callers decode from a cursor and only advance on success.
pub trait Decode: Sized {
	/// Decode the value from the given buffer.
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}

/// A decode error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
	/// The input ended in the middle of a value.
	#[error("short buffer")]
	Short,

	#[error("invalid string")]
	InvalidString(#[from] FromUtf8Error),

	#[error("invalid stream type: {0}")]
	InvalidStream(u64),

	#[error("duplicate parameter: {0}")]
	DuplicateParameter(u64),

	#[error("missing parameter: {0}")]
	MissingParameter(u64),

	#[error("invalid parameter: {0}")]
	InvalidParameter(u64),

	#[error("invalid order: {0}")]
	InvalidOrder(u64),

	#[error("invalid ack: {0}")]
	InvalidAck(u64),

	#[error("too many")]
	TooMany,

	#[error("bounds exceeded")]
	BoundsExceeded,
}

impl Decode for u8 {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match r.has_remaining() {
			true => Ok(r.get_u8()),
			false => Err(DecodeError::Short),
		}
	}
}

impl Decode for String {
	/// Decode a string with a varint length prefix.
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = Vec::<u8>::decode(r)?;
		let str = String::from_utf8(v)?;

		Ok(str)
	}
}

impl Decode for Vec<u8> {
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let bytes = bytes::Bytes::decode(buf)?;
		Ok(bytes.to_vec())
	}
}

impl Decode for bytes::Bytes {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let len = usize::decode(r)?;
		if r.remaining() < len {
			return Err(DecodeError::Short);
		}

		Ok(r.copy_to_bytes(len))
	}
}
