use bytes::Bytes;

use crate::{coding::*, message::StreamUni};

/// The header of a unidirectional stream carrying a single group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Group {
	/// The subscription id this group answers.
	pub subscribe: u64,

	/// The group sequence number, increasing within a subscription.
	pub sequence: u64,
}

impl Group {
	pub const STREAM: StreamUni = StreamUni::Group;
}

impl Decode for Group {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let subscribe = u64::decode(r)?;
		let sequence = decode_u53(r)?;
		Ok(Self { subscribe, sequence })
	}
}

impl Encode for Group {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.subscribe.encode(w);
		encode_u53(w, self.sequence);
	}
}

/// Sent on the subscription stream when groups will never arrive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupDrop {
	/// The first dropped sequence.
	pub sequence: u64,

	/// The number of consecutive groups dropped.
	pub count: u64,

	/// An application error code.
	pub error: u64,
}

impl GroupDrop {
	/// The sequence after the last dropped group.
	pub fn end(&self) -> u64 {
		self.sequence.saturating_add(self.count)
	}

	pub fn contains(&self, sequence: u64) -> bool {
		sequence >= self.sequence && sequence < self.end()
	}
}

impl Decode for GroupDrop {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let sequence = decode_u53(r)?;
		let count = decode_u53(r)?;
		let error = decode_u53(r)?;

		Ok(Self { sequence, count, error })
	}
}

impl Encode for GroupDrop {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, self.sequence);
		encode_u53(w, self.count);
		encode_u53(w, self.error);
	}
}

/// A length-prefixed payload within a group.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
	pub payload: Bytes,
}

impl Decode for Frame {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let payload = Bytes::decode(r)?;
		Ok(Self { payload })
	}
}

impl Encode for Frame {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.payload.encode(w)
	}
}

impl std::fmt::Debug for Frame {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Frame").field("size", &self.payload.len()).finish()
	}
}
