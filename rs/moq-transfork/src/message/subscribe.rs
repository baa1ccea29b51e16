use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{coding::*, message::StreamBi};

/// The order in which groups should be delivered, by sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u64)]
pub enum Order {
	/// Groups are delivered in whatever order they arrive.
	Any = 0,
	Ascending = 1,
	Descending = 2,
}

// Not derived, as num_enum would treat a `#[default]` variant as a catch-all.
impl Default for Order {
	fn default() -> Self {
		Self::Any
	}
}

impl Decode for Order {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = decode_u53(r)?;
		Self::try_from(v).map_err(|_| DecodeError::InvalidOrder(v))
	}
}

impl Encode for Order {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, u64::from(*self))
	}
}

/// The mutable portion of a subscription.
///
/// Sent standalone on an existing subscription stream to change how it's delivered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscribeUpdate {
	pub priority: u64,
	pub order: Order,

	/// How long to keep the subscription alive without new groups, in milliseconds. 0 means forever.
	pub expires: u64,

	/// The first group sequence to deliver (inclusive).
	pub start: Option<u64>,

	/// The last group sequence to deliver (exclusive).
	pub end: Option<u64>,
}

impl SubscribeUpdate {
	/// Returns true if the group sequence falls within the `[start, end)` window.
	pub fn contains(&self, sequence: u64) -> bool {
		self.start.is_none_or(|start| sequence >= start) && self.end.is_none_or(|end| sequence < end)
	}
}

impl Decode for SubscribeUpdate {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let priority = decode_u53(r)?;
		let order = Order::decode(r)?;
		let expires = decode_u53(r)?;
		let start = Option::<u64>::decode(r)?;
		let end = Option::<u64>::decode(r)?;

		Ok(Self {
			priority,
			order,
			expires,
			start,
			end,
		})
	}
}

impl Encode for SubscribeUpdate {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, self.priority);
		self.order.encode(w);
		encode_u53(w, self.expires);
		self.start.encode(w);
		self.end.encode(w);
	}
}

/// Sent by the subscriber to request all future groups for the given track.
///
/// Groups will reference the provided ID instead of the full track name, to save bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscribe {
	pub id: u64,
	pub broadcast: String,
	pub track: String,
	pub update: SubscribeUpdate,
}

impl Subscribe {
	pub const STREAM: StreamBi = StreamBi::Subscribe;
}

impl Decode for Subscribe {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let id = u64::decode(r)?;
		let broadcast = String::decode(r)?;
		let track = String::decode(r)?;
		let update = SubscribeUpdate::decode(r)?;

		Ok(Self {
			id,
			broadcast,
			track,
			update,
		})
	}
}

impl Encode for Subscribe {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.id.encode(w);
		self.broadcast.encode(w);
		self.track.encode(w);
		self.update.encode(w);
	}
}

/// Identical to [Subscribe] on the wire, but requests unreliable delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagrams(pub Subscribe);

impl Datagrams {
	pub const STREAM: StreamBi = StreamBi::Datagrams;
}

impl Decode for Datagrams {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Subscribe::decode(r).map(Self)
	}
}

impl Encode for Datagrams {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.0.encode(w)
	}
}
