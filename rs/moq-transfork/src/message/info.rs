use crate::{
	coding::*,
	message::{Order, StreamBi},
};

/// Sent by the subscriber to request the current state of a track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoRequest {
	pub broadcast: String,
	pub track: String,
}

impl InfoRequest {
	pub const STREAM: StreamBi = StreamBi::Info;
}

impl Decode for InfoRequest {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let broadcast = String::decode(r)?;
		let track = String::decode(r)?;
		Ok(Self { broadcast, track })
	}
}

impl Encode for InfoRequest {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.broadcast.encode(w);
		self.track.encode(w);
	}
}

/// The publisher's view of a track.
///
/// Sent in response to an [InfoRequest], and as the acceptance of a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Info {
	pub priority: u64,
	pub order: Order,
	pub expires: u64,

	/// The most recent group sequence, if any.
	pub latest: Option<u64>,
}

impl Default for Info {
	fn default() -> Self {
		Self {
			priority: 0,
			order: Order::Descending,
			expires: 0,
			latest: None,
		}
	}
}

impl Decode for Info {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let priority = decode_u53(r)?;
		let order = Order::decode(r)?;
		let expires = decode_u53(r)?;
		let latest = decode_u53_maybe(r)?;

		Ok(Self {
			priority,
			order,
			expires,
			latest,
		})
	}
}

impl Encode for Info {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, self.priority);
		self.order.encode(w);
		encode_u53(w, self.expires);
		encode_u53_maybe(w, self.latest);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_info_latest_sentinel() {
		let zero = Info {
			latest: Some(0),
			..Default::default()
		};
		let unset = Info::default();

		let zero_bytes = zero.encode_bytes();
		let unset_bytes = unset.encode_bytes();
		assert_ne!(zero_bytes, unset_bytes);

		assert_eq!(Info::decode(&mut zero_bytes.clone()).unwrap(), zero);
		assert_eq!(Info::decode(&mut unset_bytes.clone()).unwrap(), unset);
	}

	#[test]
	fn test_info_round_trip() {
		let info = Info {
			priority: 3,
			order: Order::Ascending,
			expires: 1500,
			latest: Some(41),
		};

		let mut buf = info.encode_bytes();
		assert_eq!(Info::decode(&mut buf).unwrap(), info);
		assert!(buf.is_empty());
	}

	#[test]
	fn test_info_request_round_trip() {
		let msg = InfoRequest {
			broadcast: "demo".to_string(),
			track: "video".to_string(),
		};

		let mut buf = msg.encode_bytes();
		assert_eq!(InfoRequest::decode(&mut buf).unwrap(), msg);
	}
}
