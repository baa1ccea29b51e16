use crate::{coding::*, message::StreamBi};

/// The mutable portion of a [Fetch].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchUpdate {
	pub priority: u64,
}

impl Decode for FetchUpdate {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			priority: decode_u53(r)?,
		})
	}
}

impl Encode for FetchUpdate {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, self.priority)
	}
}

/// A one-shot request for a track.
///
/// Unlike [crate::message::Subscribe], the response is a finite stream and nothing persists afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fetch {
	pub broadcast: String,
	pub track: String,
	pub update: FetchUpdate,
}

impl Fetch {
	pub const STREAM: StreamBi = StreamBi::Fetch;
}

impl Decode for Fetch {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let broadcast = String::decode(r)?;
		let track = String::decode(r)?;
		let update = FetchUpdate::decode(r)?;

		Ok(Self {
			broadcast,
			track,
			update,
		})
	}
}

impl Encode for Fetch {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.broadcast.encode(w);
		self.track.encode(w);
		self.update.encode(w);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_fetch_round_trip() {
		let msg = Fetch {
			broadcast: "demo".to_string(),
			track: "catalog.json".to_string(),
			update: FetchUpdate { priority: 7 },
		};

		let mut buf = msg.encode_bytes();
		assert_eq!(Fetch::decode(&mut buf).unwrap(), msg);
		assert!(buf.is_empty());
	}
}
