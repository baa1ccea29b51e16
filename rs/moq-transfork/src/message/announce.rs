use crate::{
	coding::*,
	message::StreamBi,
};

/// Sent by the publisher to announce the availability of a broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announce {
	pub broadcast: String,
}

impl Announce {
	pub const STREAM: StreamBi = StreamBi::Announce;
}

impl Decode for Announce {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let broadcast = String::decode(r)?;
		Ok(Self { broadcast })
	}
}

impl Encode for Announce {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.broadcast.encode(w)
	}
}

/// Sent by the subscriber to acknowledge an [Announce].
///
/// The wire value is fixed; anything else is an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AnnounceOk;

impl AnnounceOk {
	const VALUE: u64 = 1;
}

impl Decode for AnnounceOk {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match decode_u53(r)? {
			Self::VALUE => Ok(Self),
			v => Err(DecodeError::InvalidAck(v)),
		}
	}
}

impl Encode for AnnounceOk {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, Self::VALUE)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::Bytes;

	#[test]
	fn test_announce() {
		let msg = Announce {
			broadcast: "conference/room123".to_string(),
		};

		let mut buf = msg.encode_bytes();
		assert_eq!(Announce::decode(&mut buf).unwrap(), msg);
	}

	#[test]
	fn test_announce_ok() {
		let mut buf = AnnounceOk.encode_bytes();
		assert_eq!(buf.as_ref(), &[0x01]);
		assert_eq!(AnnounceOk::decode(&mut buf).unwrap(), AnnounceOk);
	}

	#[test]
	fn test_announce_ok_invalid() {
		let mut buf = Bytes::from_static(&[0x02]);
		assert_eq!(AnnounceOk::decode(&mut buf), Err(DecodeError::InvalidAck(2)));
	}
}
