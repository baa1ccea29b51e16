use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{coding::*, message::*};

/// The first value on a bidirectional stream, identifying the message that follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum StreamBi {
	Session = 0x0,
	Announce = 0x1,
	Subscribe = 0x2,
	Datagrams = 0x3,
	Fetch = 0x4,
	Info = 0x5,
}

impl Decode for StreamBi {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = decode_u53(r)?;
		Self::try_from(v).map_err(|_| DecodeError::InvalidStream(v))
	}
}

impl Encode for StreamBi {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, u64::from(*self))
	}
}

/// The first value on a unidirectional stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum StreamUni {
	Group = 0x0,
}

impl Decode for StreamUni {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = decode_u53(r)?;
		Self::try_from(v).map_err(|_| DecodeError::InvalidStream(v))
	}
}

impl Encode for StreamUni {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, u64::from(*self))
	}
}

/// The opening message of a bidirectional stream, dispatched on the stream type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Bi {
	Session(SessionClient),
	Announce(Announce),
	Subscribe(Subscribe),
	Datagrams(Datagrams),
	Fetch(Fetch),
	Info(InfoRequest),
}

impl Bi {
	pub fn stream(&self) -> StreamBi {
		match self {
			Self::Session(_) => StreamBi::Session,
			Self::Announce(_) => StreamBi::Announce,
			Self::Subscribe(_) => StreamBi::Subscribe,
			Self::Datagrams(_) => StreamBi::Datagrams,
			Self::Fetch(_) => StreamBi::Fetch,
			Self::Info(_) => StreamBi::Info,
		}
	}
}

impl Decode for Bi {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(match StreamBi::decode(r)? {
			StreamBi::Session => Self::Session(SessionClient::decode(r)?),
			StreamBi::Announce => Self::Announce(Announce::decode(r)?),
			StreamBi::Subscribe => Self::Subscribe(Subscribe::decode(r)?),
			StreamBi::Datagrams => Self::Datagrams(Datagrams::decode(r)?),
			StreamBi::Fetch => Self::Fetch(Fetch::decode(r)?),
			StreamBi::Info => Self::Info(InfoRequest::decode(r)?),
		})
	}
}

impl Encode for Bi {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.stream().encode(w);

		match self {
			Self::Session(msg) => msg.encode(w),
			Self::Announce(msg) => msg.encode(w),
			Self::Subscribe(msg) => msg.encode(w),
			Self::Datagrams(msg) => msg.encode(w),
			Self::Fetch(msg) => msg.encode(w),
			Self::Info(msg) => msg.encode(w),
		}
	}
}

/// The opening message of a unidirectional stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Uni {
	Group(Group),
}

impl Decode for Uni {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(match StreamUni::decode(r)? {
			StreamUni::Group => Self::Group(Group::decode(r)?),
		})
	}
}

impl Encode for Uni {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self {
			Self::Group(msg) => {
				StreamUni::Group.encode(w);
				msg.encode(w);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::Bytes;

	#[test]
	fn test_bi_dispatch() {
		let mut extensions = Extensions::default();
		extensions.set(7, Bytes::from_static(b"extra"));

		let msgs = vec![
			Bi::Session(SessionClient {
				versions: [Version::FORK_00].into(),
				role: Role::Subscriber,
				extensions,
			}),
			Bi::Announce(Announce {
				broadcast: "demo".to_string(),
			}),
			Bi::Subscribe(Subscribe {
				id: 1,
				broadcast: "demo".to_string(),
				track: "video".to_string(),
				update: SubscribeUpdate::default(),
			}),
			Bi::Datagrams(Datagrams(Subscribe {
				id: 2,
				broadcast: "demo".to_string(),
				track: "audio".to_string(),
				update: SubscribeUpdate::default(),
			})),
			Bi::Fetch(Fetch {
				broadcast: "demo".to_string(),
				track: "catalog".to_string(),
				update: FetchUpdate { priority: 1 },
			}),
			Bi::Info(InfoRequest {
				broadcast: "demo".to_string(),
				track: "video".to_string(),
			}),
		];

		for msg in msgs {
			let mut buf = msg.encode_bytes();
			let decoded = Bi::decode(&mut buf).unwrap();
			assert_eq!(decoded.stream(), msg.stream());
			assert_eq!(decoded, msg);
		}
	}

	#[test]
	fn test_datagrams_tag() {
		let subscribe = Subscribe {
			id: 9,
			broadcast: "demo".to_string(),
			track: "video".to_string(),
			update: SubscribeUpdate::default(),
		};

		let a = Bi::Subscribe(subscribe.clone()).encode_bytes();
		let b = Bi::Datagrams(Datagrams(subscribe)).encode_bytes();

		assert_eq!(a[0], 0x02);
		assert_eq!(b[0], 0x03);
		assert_eq!(a[1..], b[1..]);
	}

	#[test]
	fn test_unknown_stream() {
		let mut buf = Bytes::from_static(&[0x06]);
		assert_eq!(Bi::decode(&mut buf), Err(DecodeError::InvalidStream(6)));

		let mut buf = Bytes::from_static(&[0x01]);
		assert_eq!(Uni::decode(&mut buf), Err(DecodeError::InvalidStream(1)));
	}

	#[test]
	fn test_uni() {
		let msg = Uni::Group(Group {
			subscribe: 3,
			sequence: 1,
		});

		let mut buf = msg.encode_bytes();
		assert_eq!(buf.as_ref(), &[0x00, 0x03, 0x01]);
		assert_eq!(Uni::decode(&mut buf).unwrap(), msg);
	}
}
