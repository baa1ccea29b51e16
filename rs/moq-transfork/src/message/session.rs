use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
	coding::*,
	message::{Extensions, StreamBi},
};

/// The extension id reserved for the [Role].
pub const ROLE_EXTENSION: u64 = 0;

/// Whether an endpoint publishes, subscribes, or both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum Role {
	Publisher = 1,
	Subscriber = 2,
	Both = 3,
}

impl Role {
	pub fn is_publisher(&self) -> bool {
		matches!(self, Self::Publisher | Self::Both)
	}

	pub fn is_subscriber(&self) -> bool {
		matches!(self, Self::Subscriber | Self::Both)
	}

	/// Read the role from the extensions.
	pub fn from_extensions(extensions: &Extensions) -> Result<Self, DecodeError> {
		let raw = extensions
			.get(ROLE_EXTENSION)
			.ok_or(DecodeError::MissingParameter(ROLE_EXTENSION))?;

		match raw.as_ref() {
			[byte] => Role::try_from(*byte).map_err(|_| DecodeError::InvalidParameter(ROLE_EXTENSION)),
			_ => Err(DecodeError::InvalidParameter(ROLE_EXTENSION)),
		}
	}

	fn to_extensions(self, extensions: &Extensions) -> Extensions {
		let mut extensions = extensions.clone();
		extensions.set(ROLE_EXTENSION, vec![u8::from(self)]);
		extensions
	}
}

impl std::str::FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"publisher" => Ok(Self::Publisher),
			"subscriber" => Ok(Self::Subscriber),
			"both" => Ok(Self::Both),
			_ => Err(format!("invalid role: {s}")),
		}
	}
}

/// Sent by the client to start the session, listing the versions it supports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionClient {
	pub versions: Versions,
	pub role: Role,

	/// Any extensions, excluding the role which is written on encode and removed on decode.
	pub extensions: Extensions,
}

impl SessionClient {
	pub const STREAM: StreamBi = StreamBi::Session;
}

impl Decode for SessionClient {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let versions = Versions::decode(r)?;
		let mut extensions = Extensions::decode(r)?;
		let role = Role::from_extensions(&extensions)?;
		extensions.remove(ROLE_EXTENSION);

		Ok(Self {
			versions,
			role,
			extensions,
		})
	}
}

impl Encode for SessionClient {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.versions.encode(w);
		self.role.to_extensions(&self.extensions).encode(w);
	}
}

/// Sent by the server in response to [SessionClient], with the chosen version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionServer {
	pub version: Version,
	pub role: Role,
	pub extensions: Extensions,
}

impl Decode for SessionServer {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let version = Version::decode(r)?;
		let mut extensions = Extensions::decode(r)?;
		let role = Role::from_extensions(&extensions)?;
		extensions.remove(ROLE_EXTENSION);

		Ok(Self {
			version,
			role,
			extensions,
		})
	}
}

impl Encode for SessionServer {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.version.encode(w);
		self.role.to_extensions(&self.extensions).encode(w);
	}
}

/// Sent by the server after the handshake, and again whenever the estimated bitrate changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionInfo {
	/// The estimated bitrate in bits per second.
	pub bitrate: u64,
}

impl Decode for SessionInfo {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			bitrate: decode_u53(r)?,
		})
	}
}

impl Encode for SessionInfo {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, self.bitrate);
	}
}
