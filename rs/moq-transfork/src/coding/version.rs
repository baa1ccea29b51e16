use crate::coding::*;

use std::{fmt, ops::Deref};

/// A version number negotiated during the session handshake.
///
/// Unknown values are preserved so a peer can tell us what it supports, even if we don't.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version(pub u64);

impl Version {
	pub const DRAFT_00: Version = Version(0xff000000);
	pub const DRAFT_01: Version = Version(0xff000001);
	pub const DRAFT_02: Version = Version(0xff000002);
	pub const DRAFT_03: Version = Version(0xff000003);

	/// A private fork of the draft, used until the changes are upstreamed.
	pub const FORK_00: Version = Version(0xff0bad00);
}

impl From<u64> for Version {
	fn from(v: u64) -> Self {
		Self(v)
	}
}

impl From<Version> for u64 {
	fn from(v: Version) -> Self {
		v.0
	}
}

impl Decode for Version {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = decode_u53(r)?;
		Ok(Self(v))
	}
}

impl Encode for Version {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_u53(w, self.0);
	}
}

impl fmt::Debug for Version {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

impl fmt::Display for Version {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

impl std::str::FromStr for Version {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let v = match s.strip_prefix("0x") {
			Some(hex) => u64::from_str_radix(hex, 16)?,
			None => s.parse()?,
		};

		Ok(Self(v))
	}
}

/// A list of versions in preferred order.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Versions(Vec<Version>);

impl Versions {
	/// Return the first version in our list that is also in `other`.
	///
	/// Our order wins, so call this on the list with the preference that should take priority.
	pub fn select(&self, other: &Versions) -> Option<Version> {
		self.0.iter().find(|v| other.contains(v)).copied()
	}
}

impl Decode for Versions {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let count = usize::decode(r)?;

		// Don't trust the count for the allocation.
		let mut vs = Vec::with_capacity(count.min(16));

		for _ in 0..count {
			let v = Version::decode(r)?;
			vs.push(v);
		}

		Ok(Self(vs))
	}
}

impl Encode for Versions {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.0.len().encode(w);

		for v in &self.0 {
			v.encode(w);
		}
	}
}

impl Deref for Versions {
	type Target = Vec<Version>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl From<Vec<Version>> for Versions {
	fn from(vs: Vec<Version>) -> Self {
		Self(vs)
	}
}

impl<const N: usize> From<[Version; N]> for Versions {
	fn from(vs: [Version; N]) -> Self {
		Self(vs.to_vec())
	}
}

impl fmt::Debug for Versions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.0.iter()).finish()
	}
}
