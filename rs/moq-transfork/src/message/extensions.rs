use bytes::Bytes;

use crate::coding::*;

const MAX_EXTENSIONS: usize = 64;

/// A set of opaque parameters keyed by a u62 id.
///
/// Keys are unique and encoded in the order they were first inserted.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Extensions {
	entries: Vec<(u64, Bytes)>,
}

impl Extensions {
	/// Insert or replace the value for `id`, returning the previous value.
	///
	/// Replacing a value keeps its original position.
	pub fn set(&mut self, id: u64, value: impl Into<Bytes>) -> Option<Bytes> {
		let value = value.into();

		match self.entries.iter_mut().find(|(k, _)| *k == id) {
			Some((_, existing)) => Some(std::mem::replace(existing, value)),
			None => {
				self.entries.push((id, value));
				None
			}
		}
	}

	pub fn get(&self, id: u64) -> Option<&Bytes> {
		self.entries.iter().find(|(k, _)| *k == id).map(|(_, v)| v)
	}

	pub fn remove(&mut self, id: u64) -> Option<Bytes> {
		let index = self.entries.iter().position(|(k, _)| *k == id)?;
		Some(self.entries.remove(index).1)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (u64, &Bytes)> {
		self.entries.iter().map(|(k, v)| (*k, v))
	}
}

impl Decode for Extensions {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let count = usize::decode(r)?;
		if count > MAX_EXTENSIONS {
			return Err(DecodeError::TooMany);
		}

		let mut entries: Vec<(u64, Bytes)> = Vec::with_capacity(count);

		for _ in 0..count {
			let id = u64::decode(r)?;
			let value = Bytes::decode(r)?;

			if entries.iter().any(|(k, _)| *k == id) {
				return Err(DecodeError::DuplicateParameter(id));
			}

			entries.push((id, value));
		}

		Ok(Self { entries })
	}
}

impl Encode for Extensions {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.entries.len().encode(w);

		for (id, value) in &self.entries {
			id.encode(w);
			value.encode(w);
		}
	}
}

impl std::fmt::Debug for Extensions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_map()
			.entries(self.entries.iter().map(|(k, v)| (k, hex::encode(v))))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_order_preserved() {
		let mut ext = Extensions::default();
		ext.set(7, vec![7u8]);
		ext.set(3, vec![3u8]);
		ext.set(1000, vec![1u8, 2, 3]);

		let mut buf = ext.encode_bytes();
		let decoded = Extensions::decode(&mut buf).unwrap();

		assert_eq!(decoded, ext);
		let ids: Vec<u64> = decoded.iter().map(|(k, _)| k).collect();
		assert_eq!(ids, vec![7, 3, 1000]);
	}

	#[test]
	fn test_replace_keeps_position() {
		let mut ext = Extensions::default();
		ext.set(1, vec![1u8]);
		ext.set(2, vec![2u8]);

		let old = ext.set(1, vec![9u8]);
		assert_eq!(old.as_deref(), Some(&[1u8][..]));

		let ids: Vec<u64> = ext.iter().map(|(k, _)| k).collect();
		assert_eq!(ids, vec![1, 2]);
		assert_eq!(ext.get(1).map(|v| v.as_ref()), Some(&[9u8][..]));
	}

	#[test]
	fn test_remove() {
		let mut ext = Extensions::default();
		ext.set(1, vec![1u8]);
		assert_eq!(ext.remove(1).as_deref(), Some(&[1u8][..]));
		assert!(ext.remove(1).is_none());
		assert!(ext.is_empty());
	}

	#[test]
	fn test_duplicate() {
		#[rustfmt::skip]
		let data = vec![
			0x02, // count
			0x05, 0x01, 0xaa, // id=5, len=1
			0x05, 0x01, 0xbb, // id=5 again
		];

		let mut buf = bytes::Bytes::from(data);
		assert_eq!(Extensions::decode(&mut buf), Err(DecodeError::DuplicateParameter(5)));
	}

	#[test]
	fn test_too_many() {
		let mut buf = bytes::Bytes::from_static(&[0x40, 0x41]);
		assert_eq!(Extensions::decode(&mut buf), Err(DecodeError::TooMany));
	}

	#[test]
	fn test_truncated_value() {
		let mut buf = bytes::Bytes::from_static(&[0x01, 0x05, 0x03, 0xaa]);
		assert_eq!(Extensions::decode(&mut buf), Err(DecodeError::Short));
	}
}
