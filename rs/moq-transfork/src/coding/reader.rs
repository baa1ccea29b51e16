use std::{cmp, fmt::Debug, io};

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Error, coding::*};

/// A reader for decoding messages from a stream.
///
/// Bytes are buffered until a whole message can be decoded, so a failed or partial decode never consumes anything.
pub struct Reader<S: AsyncRead + Unpin> {
	stream: S,
	buffer: BytesMut,
}

impl<S: AsyncRead + Unpin> Reader<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream,
			buffer: Default::default(),
		}
	}

	/// Read more data into the buffer, returning false if the stream is finished.
	async fn fill(&mut self) -> Result<bool, Error> {
		let size = self.stream.read_buf(&mut self.buffer).await?;
		Ok(size > 0)
	}

	/// Decode the next message from the stream.
	pub async fn decode<T: Decode + Debug>(&mut self) -> Result<T, Error> {
		loop {
			let mut cursor = io::Cursor::new(&self.buffer);
			match T::decode(&mut cursor) {
				Ok(msg) => {
					self.buffer.advance(cursor.position() as usize);
					return Ok(msg);
				}
				Err(DecodeError::Short) => {
					if !self.fill().await? {
						// Stream closed while we still need more data
						return Err(Error::Decode(DecodeError::Short));
					}
				}
				Err(e) => return Err(Error::Decode(e)),
			}
		}
	}

	/// Decode the next message unless the stream is finished.
	pub async fn decode_maybe<T: Decode + Debug>(&mut self) -> Result<Option<T>, Error> {
		match self.done().await? {
			true => Ok(None),
			false => Ok(Some(self.decode().await?)),
		}
	}

	/// Decode the next message from the stream without consuming it.
	pub async fn decode_peek<T: Decode + Debug>(&mut self) -> Result<T, Error> {
		loop {
			let mut cursor = io::Cursor::new(&self.buffer);
			match T::decode(&mut cursor) {
				Ok(msg) => return Ok(msg),
				Err(DecodeError::Short) => {
					if !self.fill().await? {
						return Err(Error::Decode(DecodeError::Short));
					}
				}
				Err(e) => return Err(Error::Decode(e)),
			}
		}
	}

	/// Returns a non-zero chunk of data, or None if the stream is finished.
	pub async fn read(&mut self, max: usize) -> Result<Option<Bytes>, Error> {
		if self.buffer.is_empty() && !self.fill().await? {
			return Ok(None);
		}

		let size = cmp::min(max, self.buffer.len());
		Ok(Some(self.buffer.split_to(size).freeze()))
	}

	/// Read exactly the given number of bytes from the stream.
	pub async fn read_exact(&mut self, size: usize) -> Result<Bytes, Error> {
		while self.buffer.len() < size {
			if !self.fill().await? {
				return Err(Error::Decode(DecodeError::Short));
			}
		}

		Ok(self.buffer.split_to(size).freeze())
	}

	/// Returns true if the stream is finished and there are no buffered bytes.
	///
	/// This will block until there's either more data or the stream is finished.
	pub async fn done(&mut self) -> Result<bool, Error> {
		if !self.buffer.is_empty() {
			return Ok(false);
		}

		Ok(!self.fill().await?)
	}

	/// Wait until the stream is finished, erroring if there are any additional bytes.
	pub async fn closed(&mut self) -> Result<(), Error> {
		match self.done().await? {
			true => Ok(()),
			false => Err(Error::ProtocolSequencing("unexpected trailing data")),
		}
	}

	pub fn into_inner(self) -> S {
		self.stream
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_decode_across_reads() {
		let (mut tx, rx) = tokio::io::duplex(64);
		let mut reader = Reader::new(rx);

		let task = tokio::spawn(async move {
			use tokio::io::AsyncWriteExt;

			// A 4 byte varint split across two writes.
			tx.write_all(&[0x9d, 0x7f]).await.unwrap();
			tokio::task::yield_now().await;
			tx.write_all(&[0x3e, 0x7d]).await.unwrap();
		});

		let v: u64 = reader.decode().await.unwrap();
		assert_eq!(v, 494_878_333);
		task.await.unwrap();

		assert!(reader.done().await.unwrap());
	}

	#[tokio::test]
	async fn test_truncated() {
		let data: &[u8] = &[0x9d, 0x7f];
		let mut reader = Reader::new(data);

		let err = reader.decode::<u64>().await.unwrap_err();
		assert!(matches!(err, Error::Decode(DecodeError::Short)));
	}

	#[tokio::test]
	async fn test_decode_maybe() {
		let data: &[u8] = &[0x01];
		let mut reader = Reader::new(data);

		assert_eq!(reader.decode_maybe::<u64>().await.unwrap(), Some(1));
		assert_eq!(reader.decode_maybe::<u64>().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_failed_decode_consumes_nothing() {
		// A string claiming 3 bytes followed by invalid utf-8.
		let data: &[u8] = &[0x03, 0xff, 0xfe, 0xfd];
		let mut reader = Reader::new(data);

		assert!(reader.decode::<String>().await.is_err());

		// The same bytes are still there.
		let raw = reader.read_exact(4).await.unwrap();
		assert_eq!(raw.as_ref(), &[0x03, 0xff, 0xfe, 0xfd]);
	}

	#[tokio::test]
	async fn test_peek() {
		let data: &[u8] = &[0x05, 0x06];
		let mut reader = Reader::new(data);

		assert_eq!(reader.decode_peek::<u64>().await.unwrap(), 5);
		assert_eq!(reader.decode::<u64>().await.unwrap(), 5);
		assert_eq!(reader.decode::<u64>().await.unwrap(), 6);
	}
}
