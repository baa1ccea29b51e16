use std::fmt::Debug;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{Error, coding::*};

/// A writer for encoding messages to a stream.
pub struct Writer<S: AsyncWrite + Unpin> {
	stream: S,
	buffer: bytes::BytesMut,
}

impl<S: AsyncWrite + Unpin> Writer<S> {
	/// Create a new writer for the given stream.
	pub fn new(stream: S) -> Self {
		Self {
			stream,
			buffer: Default::default(),
		}
	}

	/// Encode the given message to the stream.
	pub async fn encode<T: Encode + Debug>(&mut self, msg: &T) -> Result<(), Error> {
		self.buffer.clear();
		msg.encode(&mut self.buffer);

		tracing::trace!(hex = %hex::encode(&self.buffer), "encoded message");

		self.stream.write_all_buf(&mut self.buffer).await?;
		self.stream.flush().await?;

		Ok(())
	}

	/// Write the entire [bytes::Buf] to the stream.
	pub async fn write_all<B: bytes::Buf>(&mut self, buf: &mut B) -> Result<(), Error> {
		self.stream.write_all_buf(buf).await?;
		Ok(())
	}

	/// Mark the stream as finished.
	pub async fn finish(&mut self) -> Result<(), Error> {
		self.stream.shutdown().await?;
		Ok(())
	}

	pub fn into_inner(self) -> S {
		self.stream
	}
}
