use tokio::io::{AsyncRead, AsyncWrite};

use crate::coding::{Reader, Writer};

/// A [Writer] and [Reader] pair for a single bidirectional stream.
pub struct Stream<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> {
	pub writer: Writer<W>,
	pub reader: Reader<R>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Stream<R, W> {
	pub fn new(reader: R, writer: W) -> Self {
		Self {
			writer: Writer::new(writer),
			reader: Reader::new(reader),
		}
	}
}

impl<T: AsyncRead + AsyncWrite> Stream<tokio::io::ReadHalf<T>, tokio::io::WriteHalf<T>> {
	/// Split a duplex stream into a reader and writer.
	pub fn split(stream: T) -> Self {
		let (reader, writer) = tokio::io::split(stream);
		Self::new(reader, writer)
	}
}
