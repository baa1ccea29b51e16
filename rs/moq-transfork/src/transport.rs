use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::Error;

/// The connection a [crate::Session] runs over, such as a QUIC or WebTransport session.
///
/// Cloning must return a handle to the same connection.
pub trait Transport: Clone + Send + Sync + 'static {
	type SendStream: AsyncWrite + Unpin + Send + 'static;
	type RecvStream: AsyncRead + Unpin + Send + 'static;

	/// Open a new bidirectional stream.
	fn open_bi(&self) -> impl Future<Output = Result<(Self::SendStream, Self::RecvStream), Error>> + Send;

	/// Accept the next bidirectional stream opened by the peer.
	fn accept_bi(&self) -> impl Future<Output = Result<(Self::SendStream, Self::RecvStream), Error>> + Send;

	/// Open a new unidirectional stream.
	fn open_uni(&self) -> impl Future<Output = Result<Self::SendStream, Error>> + Send;

	/// Accept the next unidirectional stream opened by the peer.
	fn accept_uni(&self) -> impl Future<Output = Result<Self::RecvStream, Error>> + Send;

	/// Close the connection with an error code and reason.
	fn close(&self, code: u32, reason: &str);
}
