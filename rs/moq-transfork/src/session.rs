use tokio::sync::{mpsc, watch};

use crate::{
	ClientConfig, Error, Transport,
	coding::{Stream, Version, Versions},
	message::{Bi, Extensions, Role, SessionClient, SessionInfo, SessionServer},
	subscriber::{Announced, Subscriber},
};

/// A session from the client's point of view, created with [Session::connect].
///
/// The session runs in a background task until it's closed or dropped.
pub struct Session<T: Transport> {
	transport: T,
	version: Version,
	peer: SessionServer,

	subscriber: Subscriber<T>,
	announced: mpsc::UnboundedReceiver<Announced>,

	info: watch::Receiver<Option<SessionInfo>>,
	closed: watch::Receiver<Option<Error>>,

	task: tokio::task::JoinHandle<()>,
}

impl<T: Transport> Session<T> {
	/// Perform the handshake as a client, offering the configured versions.
	pub async fn connect(transport: T, config: &ClientConfig) -> Result<Self, Error> {
		match Self::connect_inner(transport.clone(), config).await {
			Ok(session) => Ok(session),
			Err(err) => {
				tracing::warn!(%err, "failed to connect");
				transport.close(err.to_code(), &err.to_string());
				Err(err)
			}
		}
	}

	async fn connect_inner(transport: T, config: &ClientConfig) -> Result<Self, Error> {
		let (send, recv) = transport.open_bi().await?;
		let mut stream = Stream::new(recv, send);

		let client = SessionClient {
			versions: config.versions.clone().into(),
			role: config.role,
			extensions: Extensions::default(),
		};

		tracing::trace!(?client, "sending client setup");
		stream.writer.encode(&Bi::Session(client.clone())).await?;

		let server: SessionServer = stream.reader.decode().await?;
		tracing::trace!(?server, "received server setup");

		// Never accept a version we didn't offer.
		if !client.versions.contains(&server.version) {
			return Err(Error::Version(client.versions, [server.version].into()));
		}

		let version = server.version;
		tracing::debug!(?version, role = ?server.role, "connected");

		let (subscriber, announced) = Subscriber::new(transport.clone());
		let (info_tx, info_rx) = watch::channel(None);
		let (closed_tx, closed_rx) = watch::channel(None);

		let task = tokio::spawn(run(transport.clone(), stream, subscriber.clone(), info_tx, closed_tx));

		Ok(Self {
			transport,
			version,
			peer: server,
			subscriber,
			announced,
			info: info_rx,
			closed: closed_rx,
			task,
		})
	}

	pub fn version(&self) -> Version {
		self.version
	}

	/// The role the server advertised.
	pub fn peer_role(&self) -> Role {
		self.peer.role
	}

	/// The extensions the server advertised.
	pub fn peer_extensions(&self) -> &Extensions {
		&self.peer.extensions
	}

	/// The most recent bitrate estimate from the server, in bits per second.
	pub fn bitrate(&self) -> Option<u64> {
		self.info.borrow().map(|info| info.bitrate)
	}

	/// A channel that changes whenever the server sends a [SessionInfo].
	pub fn info(&self) -> watch::Receiver<Option<SessionInfo>> {
		self.info.clone()
	}

	pub fn subscriber(&self) -> &Subscriber<T> {
		&self.subscriber
	}

	/// Wait for the next announcement from the server.
	pub async fn announced(&mut self) -> Option<Announced> {
		self.announced.recv().await
	}

	/// Close the session, and every subscription, with the given error.
	pub fn close(self, err: Error) {
		self.task.abort();
		self.subscriber.close(err.clone());
		self.transport.close(err.to_code(), &err.to_string());
	}

	/// Wait until the session is closed, returning the reason.
	pub async fn closed(&self) -> Error {
		let mut closed = self.closed.clone();
		match closed.wait_for(Option::is_some).await {
			Ok(err) => err.clone().unwrap_or(Error::Closed),
			Err(_) => Error::Closed,
		}
	}
}

impl<T: Transport> Drop for Session<T> {
	fn drop(&mut self) {
		self.task.abort();
	}
}

async fn run<T: Transport>(
	transport: T,
	mut stream: Stream<T::RecvStream, T::SendStream>,
	subscriber: Subscriber<T>,
	info: watch::Sender<Option<SessionInfo>>,
	closed: watch::Sender<Option<Error>>,
) {
	let res = tokio::select! {
		res = subscriber.clone().run() => res,
		res = run_info(&mut stream, info) => res,
	};

	let err = match res {
		Ok(()) | Err(Error::Closed) => {
			tracing::info!("session closed");
			Error::Closed
		}
		Err(err) => {
			tracing::warn!(%err, "session error");
			err
		}
	};

	subscriber.close(err.clone());
	transport.close(err.to_code(), &err.to_string());
	closed.send_replace(Some(err));
}

// The server may send any number of SessionInfo messages after the handshake.
async fn run_info<R, W>(stream: &mut Stream<R, W>, info: watch::Sender<Option<SessionInfo>>) -> Result<(), Error>
where
	R: tokio::io::AsyncRead + Unpin,
	W: tokio::io::AsyncWrite + Unpin,
{
	while let Some(msg) = stream.reader.decode_maybe::<SessionInfo>().await? {
		tracing::debug!(message = ?msg, "received session info");
		info.send_replace(Some(msg));
	}

	Ok(())
}

/// A session from the server's point of view, created with [ServerSession::accept].
///
/// Only the handshake is performed; the caller drives the rest of the connection.
pub struct ServerSession<T: Transport> {
	transport: T,
	version: Version,
	client: SessionClient,
	stream: Stream<T::RecvStream, T::SendStream>,
}

impl<T: Transport> ServerSession<T> {
	/// Perform the handshake as a server, picking the client's most preferred version that we support.
	pub async fn accept(transport: T, supported: &Versions, role: Role) -> Result<Self, Error> {
		match Self::accept_inner(transport.clone(), supported, role).await {
			Ok(session) => Ok(session),
			Err(err) => {
				tracing::warn!(%err, "failed to accept");
				transport.close(err.to_code(), &err.to_string());
				Err(err)
			}
		}
	}

	async fn accept_inner(transport: T, supported: &Versions, role: Role) -> Result<Self, Error> {
		let (send, recv) = transport.accept_bi().await?;
		let mut stream = Stream::new(recv, send);

		let client = match stream.reader.decode::<Bi>().await? {
			Bi::Session(client) => client,
			_ => return Err(Error::ProtocolSequencing("expected session stream")),
		};

		tracing::trace!(?client, "received client setup");

		let version = client
			.versions
			.select(supported)
			.ok_or_else(|| Error::Version(client.versions.clone(), supported.clone()))?;

		let server = SessionServer {
			version,
			role,
			extensions: Extensions::default(),
		};

		tracing::trace!(?server, "sending server setup");
		stream.writer.encode(&server).await?;

		tracing::debug!(?version, role = ?client.role, "accepted");

		Ok(Self {
			transport,
			version,
			client,
			stream,
		})
	}

	pub fn version(&self) -> Version {
		self.version
	}

	/// The client's role.
	pub fn peer_role(&self) -> Role {
		self.client.role
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Send an updated bitrate estimate to the client.
	pub async fn send_info(&mut self, info: SessionInfo) -> Result<(), Error> {
		tracing::debug!(message = ?info, "sending session info");
		self.stream.writer.encode(&info).await
	}

	/// Close the session stream, which ends the session.
	pub async fn finish(&mut self) -> Result<(), Error> {
		self.stream.writer.finish().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		message::Announce,
		transport::memory::{self, Memory},
	};

	fn config(versions: &[Version]) -> ClientConfig {
		ClientConfig {
			versions: versions.to_vec(),
			role: Role::Subscriber,
		}
	}

	#[tokio::test]
	async fn test_handshake() {
		let (client, server) = memory::pair();

		let accept = tokio::spawn(async move {
			let supported = Versions::from([Version::FORK_00]);
			ServerSession::accept(server, &supported, Role::Publisher).await
		});

		let session = Session::connect(client, &config(&[Version::DRAFT_03, Version::FORK_00]))
			.await
			.unwrap();
		assert_eq!(session.version(), Version::FORK_00);
		assert_eq!(session.peer_role(), Role::Publisher);
		assert_eq!(session.bitrate(), None);

		let mut server = accept.await.unwrap().unwrap();
		assert_eq!(server.version(), Version::FORK_00);
		assert_eq!(server.peer_role(), Role::Subscriber);

		server.send_info(SessionInfo { bitrate: 1_000_000 }).await.unwrap();

		let mut info = session.info();
		info.wait_for(Option::is_some).await.unwrap();
		assert_eq!(session.bitrate(), Some(1_000_000));

		// Closing the session stream ends the session.
		server.finish().await.unwrap();
		assert!(matches!(session.closed().await, Error::Closed));
	}

	#[tokio::test]
	async fn test_client_preference() {
		let (client, server) = memory::pair();

		let accept = tokio::spawn(async move {
			let supported = Versions::from([Version::DRAFT_02, Version::DRAFT_03]);
			ServerSession::accept(server, &supported, Role::Both).await
		});

		let session = Session::connect(client, &config(&[Version::DRAFT_03, Version::DRAFT_02]))
			.await
			.unwrap();
		assert_eq!(session.version(), Version::DRAFT_03);

		accept.await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn test_no_common_version() {
		let (client, server) = memory::pair();
		let server_closed = server.closed.clone();

		let accept = tokio::spawn(async move {
			let supported = Versions::from([Version::FORK_00]);
			ServerSession::accept(server, &supported, Role::Publisher).await
		});

		let res = Session::connect(client, &config(&[Version::DRAFT_00])).await;
		assert!(res.is_err());

		let err = accept.await.unwrap().err().unwrap();
		assert!(matches!(err, Error::Version(..)));

		let code = server_closed.lock().unwrap().as_ref().map(|(code, _)| *code);
		assert_eq!(code, Some(err.to_code()));
	}

	#[tokio::test]
	async fn test_unoffered_version() {
		let (client, server) = memory::pair();

		// A misbehaving server that picks a version we never offered.
		let server = tokio::spawn(async move {
			let (send, recv) = server.accept_bi().await.unwrap();
			let mut stream = Stream::new(recv, send);
			let _: Bi = stream.reader.decode().await.unwrap();

			let reply = SessionServer {
				version: Version::FORK_00,
				role: Role::Publisher,
				extensions: Extensions::default(),
			};
			stream.writer.encode(&reply).await.unwrap();
			stream
		});

		let res = Session::connect(client, &config(&[Version::DRAFT_03])).await;
		assert!(matches!(res, Err(Error::Version(..))));

		server.await.unwrap();
	}

	#[tokio::test]
	async fn test_session_must_be_first() {
		let (client, server): (Memory, Memory) = memory::pair();

		let (send, recv) = client.open_bi().await.unwrap();
		let mut stream = Stream::new(recv, send);
		stream
			.writer
			.encode(&Bi::Announce(Announce {
				broadcast: "demo".to_string(),
			}))
			.await
			.unwrap();

		let res = ServerSession::accept(server, &Versions::from([Version::FORK_00]), Role::Publisher).await;
		assert!(matches!(res, Err(Error::ProtocolSequencing(_))));
	}
}
