//! The subscriber half of a session: announcements, subscriptions, fetches, and the groups they produce.
mod queue;
mod subscription;

pub use queue::*;
pub use subscription::*;

use std::{
	collections::{HashMap, hash_map::Entry},
	sync::{Arc, Mutex},
};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{
	Error, Transport,
	coding::{Reader, Stream},
	message::{self, Bi, Uni},
};

/// An announcement received from the publisher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Announced {
	/// The broadcast is now available.
	Active(String),

	/// The broadcast is no longer available.
	Ended(String),
}

type SubscriptionRef<T> = Arc<Mutex<SubscriptionState<<T as Transport>::RecvStream>>>;

struct State<T: Transport> {
	// The number of open announce streams for each broadcast.
	announced: HashMap<String, usize>,

	subscribes: HashMap<u64, SubscriptionRef<T>>,
	next_id: u64,
}

impl<T: Transport> Default for State<T> {
	fn default() -> Self {
		Self {
			announced: HashMap::new(),
			subscribes: HashMap::new(),
			next_id: 0,
		}
	}
}

#[derive(Clone)]
pub struct Subscriber<T: Transport> {
	transport: T,
	state: Arc<Mutex<State<T>>>,
	announced: mpsc::UnboundedSender<Announced>,
}

impl<T: Transport> Subscriber<T> {
	pub(crate) fn new(transport: T) -> (Self, mpsc::UnboundedReceiver<Announced>) {
		let (tx, rx) = mpsc::unbounded_channel();

		let this = Self {
			transport,
			state: Default::default(),
			announced: tx,
		};

		(this, rx)
	}

	/// Returns true if the publisher currently announces the broadcast.
	pub fn is_announced(&self, broadcast: &str) -> bool {
		self.state.lock().unwrap().announced.contains_key(broadcast)
	}

	/// Subscribe to a track, choosing the next unused subscription id.
	pub fn subscribe(
		&self,
		broadcast: impl Into<String>,
		track: impl Into<String>,
		update: message::SubscribeUpdate,
	) -> Result<Subscription<T::RecvStream>, Error> {
		let id = {
			let mut state = self.state.lock().unwrap();
			while state.subscribes.contains_key(&state.next_id) {
				state.next_id += 1;
			}

			let id = state.next_id;
			state.next_id += 1;
			id
		};

		self.start_subscribe(
			message::Subscribe {
				id,
				broadcast: broadcast.into(),
				track: track.into(),
				update,
			},
			false,
		)
	}

	/// Subscribe with an explicit id, which must not belong to an open subscription.
	pub fn subscribe_with(&self, msg: message::Subscribe) -> Result<Subscription<T::RecvStream>, Error> {
		self.start_subscribe(msg, false)
	}

	/// Subscribe with best-effort delivery: lost groups are not retransmitted.
	pub fn datagrams(&self, msg: message::Subscribe) -> Result<Subscription<T::RecvStream>, Error> {
		self.start_subscribe(msg, true)
	}

	fn start_subscribe(&self, msg: message::Subscribe, datagrams: bool) -> Result<Subscription<T::RecvStream>, Error> {
		let id = msg.id;
		let subscription = Arc::new(Mutex::new(SubscriptionState::new(msg.update.clone())));

		match self.state.lock().unwrap().subscribes.entry(id) {
			Entry::Occupied(_) => return Err(Error::DuplicateSubscription(id)),
			Entry::Vacant(entry) => entry.insert(subscription.clone()),
		};

		let (tx, rx) = mpsc::unbounded_channel();
		let handle = Subscription::new(id, msg.broadcast.clone(), msg.track.clone(), subscription.clone(), tx);

		tracing::info!(id, broadcast = %msg.broadcast, track = %msg.track, datagrams, "subscribe started");

		let this = self.clone();
		tokio::spawn(async move {
			let res = this.run_subscribe(msg, datagrams, rx, &subscription).await;

			match &res {
				Err(Error::Cancel) => tracing::info!(id, "subscribe cancelled"),
				Err(err) => tracing::warn!(id, %err, "subscribe error"),
				Ok(()) => tracing::info!(id, "subscribe complete"),
			}

			match res {
				Ok(()) => subscription.lock().unwrap().finish(Ok(())),
				Err(err) => subscription.lock().unwrap().close(err),
			}

			let mut state = this.state.lock().unwrap();
			if state
				.subscribes
				.get(&id)
				.is_some_and(|existing| Arc::ptr_eq(existing, &subscription))
			{
				state.subscribes.remove(&id);
			}
		});

		Ok(handle)
	}

	async fn run_subscribe(
		&self,
		msg: message::Subscribe,
		datagrams: bool,
		mut updates: mpsc::UnboundedReceiver<message::SubscribeUpdate>,
		subscription: &SubscriptionRef<T>,
	) -> Result<(), Error> {
		let (send, recv) = self.transport.open_bi().await?;
		let mut stream = Stream::new(recv, send);

		let msg = match datagrams {
			true => Bi::Datagrams(message::Datagrams(msg)),
			false => Bi::Subscribe(msg),
		};

		tracing::debug!(message = ?msg, "sending subscribe");
		stream.writer.encode(&msg).await?;

		let mut accepted = false;

		loop {
			let deadline = subscription.lock().unwrap().deadline();
			let expired = async move {
				match deadline {
					Some(deadline) => tokio::time::sleep_until(deadline).await,
					None => std::future::pending().await,
				}
			};

			tokio::select! {
				reply = recv_reply(&mut stream.reader, accepted) => match reply? {
					Reply::Info(info) => {
						tracing::debug!(?info, "subscribe accepted");
						accepted = true;
						subscription.lock().unwrap().recv_info(info);
					}
					Reply::Drop(drop) => {
						if subscription.lock().unwrap().recv_drop(drop) {
							break;
						}
					}
					Reply::End => {
						subscription.lock().unwrap().recv_end();
						break;
					}
				},
				update = updates.recv() => match update {
					Some(update) => {
						tracing::debug!(message = ?update, "sending subscribe update");
						stream.writer.encode(&update).await?;
						subscription.lock().unwrap().recv_update(update);
					}
					None => return Err(Error::Cancel),
				},
				_ = expired => {
					if subscription.lock().unwrap().is_expired(tokio::time::Instant::now()) {
						return Err(Error::Expired);
					}
				}
			}
		}

		stream.writer.finish().await.ok();

		Ok(())
	}

	/// Fetch a single group, returning once the group header arrives.
	pub async fn fetch(&self, msg: message::Fetch) -> Result<Fetched<T>, Error> {
		let (send, recv) = self.transport.open_bi().await?;
		let mut stream = Stream::new(recv, send);

		tracing::debug!(message = ?msg, "sending fetch");
		stream.writer.encode(&Bi::Fetch(msg)).await?;

		let group: message::Group = stream.reader.decode().await?;
		tracing::debug!(?group, "fetch started");

		Ok(Fetched { group, stream })
	}

	/// Ask the publisher about a track without subscribing.
	pub async fn info(&self, broadcast: impl Into<String>, track: impl Into<String>) -> Result<message::Info, Error> {
		let (send, recv) = self.transport.open_bi().await?;
		let mut stream = Stream::new(recv, send);

		let msg = message::InfoRequest {
			broadcast: broadcast.into(),
			track: track.into(),
		};

		tracing::debug!(message = ?msg, "sending info request");
		stream.writer.encode(&Bi::Info(msg)).await?;

		let info: message::Info = stream.reader.decode().await?;
		tracing::debug!(?info, "received info");

		stream.writer.finish().await?;

		Ok(info)
	}

	/// Accept streams from the publisher until the connection closes.
	pub(crate) async fn run(self) -> Result<(), Error> {
		loop {
			tokio::select! {
				res = self.transport.accept_bi() => {
					let (send, recv) = res?;
					let this = self.clone();

					tokio::spawn(async move {
						if let Err(err) = this.run_bi(Stream::new(recv, send)).await {
							tracing::debug!(%err, "error running bi stream");
						}
					});
				}
				res = self.transport.accept_uni() => {
					let recv = res?;
					let this = self.clone();

					tokio::spawn(async move {
						if let Err(err) = this.run_uni(Reader::new(recv)).await {
							tracing::debug!(%err, "error running uni stream");
						}
					});
				}
			}
		}
	}

	async fn run_bi(&self, mut stream: Stream<T::RecvStream, T::SendStream>) -> Result<(), Error> {
		let msg: Bi = stream.reader.decode().await?;
		tracing::debug!(message = ?msg, "received bi stream");

		match msg {
			Bi::Announce(announce) => self.run_announce(announce, stream).await,
			Bi::Session(_) => Err(Error::ProtocolSequencing("session already established")),
			_ => Err(Error::ProtocolSequencing("not a publisher")),
		}
	}

	async fn run_announce(
		&self,
		msg: message::Announce,
		mut stream: Stream<T::RecvStream, T::SendStream>,
	) -> Result<(), Error> {
		self.start_announce(&msg.broadcast);

		let res = async {
			stream.writer.encode(&message::AnnounceOk).await?;

			// The broadcast stays announced until the stream is closed.
			stream.reader.closed().await
		}
		.await;

		self.stop_announce(&msg.broadcast);

		res
	}

	fn start_announce(&self, broadcast: &str) {
		let mut state = self.state.lock().unwrap();

		let count = state.announced.entry(broadcast.to_string()).or_default();
		*count += 1;

		if *count == 1 {
			tracing::info!(%broadcast, "announced");
			self.announced.send(Announced::Active(broadcast.to_string())).ok();
		}
	}

	fn stop_announce(&self, broadcast: &str) {
		let mut state = self.state.lock().unwrap();

		if let Entry::Occupied(mut entry) = state.announced.entry(broadcast.to_string()) {
			*entry.get_mut() -= 1;

			if *entry.get() == 0 {
				entry.remove();
				tracing::info!(%broadcast, "unannounced");
				self.announced.send(Announced::Ended(broadcast.to_string())).ok();
			}
		}
	}

	async fn run_uni(&self, mut reader: Reader<T::RecvStream>) -> Result<(), Error> {
		match reader.decode().await? {
			Uni::Group(group) => self.recv_group(group, reader),
		}
	}

	/// Route a group to its subscription.
	pub fn recv_group(&self, group: message::Group, reader: Reader<T::RecvStream>) -> Result<(), Error> {
		tracing::trace!(?group, "received group");

		let subscription = self
			.state
			.lock()
			.unwrap()
			.subscribes
			.get(&group.subscribe)
			.cloned()
			.ok_or(Error::SubscriptionNotFound(group.subscribe))?;

		subscription.lock().unwrap().recv_group(GroupReader::new(group, reader));

		Ok(())
	}

	/// Close every open subscription.
	pub(crate) fn close(&self, err: Error) {
		let subscribes: Vec<_> = self.state.lock().unwrap().subscribes.drain().collect();

		for (_, subscription) in subscribes {
			subscription.lock().unwrap().close(err.clone());
		}
	}
}

enum Reply {
	Info(message::Info),
	Drop(message::GroupDrop),
	End,
}

// The first reply must be the Info, then any number of GroupDrops.
async fn recv_reply<R: tokio::io::AsyncRead + Unpin>(reader: &mut Reader<R>, accepted: bool) -> Result<Reply, Error> {
	if !accepted {
		return Ok(Reply::Info(reader.decode().await?));
	}

	Ok(match reader.decode_maybe().await? {
		Some(drop) => Reply::Drop(drop),
		None => Reply::End,
	})
}

/// The response to a [message::Fetch]: a single group followed by its frames.
pub struct Fetched<T: Transport> {
	pub group: message::Group,
	stream: Stream<T::RecvStream, T::SendStream>,
}

impl<T: Transport> Fetched<T> {
	/// Read the next frame payload, or None when the group is finished.
	pub async fn read_frame(&mut self) -> Result<Option<Bytes>, Error> {
		let frame = self.stream.reader.decode_maybe::<message::Frame>().await?;
		Ok(frame.map(|frame| frame.payload))
	}

	/// Change the priority of the fetch.
	pub async fn update(&mut self, update: message::FetchUpdate) -> Result<(), Error> {
		tracing::debug!(message = ?update, "sending fetch update");
		self.stream.writer.encode(&update).await
	}
}
