use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::{
	io::AsyncRead,
	sync::{Notify, mpsc},
	time::{Duration, Instant},
};

use crate::{
	Error,
	coding::Reader,
	message::{Frame, Group, GroupDrop, Info, SubscribeUpdate},
	subscriber::GroupQueue,
};

/// A group received for a subscription, yielding its frames in order.
pub struct GroupReader<R: AsyncRead + Unpin> {
	pub info: Group,
	reader: Reader<R>,
}

impl<R: AsyncRead + Unpin> GroupReader<R> {
	pub fn new(info: Group, reader: Reader<R>) -> Self {
		Self { info, reader }
	}

	pub fn sequence(&self) -> u64 {
		self.info.sequence
	}

	/// Read the next frame payload, or None when the group is finished.
	pub async fn read_frame(&mut self) -> Result<Option<Bytes>, Error> {
		let frame = self.reader.decode_maybe::<Frame>().await?;
		if let Some(frame) = &frame {
			tracing::trace!(group = self.info.sequence, size = frame.payload.len(), "read frame");
		}

		Ok(frame.map(|frame| frame.payload))
	}
}

impl<R: AsyncRead + Unpin> std::fmt::Debug for GroupReader<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GroupReader").field("info", &self.info).finish()
	}
}

#[derive(Clone, Debug)]
pub(super) enum Status {
	Pending,
	Active,
	Done(Result<(), Error>),
}

pub(super) struct SubscriptionState<R: AsyncRead + Unpin> {
	pub update: SubscribeUpdate,
	pub info: Option<Info>,
	pub status: Status,
	pub queue: GroupQueue<GroupReader<R>>,

	// When the most recent group arrived, used for expiration.
	pub last: Instant,

	// The error from a drop that reached the end, reported once every earlier group is accounted for.
	pub dropped_end: Option<u64>,

	pub notify: Arc<Notify>,
}

impl<R: AsyncRead + Unpin> SubscriptionState<R> {
	pub fn new(update: SubscribeUpdate) -> Self {
		Self {
			queue: GroupQueue::new(update.order),
			update,
			info: None,
			status: Status::Pending,
			last: Instant::now(),
			dropped_end: None,
			notify: Default::default(),
		}
	}

	pub fn is_done(&self) -> bool {
		matches!(self.status, Status::Done(_))
	}

	/// The publisher accepted the subscription.
	pub fn recv_info(&mut self, info: Info) {
		if self.is_done() {
			return;
		}

		self.info = Some(info);
		self.status = Status::Active;
		self.notify.notify_waiters();
	}

	pub fn recv_update(&mut self, update: SubscribeUpdate) {
		self.queue.set_order(update.order);

		// A drop only finishes the subscription if it still reaches the end.
		let reaches_end = update
			.end
			.is_some_and(|end| end > 0 && self.queue.is_dropped(end - 1));
		if !reaches_end {
			self.dropped_end = None;
		}

		self.update = update;
		self.notify.notify_waiters();
		self.check_complete();
	}

	pub fn recv_group(&mut self, group: GroupReader<R>) {
		let sequence = group.info.sequence;

		if self.is_done() {
			tracing::trace!(sequence, "ignoring group for finished subscription");
			return;
		}

		if !self.update.contains(sequence) {
			tracing::trace!(sequence, start = ?self.update.start, end = ?self.update.end, "ignoring group outside range");
			return;
		}

		if self.queue.is_dropped(sequence) {
			tracing::warn!(sequence, "ignoring late group that was already dropped");
			return;
		}

		// A group before the Info is an implicit acceptance.
		if matches!(self.status, Status::Pending) {
			self.status = Status::Active;
		}

		self.last = Instant::now();

		match self.queue.push(sequence, group) {
			Ok(()) => self.notify.notify_waiters(),
			Err(_) => tracing::trace!(sequence, "ignoring stale group"),
		}

		self.check_complete();
	}

	/// Returns true if the subscription is finished as a result of the drop.
	pub fn recv_drop(&mut self, drop: GroupDrop) -> bool {
		let discarded = self.queue.drop_range(&drop);
		tracing::debug!(?drop, discarded, "dropped groups");

		if let Some(end) = self.update.end {
			if drop.sequence < end && drop.end() >= end {
				self.dropped_end = Some(drop.error);
			}
		}

		self.check_complete()
	}

	/// Finish with the drop error once a drop reached the end and every earlier group arrived or was dropped.
	///
	/// Returns true if the subscription was finished.
	pub fn check_complete(&mut self) -> bool {
		if self.is_done() {
			return false;
		}

		let (Some(error), Some(end)) = (self.dropped_end, self.update.end) else {
			return false;
		};

		// Without an explicit start, the publisher begins at its latest group.
		let start = self
			.update
			.start
			.or_else(|| self.info.as_ref().and_then(|info| info.latest))
			.unwrap_or(0);

		if !self.queue.is_complete(start..end) {
			tracing::debug!(start, end, "waiting for groups before the dropped end");
			return false;
		}

		self.finish(Err(Error::Dropped(error)));
		true
	}

	/// The publisher closed the subscription stream.
	pub fn recv_end(&mut self) {
		let res = match self.dropped_end {
			Some(error) => Err(Error::Dropped(error)),
			None => Ok(()),
		};

		self.finish(res);
	}

	/// Returns the time the subscription expires if no more groups arrive.
	pub fn deadline(&self) -> Option<Instant> {
		if self.update.expires == 0 || self.is_done() {
			return None;
		}

		Some(self.last + Duration::from_millis(self.update.expires))
	}

	pub fn is_expired(&self, now: Instant) -> bool {
		self.deadline().is_some_and(|deadline| deadline <= now)
	}

	/// Stop accepting groups, but let the consumer read any that are pending.
	pub fn finish(&mut self, res: Result<(), Error>) {
		if self.is_done() {
			return;
		}

		self.status = Status::Done(res);
		self.notify.notify_waiters();
	}

	/// Stop accepting groups and discard any that are pending.
	pub fn close(&mut self, err: Error) {
		if self.is_done() {
			return;
		}

		self.queue.clear();
		self.status = Status::Done(Err(err));
		self.notify.notify_waiters();
	}
}

/// A handle to an active subscription.
///
/// Dropping the handle unsubscribes.
pub struct Subscription<R: AsyncRead + Unpin> {
	id: u64,
	broadcast: String,
	track: String,

	state: Arc<Mutex<SubscriptionState<R>>>,
	updates: mpsc::UnboundedSender<SubscribeUpdate>,
}

impl<R: AsyncRead + Unpin> Subscription<R> {
	pub(super) fn new(
		id: u64,
		broadcast: String,
		track: String,
		state: Arc<Mutex<SubscriptionState<R>>>,
		updates: mpsc::UnboundedSender<SubscribeUpdate>,
	) -> Self {
		Self {
			id,
			broadcast,
			track,
			state,
			updates,
		}
	}

	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn broadcast(&self) -> &str {
		&self.broadcast
	}

	pub fn track(&self) -> &str {
		&self.track
	}

	/// The current priority, order, expiration, and range.
	pub fn current(&self) -> SubscribeUpdate {
		self.state.lock().unwrap().update.clone()
	}

	/// Wait until the publisher accepts the subscription.
	///
	/// Returns the [Info] if it was explicitly accepted, or None if a group arrived first.
	pub async fn accepted(&self) -> Result<Option<Info>, Error> {
		loop {
			let notified = {
				let state = self.state.lock().unwrap();
				match &state.status {
					Status::Pending => {}
					Status::Active => return Ok(state.info.clone()),
					Status::Done(Ok(())) if state.info.is_some() => return Ok(state.info.clone()),
					Status::Done(Ok(())) => return Err(Error::Closed),
					Status::Done(Err(err)) => return Err(err.clone()),
				}

				state.notify.clone().notified_owned()
			};

			notified.await;
		}
	}

	/// Return the next group according to the subscription's order.
	///
	/// Returns None when the subscription finished and every pending group was returned.
	pub async fn next_group(&mut self) -> Result<Option<GroupReader<R>>, Error> {
		loop {
			let notified = {
				let mut state = self.state.lock().unwrap();
				if let Some((_, group)) = state.queue.pop() {
					state.check_complete();
					return Ok(Some(group));
				}

				if let Status::Done(res) = &state.status {
					return res.clone().map(|_| None);
				}

				state.notify.clone().notified_owned()
			};

			notified.await;
		}
	}

	/// Change the priority, order, expiration, or range of the subscription.
	pub fn update(&mut self, update: SubscribeUpdate) -> Result<(), Error> {
		self.updates.send(update).map_err(|_| Error::Closed)
	}

	/// Wait until the subscription is finished, returning the reason.
	pub async fn closed(&self) -> Result<(), Error> {
		loop {
			let notified = {
				let state = self.state.lock().unwrap();
				if let Status::Done(res) = &state.status {
					return res.clone();
				}

				state.notify.clone().notified_owned()
			};

			notified.await;
		}
	}
}

impl<R: AsyncRead + Unpin> std::fmt::Debug for Subscription<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("broadcast", &self.broadcast)
			.field("track", &self.track)
			.finish()
	}
}
