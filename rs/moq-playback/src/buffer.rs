use std::collections::VecDeque;

use crate::{Timed, Timestamp};

/// A queue of items for a single track, ordered by presentation timestamp.
///
/// Items may arrive in any order, but they're released in timestamp order and never behind the watermark:
/// anything at or before the last released timestamp is dropped on arrival.
#[derive(Debug)]
pub struct TrackBuffer<T: Timed> {
	queue: VecDeque<T>,

	// The timestamp of the last released item.
	watermark: Option<Timestamp>,
}

impl<T: Timed> Default for TrackBuffer<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Timed> TrackBuffer<T> {
	pub fn new() -> Self {
		Self {
			queue: VecDeque::new(),
			watermark: None,
		}
	}

	/// Insert an item in timestamp order, returning false if it was dropped for being too old.
	pub fn render(&mut self, item: T) -> bool {
		let timestamp = item.timestamp();

		if self.watermark.is_some_and(|watermark| timestamp <= watermark) {
			tracing::trace!(%timestamp, watermark = ?self.watermark, "dropping old item");
			return false;
		}

		// Fast path: the common case is appending in order.
		if self.queue.back().is_none_or(|last| last.timestamp() <= timestamp) {
			self.queue.push_back(item);
			return true;
		}

		let index = self.queue.partition_point(|queued| queued.timestamp() <= timestamp);
		self.queue.insert(index, item);

		true
	}

	/// Remove the earliest item and advance the watermark to it.
	pub fn next(&mut self) -> Option<T> {
		let item = self.queue.pop_front()?;
		self.watermark = Some(item.timestamp());
		Some(item)
	}

	/// The timestamp of the earliest item, without removing it.
	pub fn peek(&self) -> Option<Timestamp> {
		self.queue.front().map(Timed::timestamp)
	}

	/// The timestamp of the last released item.
	pub fn watermark(&self) -> Option<Timestamp> {
		self.watermark
	}

	/// The timestamps of the earliest and latest queued items.
	pub fn buffered(&self) -> Option<(Timestamp, Timestamp)> {
		let first = self.queue.front()?.timestamp();
		let last = self.queue.back()?.timestamp();
		Some((first, last))
	}

	/// Drop every queued item, keeping the watermark.
	pub fn clear(&mut self) {
		self.queue.clear();
	}

	/// Drop every queued item and forget the watermark, used when seeking.
	pub fn reset(&mut self) {
		self.queue.clear();
		self.watermark = None;
	}

	pub fn len(&self) -> usize {
		self.queue.len()
	}

	pub fn is_empty(&self) -> bool {
		self.queue.is_empty()
	}
}
