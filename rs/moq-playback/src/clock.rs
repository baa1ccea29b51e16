use std::time::Duration;

use tokio::time::Instant;

use crate::Timestamp;

/// Maps presentation timestamps to wall clock time.
///
/// The first timestamp synced becomes the reference point, rendered `latency` after it was seen.
#[derive(Clone, Debug)]
pub struct Clock {
	latency: Duration,
	reference: Option<(Timestamp, Instant)>,
}

impl Clock {
	pub fn new(latency: Duration) -> Self {
		Self {
			latency,
			reference: None,
		}
	}

	pub fn latency(&self) -> Duration {
		self.latency
	}

	/// Return the wall clock time for the timestamp, using it as the reference if there's none yet.
	pub fn sync(&mut self, timestamp: Timestamp, now: Instant) -> Instant {
		let (reference, wall) = *self.reference.get_or_insert((timestamp, now + self.latency));
		self.wall(reference, wall, timestamp)
	}

	/// Return the wall clock time for the timestamp, or None if there's no reference yet.
	pub fn get(&self, timestamp: Timestamp) -> Option<Instant> {
		let (reference, wall) = self.reference?;
		Some(self.wall(reference, wall, timestamp))
	}

	fn wall(&self, reference: Timestamp, wall: Instant, timestamp: Timestamp) -> Instant {
		match timestamp >= reference {
			true => wall + (timestamp - reference),
			false => wall.checked_sub(reference - timestamp).unwrap_or(wall),
		}
	}

	/// The presentation timestamp that should be rendered at `now`.
	pub fn now(&self, now: Instant) -> Option<Timestamp> {
		let (reference, wall) = self.reference?;

		Some(match now >= wall {
			true => reference + (now - wall),
			false => reference.saturating_sub(Timestamp::try_from(wall - now).unwrap_or(Timestamp::MAX)),
		})
	}

	/// Returns true if the timestamp should have been rendered by `now`.
	pub fn is_due(&self, timestamp: Timestamp, now: Instant) -> bool {
		self.get(timestamp).is_some_and(|wall| wall <= now)
	}

	/// Forget the reference point, used when seeking.
	pub fn reset(&mut self) {
		self.reference = None;
	}
}
