use std::{
	collections::BTreeMap,
	sync::{Arc, Mutex},
};

use tokio::sync::oneshot;

use crate::{Error, Timestamp};

/// The playback state of a single track.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackInfo {
	/// The timestamp of the last rendered frame.
	pub rendered: Option<Timestamp>,

	/// The earliest and latest decoded frames waiting to be rendered.
	pub buffered: Option<(Timestamp, Timestamp)>,
}

/// A snapshot of the playback state, tagged with an increasing epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaybackInfo {
	pub epoch: u64,
	pub tracks: BTreeMap<String, TrackInfo>,
}

#[derive(Default)]
struct State {
	latest: Option<PlaybackInfo>,

	// Consumers waiting for a snapshot with at least this epoch.
	waiting: Vec<(u64, oneshot::Sender<PlaybackInfo>)>,
}

/// Publishes [PlaybackInfo] snapshots and lets consumers wait for one that is fresh enough.
///
/// Cloning returns a handle to the same state.
#[derive(Clone, Default)]
pub struct InfoWatch {
	state: Arc<Mutex<State>>,
}

impl InfoWatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Update a track's state, bumping the epoch and resolving any satisfied waiters.
	pub fn update(&self, track: &str, info: TrackInfo) {
		let mut state = self.state.lock().unwrap();

		let mut latest = state.latest.clone().unwrap_or_default();
		latest.epoch += 1;
		latest.tracks.insert(track.to_string(), info);

		Self::publish(&mut state, latest);
	}

	/// Remove a track from the snapshot.
	pub fn remove(&self, track: &str) {
		let mut state = self.state.lock().unwrap();

		let Some(mut latest) = state.latest.clone() else {
			return;
		};

		if latest.tracks.remove(track).is_some() {
			latest.epoch += 1;
			Self::publish(&mut state, latest);
		}
	}

	fn publish(state: &mut State, latest: PlaybackInfo) {
		let epoch = latest.epoch;
		let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.waiting)
			.into_iter()
			.partition(|(min, _)| *min <= epoch);

		state.waiting = waiting;

		for (_, tx) in ready {
			// The waiter may have given up.
			tx.send(latest.clone()).ok();
		}

		state.latest = Some(latest);
	}

	/// The most recent snapshot.
	pub fn latest(&self) -> Option<PlaybackInfo> {
		self.state.lock().unwrap().latest.clone()
	}

	/// Wait for a snapshot with an epoch of at least `min_epoch`.
	///
	/// Returns immediately if the latest snapshot is fresh enough.
	pub async fn wait(&self, min_epoch: u64) -> Result<PlaybackInfo, Error> {
		let rx = {
			let mut state = self.state.lock().unwrap();

			if let Some(latest) = state.latest.as_ref().filter(|latest| latest.epoch >= min_epoch) {
				return Ok(latest.clone());
			}

			let (tx, rx) = oneshot::channel();
			state.waiting.push((min_epoch, tx));
			rx
		};

		rx.await.map_err(|_| Error::Closed)
	}

	/// The number of consumers still waiting.
	pub fn waiting(&self) -> usize {
		self.state.lock().unwrap().waiting.len()
	}

	/// Fail every waiter, used when playback stops.
	pub fn close(&self) {
		self.state.lock().unwrap().waiting.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rendered(micros: u64) -> TrackInfo {
		TrackInfo {
			rendered: Some(Timestamp::from_micros(micros)),
			buffered: None,
		}
	}

	#[tokio::test]
	async fn test_epoch_waiters() {
		let watch = InfoWatch::new();

		let first = tokio::spawn({
			let watch = watch.clone();
			async move { watch.wait(1).await }
		});
		let third = tokio::spawn({
			let watch = watch.clone();
			async move { watch.wait(3).await }
		});

		// Let both register.
		while watch.waiting() < 2 {
			tokio::task::yield_now().await;
		}

		watch.update("video", rendered(10));

		let info = first.await.unwrap().unwrap();
		assert_eq!(info.epoch, 1);
		assert_eq!(watch.waiting(), 1);

		watch.update("audio", rendered(5));
		assert_eq!(watch.waiting(), 1);

		watch.update("video", rendered(20));
		let info = third.await.unwrap().unwrap();
		assert_eq!(info.epoch, 3);
		assert_eq!(info.tracks["video"], rendered(20));
		assert_eq!(info.tracks["audio"], rendered(5));
		assert_eq!(watch.waiting(), 0);
	}

	#[tokio::test]
	async fn test_fresh_enough() {
		let watch = InfoWatch::new();
		watch.update("video", rendered(10));
		watch.update("video", rendered(20));

		// Already satisfied, so no waiting.
		let info = watch.wait(1).await.unwrap();
		assert_eq!(info.epoch, 2);
		assert_eq!(watch.waiting(), 0);
	}

	#[tokio::test]
	async fn test_close() {
		let watch = InfoWatch::new();

		let waiter = tokio::spawn({
			let watch = watch.clone();
			async move { watch.wait(5).await }
		});

		while watch.waiting() < 1 {
			tokio::task::yield_now().await;
		}

		watch.close();
		assert!(matches!(waiter.await.unwrap(), Err(Error::Closed)));
	}
}
