use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use tokio::sync::{Notify, futures::OwnedNotified};

use crate::{Sample, Timestamp, TimelineFrame, TrackBuffer};

#[derive(Default)]
struct TrackState {
	buffer: TrackBuffer<Sample>,
	closed: bool,
}

#[derive(Default)]
struct State {
	tracks: HashMap<String, TrackState>,
}

/// The samples waiting to be decoded, for every track.
///
/// The network side inserts with [Timeline::insert] and each track's renderer consumes with [Timeline::next].
/// Cloning returns a handle to the same timeline.
#[derive(Clone, Default)]
pub struct Timeline {
	state: Arc<Mutex<State>>,
	notify: Arc<Notify>,
}

impl Timeline {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a sample into its track, returning false if it was dropped for being too old.
	pub fn insert(&self, frame: TimelineFrame) -> bool {
		let mut state = self.state.lock().unwrap();
		let track = state.tracks.entry(frame.track).or_default();

		if track.closed {
			return false;
		}

		let inserted = track.buffer.render(frame.sample);
		if inserted {
			self.notify.notify_waiters();
		}

		inserted
	}

	/// Remove the earliest sample for the track.
	pub fn next(&self, track: &str) -> Option<Sample> {
		self.state.lock().unwrap().tracks.get_mut(track)?.buffer.next()
	}

	/// Returns a future that resolves once a sample is inserted or a track is finished.
	///
	/// Create it before checking for samples; any change after this call wakes it.
	pub fn changed(&self) -> OwnedNotified {
		let _state = self.state.lock().unwrap();
		self.notify.clone().notified_owned()
	}

	/// The earliest and latest pending samples for the track.
	pub fn buffered(&self, track: &str) -> Option<(Timestamp, Timestamp)> {
		self.state.lock().unwrap().tracks.get(track)?.buffer.buffered()
	}

	/// Stop accepting samples for the track, keeping any that are pending.
	pub fn finish(&self, track: &str) {
		let mut state = self.state.lock().unwrap();
		state.tracks.entry(track.to_string()).or_default().closed = true;

		self.notify.notify_waiters();
	}

	/// Stop accepting samples for the track and drop any that are pending.
	pub fn close(&self, track: &str) {
		let mut state = self.state.lock().unwrap();
		let track = state.tracks.entry(track.to_string()).or_default();
		track.closed = true;
		track.buffer.clear();

		self.notify.notify_waiters();
	}

	/// Returns true if the track was finished or closed, and every sample was consumed.
	pub fn is_finished(&self, track: &str) -> bool {
		let state = self.state.lock().unwrap();
		state
			.tracks
			.get(track)
			.is_some_and(|track| track.closed && track.buffer.is_empty())
	}

	/// Drop every pending sample and forget the watermarks, used when seeking.
	pub fn reset(&self) {
		let mut state = self.state.lock().unwrap();
		for track in state.tracks.values_mut() {
			track.buffer.reset();
		}
	}

	pub fn tracks(&self) -> Vec<String> {
		self.state.lock().unwrap().tracks.keys().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::DecoderConfig;
	use bytes::Bytes;

	fn frame(track: &str, micros: u64) -> TimelineFrame {
		TimelineFrame {
			track: track.to_string(),
			sample: Sample {
				timestamp: Timestamp::from_micros(micros),
				keyframe: false,
				config: Arc::new(DecoderConfig::new("opus")),
				payload: Bytes::new(),
			},
		}
	}

	#[test]
	fn test_tracks_independent() {
		let timeline = Timeline::new();

		assert!(timeline.insert(frame("video", 20)));
		assert!(timeline.insert(frame("audio", 5)));
		assert!(timeline.insert(frame("video", 10)));

		assert_eq!(timeline.next("video").unwrap().timestamp.as_micros(), 10);
		assert_eq!(timeline.next("audio").unwrap().timestamp.as_micros(), 5);

		// Behind the video watermark, but not the audio one.
		assert!(!timeline.insert(frame("video", 8)));
		assert!(timeline.insert(frame("audio", 8)));

		assert_eq!(timeline.next("video").unwrap().timestamp.as_micros(), 20);
		assert!(timeline.next("video").is_none());
		assert!(timeline.next("missing").is_none());
	}

	#[test]
	fn test_close() {
		let timeline = Timeline::new();
		timeline.insert(frame("video", 10));
		assert!(!timeline.is_finished("video"));

		timeline.close("video");
		assert!(timeline.is_finished("video"));
		assert!(timeline.next("video").is_none());
		assert!(!timeline.insert(frame("video", 20)));
	}

	#[test]
	fn test_finish() {
		let timeline = Timeline::new();
		timeline.insert(frame("audio", 10));

		timeline.finish("audio");
		assert!(!timeline.is_finished("audio"));
		assert!(!timeline.insert(frame("audio", 20)));

		assert_eq!(timeline.next("audio").unwrap().timestamp.as_micros(), 10);
		assert!(timeline.is_finished("audio"));
	}

	#[test]
	fn test_reset() {
		let timeline = Timeline::new();
		timeline.insert(frame("video", 20));
		timeline.insert(frame("audio", 30));
		timeline.next("video");

		let mut tracks = timeline.tracks();
		tracks.sort();
		assert_eq!(tracks, vec!["audio", "video"]);

		// Seeking backwards: the watermark is forgotten.
		assert!(!timeline.insert(frame("video", 10)));
		timeline.reset();
		assert!(timeline.next("audio").is_none());
		assert!(timeline.insert(frame("video", 10)));
	}

	#[tokio::test]
	async fn test_changed() {
		let timeline = Timeline::new();

		// Created before the insert, so the wakeup isn't lost.
		let changed = timeline.changed();
		timeline.insert(frame("video", 10));
		changed.await;

		let changed = timeline.changed();
		timeline.finish("video");
		changed.await;
	}
}
