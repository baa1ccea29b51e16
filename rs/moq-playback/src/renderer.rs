use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::{
	Clock, Decoder, DecoderFactory, Error, InfoWatch, PlaybackConfig, Sample, Sink, Timed, Timeline, Timestamp,
	TrackBuffer, TrackInfo,
};

/// The decoded frame type produced for a factory.
pub type DecodedFrame<F> = <<F as DecoderFactory>::Decoder as Decoder>::Frame;

/// Decodes and renders a single track in sync with the wall clock.
///
/// Each [Renderer::tick] releases at most one frame: the latest one that is due, skipping any older ones.
pub struct Renderer<F, S>
where
	F: DecoderFactory,
	S: Sink<Frame = DecodedFrame<F>>,
{
	track: String,
	timeline: Timeline,
	clock: Clock,

	factory: F,
	decoder: Option<F::Decoder>,

	// Decoded frames waiting to be rendered.
	decoded: TrackBuffer<DecodedFrame<F>>,
	sink: S,

	max_decode_queue: usize,
	frame_interval: Duration,

	info: Option<(InfoWatch, TrackInfo)>,
}

impl<F, S> Renderer<F, S>
where
	F: DecoderFactory,
	S: Sink<Frame = DecodedFrame<F>>,
{
	pub fn new(track: impl Into<String>, timeline: Timeline, factory: F, sink: S, config: &PlaybackConfig) -> Self {
		Self {
			track: track.into(),
			timeline,
			clock: Clock::new(config.latency),
			factory,
			decoder: None,
			decoded: TrackBuffer::new(),
			sink,
			max_decode_queue: config.max_decode_queue,
			frame_interval: config.frame_interval,
			info: None,
		}
	}

	/// Publish the track's state to the [InfoWatch] after every change.
	pub fn with_info(mut self, info: InfoWatch) -> Self {
		self.info = Some((info, TrackInfo::default()));
		self
	}

	pub fn track(&self) -> &str {
		&self.track
	}

	/// The timestamp of the last rendered frame.
	pub fn rendered(&self) -> Option<Timestamp> {
		self.decoded.watermark()
	}

	/// Render the frame that is due at `now`, if any, then submit more samples to the decoder.
	///
	/// Returns the timestamp of the rendered frame.
	pub fn tick(&mut self, now: Instant) -> Result<Option<Timestamp>, Error> {
		self.drain_output();

		let rendered = self.draw(now);
		self.try_decode(now)?;
		self.publish();

		Ok(rendered)
	}

	fn draw(&mut self, now: Instant) -> Option<Timestamp> {
		let head = self.decoded.peek()?;
		if !self.clock.is_due(head, now) {
			// Nothing to render yet.
			return None;
		}

		let mut frame = self.decoded.next()?;

		// Skip any frames that are also due, rendering only the latest.
		while let Some(next) = self.decoded.peek() {
			if !self.clock.is_due(next, now) {
				break;
			}

			tracing::trace!(track = %self.track, timestamp = %frame.timestamp(), "skipping frame");
			frame = self.decoded.next()?;
		}

		let timestamp = frame.timestamp();
		tracing::trace!(track = %self.track, %timestamp, "rendering frame");
		self.sink.render(frame);

		Some(timestamp)
	}

	// Move any decoded frames into the render queue.
	fn drain_output(&mut self) {
		let Some(decoder) = &mut self.decoder else {
			return;
		};

		while let Some(frame) = decoder.output() {
			self.decoded.render(frame);
		}
	}

	/// Submit samples to the decoder until its queue is full or the timeline is empty.
	pub fn try_decode(&mut self, now: Instant) -> Result<(), Error> {
		loop {
			if let Some(decoder) = &self.decoder {
				if decoder.queue_size() > self.max_decode_queue {
					return Ok(());
				}
			}

			let Some(sample) = self.timeline.next(&self.track) else {
				return Ok(());
			};

			self.clock.sync(sample.timestamp, now);

			if sample.keyframe {
				self.replace_decoder(&sample)?;
			}

			let Some(decoder) = &mut self.decoder else {
				tracing::trace!(track = %self.track, timestamp = %sample.timestamp, "skipping sample until the next keyframe");
				continue;
			};

			decoder.decode(&sample)?;
		}
	}

	// Close the current decoder, if any, and create a new one for the keyframe.
	fn replace_decoder(&mut self, sample: &Sample) -> Result<(), Error> {
		self.drain_output();

		if let Some(mut old) = self.decoder.take() {
			old.close();
		}

		let decoder = self.factory.create(&sample.config)?;
		tracing::debug!(track = %self.track, config = ?sample.config, "created decoder");

		self.decoder = Some(decoder);

		Ok(())
	}

	fn publish(&mut self) {
		let Some((watch, last)) = &mut self.info else {
			return;
		};

		let info = TrackInfo {
			rendered: self.decoded.watermark(),
			buffered: self.decoded.buffered(),
		};

		if *last != info {
			*last = info.clone();
			watch.update(&self.track, info);
		}
	}

	/// Returns true once the track is finished and everything was rendered.
	pub fn is_finished(&self) -> bool {
		self.timeline.is_finished(&self.track)
			&& self.decoded.is_empty()
			&& self.decoder.as_ref().is_none_or(|decoder| decoder.queue_size() == 0)
	}

	/// Run the render loop until the track is finished or an error occurs.
	///
	/// Ticks every frame interval, and also submits samples whenever the decoder has room or new samples arrive.
	pub async fn run(mut self) -> Result<(), Error> {
		let mut interval = tokio::time::interval(self.frame_interval);
		interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

		let res = loop {
			let dequeued = self.decoder.as_ref().map(|decoder| decoder.dequeued());
			let changed = self.timeline.changed();

			let res = tokio::select! {
				_ = interval.tick() => self.tick(Instant::now()).map(|_| ()),
				_ = changed => self.try_decode(Instant::now()),
				_ = async {
					match &dequeued {
						Some(dequeued) => dequeued.notified().await,
						None => std::future::pending::<()>().await,
					}
				} => {
					self.drain_output();
					self.try_decode(Instant::now())
				}
			};

			if let Err(err) = res {
				break Err(err);
			}

			if self.is_finished() {
				break Ok(());
			}
		};

		match &res {
			Ok(()) => tracing::debug!(track = %self.track, "render finished"),
			Err(err) => tracing::warn!(track = %self.track, %err, "render error"),
		}

		self.close();

		res
	}

	/// Stop rendering, releasing the decoder and dropping anything not yet rendered.
	pub fn close(&mut self) {
		if let Some(mut decoder) = self.decoder.take() {
			decoder.close();
		}

		self.decoded.clear();
		self.timeline.close(&self.track);

		if let Some((watch, _)) = &self.info {
			watch.remove(&self.track);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{
		collections::VecDeque,
		sync::{Arc, Mutex},
	};

	use bytes::Bytes;
	use tokio::sync::Notify;

	use super::*;
	use crate::{DecoderConfig, TimelineFrame};

	#[derive(Debug, PartialEq)]
	struct Frame(Timestamp);

	impl Timed for Frame {
		fn timestamp(&self) -> Timestamp {
			self.0
		}
	}

	#[derive(Default)]
	struct DecoderState {
		pending: VecDeque<Timestamp>,
		output: VecDeque<Timestamp>,
		submitted: Vec<u64>,
		closed: bool,
	}

	struct MockDecoder {
		state: Arc<Mutex<DecoderState>>,
		notify: Arc<Notify>,
		instant: bool,
	}

	impl Decoder for MockDecoder {
		type Frame = Frame;

		fn decode(&mut self, sample: &Sample) -> Result<(), Error> {
			if sample.payload.as_ref() == b"corrupt" {
				return Err(Error::Decoder("corrupt sample".to_string()));
			}

			let mut state = self.state.lock().unwrap();
			state.submitted.push(sample.timestamp.as_millis());

			match self.instant {
				true => state.output.push_back(sample.timestamp),
				false => state.pending.push_back(sample.timestamp),
			}

			Ok(())
		}

		fn queue_size(&self) -> usize {
			self.state.lock().unwrap().pending.len()
		}

		fn output(&mut self) -> Option<Frame> {
			self.state.lock().unwrap().output.pop_front().map(Frame)
		}

		fn dequeued(&self) -> Arc<Notify> {
			self.notify.clone()
		}

		fn close(&mut self) {
			self.state.lock().unwrap().closed = true;
		}
	}

	// Every decoder created, in order.
	#[derive(Clone, Default)]
	struct Instances(Arc<Mutex<Vec<(Arc<Mutex<DecoderState>>, Arc<Notify>)>>>);

	impl Instances {
		fn len(&self) -> usize {
			self.0.lock().unwrap().len()
		}

		fn submitted(&self, index: usize) -> Vec<u64> {
			self.0.lock().unwrap()[index].0.lock().unwrap().submitted.clone()
		}

		fn closed(&self, index: usize) -> bool {
			self.0.lock().unwrap()[index].0.lock().unwrap().closed
		}

		// Finish decoding up to `count` pending samples on the decoder.
		fn complete(&self, index: usize, count: usize) {
			let instances = self.0.lock().unwrap();
			let (state, notify) = &instances[index];

			let mut state = state.lock().unwrap();
			for _ in 0..count {
				let Some(timestamp) = state.pending.pop_front() else {
					break;
				};
				state.output.push_back(timestamp);
			}

			notify.notify_one();
		}
	}

	struct MockFactory {
		instances: Instances,
		instant: bool,
	}

	impl DecoderFactory for MockFactory {
		type Decoder = MockDecoder;

		fn create(&mut self, config: &DecoderConfig) -> Result<MockDecoder, Error> {
			if config.codec == "unsupported" {
				return Err(Error::DecoderUnsupported(config.codec.clone()));
			}

			let state = Arc::new(Mutex::new(DecoderState::default()));
			let notify = Arc::new(Notify::new());
			self.instances.0.lock().unwrap().push((state.clone(), notify.clone()));

			Ok(MockDecoder {
				state,
				notify,
				instant: self.instant,
			})
		}
	}

	#[derive(Clone, Default)]
	struct MockSink(Arc<Mutex<Vec<u64>>>);

	impl MockSink {
		fn rendered(&self) -> Vec<u64> {
			self.0.lock().unwrap().clone()
		}
	}

	impl Sink for MockSink {
		type Frame = Frame;

		fn render(&mut self, frame: Frame) {
			self.0.lock().unwrap().push(frame.0.as_millis());
		}
	}

	fn sample(codec: &str, millis: u64, keyframe: bool) -> TimelineFrame {
		TimelineFrame {
			track: "video".to_string(),
			sample: Sample {
				timestamp: Timestamp::from_millis(millis).unwrap(),
				keyframe,
				config: Arc::new(DecoderConfig::new(codec)),
				payload: Bytes::from_static(b"sample"),
			},
		}
	}

	fn setup(instant: bool, latency: Duration) -> (Renderer<MockFactory, MockSink>, Timeline, Instances, MockSink) {
		let timeline = Timeline::new();
		let instances = Instances::default();
		let sink = MockSink::default();

		let factory = MockFactory {
			instances: instances.clone(),
			instant,
		};

		let config = PlaybackConfig {
			latency,
			..Default::default()
		};

		let renderer = Renderer::new("video", timeline.clone(), factory, sink.clone(), &config);
		(renderer, timeline, instances, sink)
	}

	#[test]
	fn test_keyframe_new_decoder() {
		let (mut renderer, timeline, instances, _) = setup(true, Duration::ZERO);

		timeline.insert(sample("avc1", 0, true));
		timeline.insert(sample("avc1", 10, false));
		timeline.insert(sample("avc1", 20, false));
		timeline.insert(sample("avc1", 30, true));

		renderer.tick(Instant::now()).unwrap();

		assert_eq!(instances.len(), 2);
		assert_eq!(instances.submitted(0), vec![0, 10, 20]);
		assert_eq!(instances.submitted(1), vec![30]);

		assert!(instances.closed(0));
		assert!(!instances.closed(1));
	}

	#[test]
	fn test_delta_without_decoder() {
		let (mut renderer, timeline, instances, _) = setup(true, Duration::ZERO);

		timeline.insert(sample("avc1", 0, false));
		timeline.insert(sample("avc1", 10, false));

		renderer.tick(Instant::now()).unwrap();
		assert_eq!(instances.len(), 0);

		timeline.insert(sample("avc1", 20, true));
		timeline.insert(sample("avc1", 30, false));

		renderer.tick(Instant::now()).unwrap();
		assert_eq!(instances.len(), 1);
		assert_eq!(instances.submitted(0), vec![20, 30]);
	}

	#[test]
	fn test_skip_frames() {
		let (mut renderer, timeline, _, sink) = setup(true, Duration::ZERO);
		let start = Instant::now();

		for (millis, keyframe) in [(0, true), (10, false), (20, false), (30, false)] {
			timeline.insert(sample("avc1", millis, keyframe));
		}

		// Submits everything, using the first sample as the reference.
		assert_eq!(renderer.tick(start).unwrap(), None);

		// Both 0 and 10 are skipped in favor of 20.
		let rendered = renderer.tick(start + Duration::from_millis(25)).unwrap();
		assert_eq!(rendered, Some(Timestamp::from_millis(20).unwrap()));
		assert_eq!(sink.rendered(), vec![20]);

		// Nothing new is due yet.
		assert_eq!(renderer.tick(start + Duration::from_millis(26)).unwrap(), None);

		renderer.tick(start + Duration::from_millis(30)).unwrap();
		assert_eq!(sink.rendered(), vec![20, 30]);
		assert_eq!(renderer.rendered(), Some(Timestamp::from_millis(30).unwrap()));
	}

	#[test]
	fn test_latency() {
		let (mut renderer, timeline, _, sink) = setup(true, Duration::from_millis(100));
		let start = Instant::now();

		timeline.insert(sample("avc1", 1_000, true));

		renderer.tick(start).unwrap();
		renderer.tick(start + Duration::from_millis(99)).unwrap();
		assert!(sink.rendered().is_empty());

		renderer.tick(start + Duration::from_millis(100)).unwrap();
		assert_eq!(sink.rendered(), vec![1_000]);
	}

	#[test]
	fn test_decode_backpressure() {
		let (mut renderer, timeline, instances, _) = setup(false, Duration::ZERO);

		timeline.insert(sample("avc1", 0, true));
		for millis in 1..10 {
			timeline.insert(sample("avc1", millis * 10, false));
		}

		// Submitting stops once more than 4 are queued.
		renderer.tick(Instant::now()).unwrap();
		assert_eq!(instances.submitted(0).len(), 5);

		instances.complete(0, 3);
		renderer.tick(Instant::now()).unwrap();
		assert_eq!(instances.submitted(0).len(), 8);

		assert_eq!(timeline.buffered("video").map(|(first, _)| first.as_millis()), Some(80));
	}

	#[test]
	fn test_unsupported() {
		let (mut renderer, timeline, _, _) = setup(true, Duration::ZERO);
		timeline.insert(sample("unsupported", 0, true));

		let err = renderer.tick(Instant::now()).unwrap_err();
		assert!(matches!(err, Error::DecoderUnsupported(codec) if codec == "unsupported"));
	}

	#[test]
	fn test_decoder_error() {
		let (mut renderer, timeline, instances, _) = setup(true, Duration::ZERO);

		timeline.insert(sample("avc1", 0, true));

		let mut corrupt = sample("avc1", 10, false);
		corrupt.sample.payload = Bytes::from_static(b"corrupt");
		timeline.insert(corrupt);

		let err = renderer.tick(Instant::now()).unwrap_err();
		assert!(matches!(err, Error::Decoder(_)));
		assert_eq!(instances.submitted(0), vec![0]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_run_wakes_on_insert() {
		let timeline = Timeline::new();
		let instances = Instances::default();

		let factory = MockFactory {
			instances: instances.clone(),
			instant: false,
		};

		let config = PlaybackConfig {
			latency: Duration::ZERO,
			frame_interval: Duration::from_secs(3600),
			..Default::default()
		};

		let renderer = Renderer::new("video", timeline.clone(), factory, MockSink::default(), &config);
		let handle = tokio::spawn(renderer.run());

		// Let the first interval tick pass with nothing to decode.
		tokio::task::yield_now().await;
		tokio::task::yield_now().await;
		assert_eq!(instances.len(), 0);

		// Submitted right away, long before the next tick.
		timeline.insert(sample("avc1", 0, true));
		for _ in 0..10 {
			tokio::task::yield_now().await;
		}
		assert_eq!(instances.submitted(0), vec![0]);

		handle.abort();
	}

	#[test]
	fn test_info() {
		let (renderer, timeline, _, _) = setup(true, Duration::ZERO);
		let info = InfoWatch::new();
		let mut renderer = renderer.with_info(info.clone());
		let start = Instant::now();

		timeline.insert(sample("avc1", 0, true));
		timeline.insert(sample("avc1", 10, false));

		renderer.tick(start).unwrap();
		renderer.tick(start).unwrap();

		let latest = info.latest().unwrap();
		let track = &latest.tracks["video"];
		assert_eq!(track.rendered, Some(Timestamp::ZERO));
		assert_eq!(
			track.buffered,
			Some((Timestamp::from_millis(10).unwrap(), Timestamp::from_millis(10).unwrap()))
		);

		// Unchanged state isn't published again.
		let epoch = latest.epoch;
		renderer.tick(start).unwrap();
		assert_eq!(info.latest().unwrap().epoch, epoch);

		renderer.close();
		assert!(!info.latest().unwrap().tracks.contains_key("video"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_run() {
		let (renderer, timeline, instances, sink) = setup(false, Duration::from_millis(50));

		timeline.insert(sample("avc1", 0, true));
		timeline.insert(sample("avc1", 40, false));
		timeline.insert(sample("avc1", 80, false));
		timeline.finish("video");

		let handle = tokio::spawn(renderer.run());

		// Let the decoder finish each sample as they're submitted.
		while !handle.is_finished() {
			tokio::time::sleep(Duration::from_millis(5)).await;
			if instances.len() == 1 {
				instances.complete(0, usize::MAX);
			}
		}

		handle.await.unwrap().unwrap();
		assert_eq!(sink.rendered(), vec![0, 40, 80]);
		assert!(instances.closed(0));
	}

	#[tokio::test(start_paused = true)]
	async fn test_run_unsupported() {
		let (renderer, timeline, _, sink) = setup(true, Duration::ZERO);
		timeline.insert(sample("unsupported", 0, true));

		let err = renderer.run().await.unwrap_err();
		assert!(matches!(err, Error::DecoderUnsupported(_)));
		assert!(sink.rendered().is_empty());

		// The failed track was closed without touching any others.
		assert!(timeline.is_finished("video"));
		assert!(!timeline.is_finished("audio"));
	}
}
