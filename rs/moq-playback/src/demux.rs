use std::sync::Arc;

use bytes::Bytes;
use moq_transfork::{
	GroupReader,
	coding::{Decode, DecodeError},
};
use tokio::io::AsyncRead;

use crate::{DecoderConfig, Error, Sample, Timeline, TimelineFrame, Timestamp};

/// Turns the frames of a track into timestamped samples, implemented by a container parser.
pub trait Demuxer: Send {
	/// Called before the first frame of each group.
	fn start_group(&mut self, _sequence: u64) {}

	/// Parse a single frame payload, returning any complete samples.
	fn demux(&mut self, payload: Bytes) -> Result<Vec<Sample>, Error>;
}

/// The minimal container: each frame is a varint timestamp in microseconds followed by the codec payload.
///
/// The first frame of each group is a keyframe.
#[derive(Debug)]
pub struct Container {
	config: Arc<DecoderConfig>,
	keyframe: bool,
}

impl Container {
	pub fn new(config: DecoderConfig) -> Self {
		Self {
			config: Arc::new(config),
			keyframe: false,
		}
	}

	/// Switch to a new decoder configuration, taking effect on the next sample.
	pub fn set_config(&mut self, config: DecoderConfig) {
		self.config = Arc::new(config);
	}
}

impl Demuxer for Container {
	fn start_group(&mut self, _sequence: u64) {
		self.keyframe = true;
	}

	fn demux(&mut self, mut payload: Bytes) -> Result<Vec<Sample>, Error> {
		let micros = u64::decode(&mut payload).map_err(|err: DecodeError| Error::Demux(err.to_string()))?;

		let sample = Sample {
			timestamp: Timestamp::from_micros(micros),
			keyframe: std::mem::take(&mut self.keyframe),
			config: self.config.clone(),
			payload,
		};

		Ok(vec![sample])
	}
}

/// Read every frame in the group, demux it, and insert the samples into the track's timeline.
///
/// Returns the number of samples inserted; late samples are dropped.
pub async fn ingest<R, D>(
	track: &str,
	mut group: GroupReader<R>,
	demuxer: &mut D,
	timeline: &Timeline,
) -> Result<usize, Error>
where
	R: AsyncRead + Unpin,
	D: Demuxer,
{
	demuxer.start_group(group.sequence());

	let mut inserted = 0;

	while let Some(payload) = group.read_frame().await? {
		for sample in demuxer.demux(payload)? {
			let timestamp = sample.timestamp;

			let frame = TimelineFrame {
				track: track.to_string(),
				sample,
			};

			match timeline.insert(frame) {
				true => inserted += 1,
				false => tracing::trace!(track, group = group.sequence(), %timestamp, "dropped late sample"),
			}
		}
	}

	tracing::debug!(track, group = group.sequence(), inserted, "ingested group");

	Ok(inserted)
}
