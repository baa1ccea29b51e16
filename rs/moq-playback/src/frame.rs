use std::sync::Arc;

use bytes::Bytes;
use derive_more::Debug;

use crate::Timestamp;

/// Anything that is presented at a timestamp.
pub trait Timed {
	fn timestamp(&self) -> Timestamp;
}

/// The parameters needed to configure a decoder for a track.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderConfig {
	/// The codec string, ex. `avc1.64001f` or `opus`.
	pub codec: String,

	/// Codec specific initialization data, ex. the avcC box for H.264.
	#[debug("{:?}", description.as_ref().map(|d| d.len()))]
	pub description: Option<Bytes>,

	pub coded_width: Option<u32>,
	pub coded_height: Option<u32>,
}

impl DecoderConfig {
	pub fn new(codec: impl Into<String>) -> Self {
		Self {
			codec: codec.into(),
			description: None,
			coded_width: None,
			coded_height: None,
		}
	}
}

/// A demuxed media sample, not yet decoded.
#[derive(Clone, Debug)]
pub struct Sample {
	/// The presentation timestamp.
	pub timestamp: Timestamp,

	/// Whether this sample can be decoded independently.
	///
	/// A keyframe always starts a new decoder.
	pub keyframe: bool,

	/// The decoder configuration in effect for this sample.
	pub config: Arc<DecoderConfig>,

	#[debug("{} bytes", payload.len())]
	pub payload: Bytes,
}

impl Timed for Sample {
	fn timestamp(&self) -> Timestamp {
		self.timestamp
	}
}

/// A sample paired with the track it belongs to.
#[derive(Clone, Debug)]
pub struct TimelineFrame {
	pub track: String,
	pub sample: Sample,
}

impl Timed for TimelineFrame {
	fn timestamp(&self) -> Timestamp {
		self.sample.timestamp
	}
}
