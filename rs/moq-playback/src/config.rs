use std::time::Duration;

use clap::Args;

/// The default maximum number of samples waiting in a decoder.
pub const MAX_DECODE_QUEUE: usize = 4;

/// Playback configuration, shared by every track's [crate::Renderer].
#[derive(Args, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields, default))]
pub struct PlaybackConfig {
	/// How long after the first frame arrives before it's rendered.
	#[arg(long = "playback-latency", default_value = "500ms", value_parser = humantime::parse_duration)]
	#[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
	pub latency: Duration,

	/// Stop submitting samples once a decoder has more than this many queued.
	#[arg(long = "playback-max-decode-queue", default_value_t = MAX_DECODE_QUEUE)]
	pub max_decode_queue: usize,

	/// How often the render clock ticks, usually the display refresh interval.
	#[arg(long = "playback-frame-interval", default_value = "16ms", value_parser = humantime::parse_duration)]
	#[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
	pub frame_interval: Duration,
}

impl Default for PlaybackConfig {
	fn default() -> Self {
		Self {
			latency: Duration::from_millis(500),
			max_decode_queue: MAX_DECODE_QUEUE,
			frame_interval: Duration::from_millis(16),
		}
	}
}
