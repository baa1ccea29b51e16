use std::sync::Arc;

use tokio::sync::Notify;

use crate::{DecoderConfig, Error, Sample, Timed};

/// A decoder instance for a single track, implemented by the platform.
///
/// Decoding is asynchronous: samples are submitted with [Decoder::decode] and frames are pulled with [Decoder::output].
pub trait Decoder: Send {
	type Frame: Timed + Send;

	/// Submit a sample for decoding.
	fn decode(&mut self, sample: &Sample) -> Result<(), Error>;

	/// The number of samples submitted but not yet decoded.
	fn queue_size(&self) -> usize;

	/// Return the next decoded frame, if any.
	fn output(&mut self) -> Option<Self::Frame>;

	/// Notified whenever the decoder's queue shrinks, so more samples can be submitted.
	///
	/// Implementations must use [Notify::notify_one], which stores a permit if the renderer isn't waiting yet.
	fn dequeued(&self) -> Arc<Notify>;

	/// Release the decoder's resources; no more samples will be submitted.
	fn close(&mut self);
}

/// Creates a [Decoder] for a track's configuration.
pub trait DecoderFactory: Send {
	type Decoder: Decoder;

	/// Create a new decoder, or return [Error::DecoderUnsupported] if the codec can't be handled.
	fn create(&mut self, config: &DecoderConfig) -> Result<Self::Decoder, Error>;
}

/// The output of a track, such as a canvas or an audio device.
pub trait Sink: Send {
	type Frame;

	fn render(&mut self, frame: Self::Frame);
}
