/// Errors from the playback pipeline.
///
/// These are scoped to a single track; one track failing doesn't affect the others.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
	/// The decoder factory can't handle the codec.
	#[error("decoder unsupported: {0}")]
	DecoderUnsupported(String),

	#[error("decoder error: {0}")]
	Decoder(String),

	#[error("demux error: {0}")]
	Demux(String),

	#[error("transport error: {0}")]
	Transport(#[from] moq_transfork::Error),

	#[error("closed")]
	Closed,
}
