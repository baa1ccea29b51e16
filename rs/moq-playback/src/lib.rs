//! # moq-playback: real-time playback for Media over QUIC
//!
//! Frames arrive from [moq_transfork] out of order, across many tracks and groups.
//! This crate re-orders them by presentation timestamp and releases them to a decoder and sink in sync with the wall clock.
//!
//! ## Pipeline
//!
//! - [ingest] reads a group, hands each frame to a [Demuxer], and inserts the samples into the [Timeline].
//! - The [Timeline] holds a [TrackBuffer] per track, dropping anything behind the last released timestamp.
//! - A [Renderer] per track submits samples to a [Decoder] and renders decoded frames to a [Sink], driven by a [Clock].
//! - [InfoWatch] publishes what each track has rendered and buffered.
//!
//! Decoding and rendering are implemented by the platform via the [DecoderFactory] and [Sink] traits.
mod buffer;
mod clock;
mod config;
mod decoder;
mod demux;
mod error;
mod frame;
mod info;
mod renderer;
mod time;
mod timeline;

// export the moq-transfork version in use
pub use moq_transfork;

pub use buffer::*;
pub use clock::*;
pub use config::*;
pub use decoder::*;
pub use demux::*;
pub use error::*;
pub use frame::*;
pub use info::*;
pub use renderer::*;
pub use time::*;
pub use timeline::*;
