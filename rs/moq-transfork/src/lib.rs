//! # moq-transfork: Media over QUIC Transfork
//!
//! A client for the Transfork variant of Media over QUIC.
//! Many independent tracks are multiplexed over a handful of bidirectional control streams,
//! with each group of frames delivered on its own unidirectional stream.
//!
//! ## Wire format
//!
//! - [coding]: variable-length integers, strings, and the async [coding::Reader]/[coding::Writer].
//! - [message]: every control and data message, dispatched by stream type via [message::Bi] and [message::Uni].
//!
//! ## Session
//!
//! - [Session::connect] performs the handshake over any [Transport] and runs the session in the background.
//! - [Session::announced] reports broadcasts as the publisher announces them.
//! - [Subscriber::subscribe] creates a [Subscription], which yields groups in the negotiated [message::Order].
//! - [Subscriber::fetch] and [Subscriber::info] are one-shot requests.
//!
//! [ServerSession::accept] performs the other half of the handshake.

mod config;
mod error;
mod session;
mod transport;

pub mod coding;
pub mod message;
pub mod subscriber;

pub use config::*;
pub use error::*;
pub use session::*;
pub use subscriber::{Announced, Fetched, GroupReader, Subscriber, Subscription};
pub use transport::*;
