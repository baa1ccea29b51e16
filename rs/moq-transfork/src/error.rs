use std::sync::Arc;

use crate::coding::{DecodeError, Versions};

/// A list of possible errors that can occur during the session.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
	#[error("io error: {0}")]
	Io(Arc<std::io::Error>),

	#[error("decode error: {0}")]
	Decode(#[from] DecodeError),

	#[error("unsupported versions: client={0:?} server={1:?}")]
	Version(Versions, Versions),

	/// A message arrived on the wrong stream or before the session was negotiated.
	#[error("protocol violation: {0}")]
	ProtocolSequencing(&'static str),

	#[error("subscription not found: {0}")]
	SubscriptionNotFound(u64),

	#[error("duplicate subscription: {0}")]
	DuplicateSubscription(u64),

	/// The subscription ended because of a [crate::message::GroupDrop] covering the rest of its range.
	#[error("dropped: code={0}")]
	Dropped(u64),

	#[error("expired")]
	Expired,

	#[error("cancelled")]
	Cancel,

	#[error("closed")]
	Closed,
}

impl Error {
	/// An integer code that is sent over the wire.
	pub fn to_code(&self) -> u32 {
		match self {
			Self::Cancel => 0,
			Self::Closed => 1,
			Self::Io(_) => 2,
			Self::Decode(_) => 3,
			Self::Version(..) => 4,
			Self::ProtocolSequencing(_) => 5,
			Self::SubscriptionNotFound(_) => 6,
			Self::DuplicateSubscription(_) => 7,
			Self::Dropped(_) => 8,
			Self::Expired => 9,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(Arc::new(err))
	}
}
