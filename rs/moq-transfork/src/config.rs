use clap::Args;

use crate::{coding::Version, message::Role};

/// The versions we offer by default, in order of preference.
pub const VERSIONS: [Version; 2] = [Version::FORK_00, Version::DRAFT_03];

/// Client configuration for [crate::Session::connect].
#[derive(Args, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields, default))]
pub struct ClientConfig {
	/// The versions to offer, in order of preference.
	#[arg(
		id = "client-version",
		long = "client-version",
		value_delimiter = ',',
		default_values_t = VERSIONS
	)]
	pub versions: Vec<Version>,

	/// Our role: publisher, subscriber, or both.
	#[arg(id = "client-role", long = "client-role", default_value = "subscriber")]
	pub role: Role,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			versions: VERSIONS.to_vec(),
			role: Role::Subscriber,
		}
	}
}
