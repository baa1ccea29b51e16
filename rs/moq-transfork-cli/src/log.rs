use clap::Args;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Args, Clone, Debug)]
pub struct Log {
	/// The level of log output: error, warn, info, debug, or trace.
	///
	/// Overridden by the `RUST_LOG` environment variable.
	#[arg(long = "log-level", default_value = "info")]
	pub level: Level,
}

impl Log {
	pub fn level(&self) -> Level {
		self.level
	}

	/// Install a stderr subscriber, so stdout is left for inspection output.
	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(self.level().into())
			.from_env_lossy()
			.add_directive("tokio=info".parse().unwrap());

		let layer = tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.with_filter(filter);

		tracing_subscriber::registry().with(layer).init();
	}
}
