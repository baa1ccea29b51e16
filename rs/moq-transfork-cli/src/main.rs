mod inspect;
mod log;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use inspect::*;
use log::Log;
use moq_playback::PlaybackConfig;
use moq_transfork::ClientConfig;

#[derive(Parser, Clone)]
#[command(name = "transfork", version, about = "Media over QUIC Transfork tools")]
pub struct Cli {
	#[command(flatten)]
	log: Log,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
	/// Decode a captured stream and print every message.
	Inspect {
		/// The type of stream that was captured.
		#[arg(long, value_enum)]
		stream: StreamKind,

		/// The file containing the raw stream bytes, otherwise stdin.
		path: Option<PathBuf>,
	},

	/// Print the effective configuration as JSON.
	Config {
		#[command(flatten)]
		client: ClientConfig,

		#[command(flatten)]
		playback: PlaybackConfig,
	},
}

#[derive(serde::Serialize)]
struct Config {
	client: ClientConfig,
	playback: PlaybackConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	cli.log.init();

	match cli.command {
		Command::Inspect { stream, path } => inspect(stream, path).await,
		Command::Config { client, playback } => {
			let config = Config { client, playback };
			println!("{}", serde_json::to_string_pretty(&config)?);
			Ok(())
		}
	}
}
