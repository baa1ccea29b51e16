use std::path::PathBuf;

use anyhow::Context;
use clap::ValueEnum;
use moq_transfork::{
	GroupReader,
	coding::Reader,
	message::{Bi, FetchUpdate, SubscribeUpdate, Uni},
};
use tokio::io::AsyncRead;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
	/// A bidirectional control stream, as written by the client.
	Bi,
	/// A unidirectional group stream.
	Uni,
}

/// Decode a captured stream from the file, or stdin if there's no path, printing each message.
pub async fn inspect(kind: StreamKind, path: Option<PathBuf>) -> anyhow::Result<()> {
	let messages = match path {
		Some(path) => {
			let file = tokio::fs::File::open(&path)
				.await
				.with_context(|| format!("failed to open {}", path.display()))?;
			decode(kind, file).await?
		}
		None => decode(kind, tokio::io::stdin()).await?,
	};

	for message in messages {
		println!("{message}");
	}

	Ok(())
}

async fn decode<R: AsyncRead + Unpin>(kind: StreamKind, stream: R) -> anyhow::Result<Vec<String>> {
	let mut reader = Reader::new(stream);

	match kind {
		StreamKind::Bi => decode_bi(&mut reader).await,
		StreamKind::Uni => decode_uni(reader).await,
	}
}

async fn decode_bi<R: AsyncRead + Unpin>(reader: &mut Reader<R>) -> anyhow::Result<Vec<String>> {
	let bi: Bi = reader.decode().await.context("failed to decode stream header")?;
	tracing::debug!(stream = ?bi.stream(), "decoded stream header");

	let mut messages = vec![format!("{bi:?}")];

	// Only subscriptions and fetches carry more messages in this direction.
	match bi {
		Bi::Subscribe(_) | Bi::Datagrams(_) => {
			while let Some(update) = reader.decode_maybe::<SubscribeUpdate>().await? {
				messages.push(format!("{update:?}"));
			}
		}
		Bi::Fetch(_) => {
			while let Some(update) = reader.decode_maybe::<FetchUpdate>().await? {
				messages.push(format!("{update:?}"));
			}
		}
		Bi::Session(_) | Bi::Announce(_) | Bi::Info(_) => {
			if !reader.done().await? {
				tracing::warn!("unexpected trailing bytes");
			}
		}
	}

	Ok(messages)
}

async fn decode_uni<R: AsyncRead + Unpin>(mut reader: Reader<R>) -> anyhow::Result<Vec<String>> {
	let Uni::Group(group) = reader.decode().await.context("failed to decode stream header")?;
	let mut messages = vec![format!("{group:?}")];

	let mut group = GroupReader::new(group, reader);
	let mut count = 0;

	while let Some(frame) = group.read_frame().await? {
		messages.push(format!("frame {count}: {} bytes", frame.len()));
		count += 1;
	}

	tracing::debug!(sequence = group.sequence(), frames = count, "decoded group");

	Ok(messages)
}
