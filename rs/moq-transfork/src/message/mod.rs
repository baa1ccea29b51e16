//! The wire messages for the protocol.
//!
//! Each bidirectional stream starts with a [StreamBi] type followed by the opening message.
//! Each unidirectional stream starts with a [StreamUni] type followed by a [Group] header and [Frame]s.
//!
//! | stream | opened by | messages |
//! |---|---|---|
//! | [StreamBi::Session] | client | [SessionClient] → [SessionServer], [SessionInfo]* |
//! | [StreamBi::Announce] | publisher | [Announce] → [AnnounceOk] |
//! | [StreamBi::Subscribe] | subscriber | [Subscribe], [SubscribeUpdate]* → [Info], [GroupDrop]* |
//! | [StreamBi::Datagrams] | subscriber | same as [StreamBi::Subscribe] |
//! | [StreamBi::Fetch] | subscriber | [Fetch], [FetchUpdate]* → [Group], [Frame]* |
//! | [StreamBi::Info] | subscriber | [InfoRequest] → [Info] |
//! | [StreamUni::Group] | publisher | [Group], [Frame]* |

mod announce;
mod extensions;
mod fetch;
mod group;
mod info;
mod session;
mod stream;
mod subscribe;

pub use announce::*;
pub use extensions::*;
pub use fetch::*;
pub use group::*;
pub use info::*;
pub use session::*;
pub use stream::*;
pub use subscribe::*;
