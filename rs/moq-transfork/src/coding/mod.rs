//! Encoding and decoding of the wire format, plus async stream adapters.
mod decode;
mod encode;
mod reader;
mod stream;
mod varint;
mod version;
mod writer;

pub use decode::*;
pub use encode::*;
pub use reader::*;
pub use stream::*;
pub use varint::*;
pub use version::*;
pub use writer::*;
