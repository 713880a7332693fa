//! Scene serialization codec.
//!
//! [`serialize`] flattens a [`DisplayPayload`](weft_api_core::DisplayPayload)
//! into a JSON-safe [`SerializedDisplay`] plus a list of [`TransferBuffer`]s
//! holding fresh little-endian copies of every attribute array. The flat
//! description refers to buffers by index. [`deserialize`] rebuilds an equal
//! payload from both halves.

mod buffer;
mod decode;
mod encode;
mod error;
mod flat;

pub use buffer::TransferBuffer;
pub use decode::deserialize;
pub use encode::serialize;
pub use error::CodecError;
pub use flat::{
    FlatAttribute, FlatGeometry, FlatNode, FlatNodeKind, FlatOverlay, FlatTransform,
    SerializedDisplay,
};
