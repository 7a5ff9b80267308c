//! Protocol module containing message types and the text codec.

pub mod codec;
pub mod messages;

pub use codec::{
    contains_marker, decode_announce, decode_reply, encode_announce, encode_reply,
    extract_fragment, ProtocolError,
};
pub use messages::*;
