//! Application-layer use cases for the responder.

pub mod track_peers;
