//! Protocol layer: frame codec, JSON-RPC types, parameter adaptation, and
//! method dispatch.

pub mod codec;
pub mod dispatcher;
pub mod frame;
pub mod params;
