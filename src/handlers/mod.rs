//! One module per endpoint family (`spec.md` §4.F's endpoint-to-module
//! mapping table).

pub mod auth;
pub mod bytes;
pub mod cache;
pub mod compression;
pub mod cookies;
pub mod links;
pub mod misc;
pub mod payloads;
pub mod range;
pub mod redirect;
pub mod reflection;
pub mod status;
pub mod streaming;
pub mod websocket;
