//! Request and response model shared by delegates and the cache layer.

pub mod request;
pub mod response;

pub use request::Request;
pub use response::{DecodedBody, LiveBody, Provenance, Response, declared_charset};
