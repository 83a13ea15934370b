//! Minimal typed HTTP request/response surface used by the router,
//! middleware chain, and handlers.

pub mod request;
pub mod response;

pub use request::Request;
pub use response::Response;
