//! Data Transfer Objects for the JSON API.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
