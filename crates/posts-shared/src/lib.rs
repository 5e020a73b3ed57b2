//! # Posts Shared
//!
//! Wire types shared between the HTTP layer and its clients.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
