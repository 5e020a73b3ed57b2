//! # Posts Core
//!
//! The domain layer of the posts service.
//! This crate contains the `Post` entity, its validation rules and the
//! repository port, with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{FieldError, RepoError, ValidationErrors};
