//! Satchel Core - Foundational types for Satchel asset storage
//!
//! This crate provides the types that all other Satchel crates depend on:
//! - `EntityRef` - (entity type, entity id) addressing
//! - `Metadata` - scalar key/value metadata for stored assets
//! - Error types and Result alias

mod error;
mod id;
mod metadata;

pub use error::{Result, SatchelError};
pub use id::EntityRef;
pub use metadata::{is_scalar, Metadata, Scalar};
