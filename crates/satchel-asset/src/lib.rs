//! Satchel Asset - Entity-attached asset storage
//!
//! This crate stores files and directories against (entity type, entity id,
//! field) keys, runs uploads through pluggable processors, and commits them
//! so a field never ends up half-written.

mod catalog;
mod descriptor;
mod entity;
pub mod fsops;
mod instance;
mod lazy;
mod processor;
mod resolver;
mod source;
mod store;

pub use catalog::{MemoryStore, MetadataStore, SidecarStore};
pub use descriptor::AssetDescriptor;
pub use entity::{Entity, EntityType, Record};
pub use instance::{AssetInstance, AssetState};
pub use lazy::{Initializer, LazyConfig};
pub use processor::{AssetProcessor, Finalizer, GenericProcessor, Staged};
pub use resolver::{extension_of, file_name, PathResolver};
pub use source::AssetSource;
pub use store::{Commit, StorageContext};

pub use satchel_core::{EntityRef, Metadata, Result, SatchelError};
