//! Field declarations

use crate::processor::{AssetProcessor, GenericProcessor};
use crate::resolver::check_field_name;
use satchel_core::{Result, SatchelError};
use std::fmt;
use std::sync::Arc;

/// Static declaration of one asset field: its name and the processor that
/// handles uploads to it. Shared by every entity of the declaring type.
#[derive(Clone)]
pub struct AssetDescriptor {
    name: String,
    processor: Arc<dyn AssetProcessor>,
}

impl AssetDescriptor {
    pub fn new<P: AssetProcessor + 'static>(name: &str, processor: P) -> Result<Self> {
        Self::with_processor(name, Arc::new(processor))
    }

    /// A field stored byte-for-byte
    pub fn generic(name: &str) -> Result<Self> {
        Self::new(name, GenericProcessor)
    }

    pub fn with_processor(name: &str, processor: Arc<dyn AssetProcessor>) -> Result<Self> {
        check_field_name(name).map_err(|_| {
            SatchelError::Configuration(format!(
                "Invalid field name '{}': must be non-empty, without '.', '/' or a leading dot",
                name
            ))
        })?;
        Ok(Self {
            name: name.to_string(),
            processor,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn processor(&self) -> &dyn AssetProcessor {
        self.processor.as_ref()
    }

    /// Resolve deferred processor configuration
    pub fn resolve(&self) -> Result<()> {
        self.processor.resolve()
    }
}

impl fmt::Debug for AssetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetDescriptor")
            .field("name", &self.name)
            .field("processor", &self.processor.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_descriptor() {
        let d = AssetDescriptor::generic("attachment").unwrap();
        assert_eq!(d.name(), "attachment");
        assert_eq!(d.processor().name(), "generic");
        d.resolve().unwrap();
    }

    #[test]
    fn test_invalid_names_are_configuration_errors() {
        for name in ["", "a.b", "a/b", ".hidden"] {
            let err = AssetDescriptor::generic(name).unwrap_err();
            assert!(matches!(err, SatchelError::Configuration(_)), "{}", name);
        }
    }
}
