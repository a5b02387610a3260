//! Layered configuration
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `SATCHEL_STORAGE_ROOT`, `SATCHEL_METADATA_ROOT`
//! 2. Project-local: `satchel.toml` (or the file given with `--config`)
//! 3. Global: `~/.satchel/config.toml`

use satchel_asset::{AssetDescriptor, EntityType, SidecarStore, StorageContext};
use satchel_core::{Result, SatchelError};
use satchel_image::{ImageOptions, ImageProcessor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

const DEFAULT_STORAGE_ROOT: &str = "assets";
const PROJECT_CONFIG: &str = "satchel.toml";

/// `[storage]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Where field metadata sidecars live; defaults to `<root>/.meta`
    #[serde(default)]
    pub metadata_root: Option<PathBuf>,
}

/// How a field processes what is assigned to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "processor", rename_all = "lowercase")]
pub enum FieldConfig {
    Generic,
    Image(ImageOptions),
}

/// `[entities.<type>]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SatchelConfigFile {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub entities: BTreeMap<String, EntityConfig>,
}

/// Resolved configuration with environment overrides applied
#[derive(Debug, Clone)]
pub struct SatchelConfig {
    pub storage_root: PathBuf,
    pub metadata_root: PathBuf,
    pub entities: BTreeMap<String, EntityConfig>,
}

impl SatchelConfig {
    /// Load config with layered precedence: global < project < env vars.
    ///
    /// An explicit path replaces the project layer and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = SatchelConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        match explicit {
            Some(path) => {
                let local = Self::load_file(path)?;
                Self::merge_into(&mut config, local);
            }
            None => {
                let local_path = PathBuf::from(PROJECT_CONFIG);
                if local_path.exists() {
                    let local = Self::load_file(&local_path)?;
                    Self::merge_into(&mut config, local);
                }
            }
        }

        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Load config from a specific file path only
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = Self::load_file(path)?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Apply overrides from `env` and fill in defaults.
    ///
    /// The metadata root must differ from the storage root.
    pub fn resolve<F>(mut file: SatchelConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = env("SATCHEL_STORAGE_ROOT") {
            file.storage.root = Some(PathBuf::from(root));
        }
        if let Some(root) = env("SATCHEL_METADATA_ROOT") {
            file.storage.metadata_root = Some(PathBuf::from(root));
        }

        let storage_root = file
            .storage
            .root
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT));
        let metadata_root = file
            .storage
            .metadata_root
            .unwrap_or_else(|| storage_root.join(".meta"));

        if same_dir(&storage_root, &metadata_root) {
            return Err(SatchelError::Configuration(format!(
                "metadata_root must not be the storage root ({})",
                storage_root.display()
            )));
        }

        Ok(Self {
            storage_root,
            metadata_root,
            entities: file.entities,
        })
    }

    /// Storage context over the configured roots, with sidecar metadata
    pub fn context(&self) -> StorageContext {
        StorageContext::new(&self.storage_root, SidecarStore::new(&self.metadata_root))
    }

    /// Build the declared entity type `name`.
    ///
    /// Image options are not validated here; a bad field surfaces a
    /// configuration error the first time it is used.
    pub fn entity_type(&self, name: &str) -> Result<Arc<EntityType>> {
        let entity = self.entities.get(name).ok_or_else(|| {
            SatchelError::Configuration(format!("Entity type '{}' is not declared", name))
        })?;

        let mut ty = EntityType::new(name)?;
        for (field, config) in &entity.fields {
            let descriptor = match config {
                FieldConfig::Generic => AssetDescriptor::generic(field)?,
                FieldConfig::Image(options) => {
                    let options = options.clone();
                    AssetDescriptor::new(field, ImageProcessor::lazy(move || Ok(options.clone())))?
                }
            };
            ty = ty.with_field(descriptor)?;
        }
        Ok(Arc::new(ty))
    }

    /// Every declared entity type, by name
    pub fn entity_types(&self) -> Result<Vec<Arc<EntityType>>> {
        self.entities.keys().map(|name| self.entity_type(name)).collect()
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".satchel").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<SatchelConfigFile> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SatchelError::storage(path, e))?;
        let config: SatchelConfigFile = toml::from_str(&content).map_err(|e| {
            SatchelError::Configuration(format!(
                "Failed to parse config {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    fn merge_into(base: &mut SatchelConfigFile, overlay: SatchelConfigFile) {
        if overlay.storage.root.is_some() {
            base.storage.root = overlay.storage.root;
        }
        if overlay.storage.metadata_root.is_some() {
            base.storage.metadata_root = overlay.storage.metadata_root;
        }

        // Fields merge per entity type; a redeclared field replaces the old one
        for (name, entity) in overlay.entities {
            let entry = base.entities.entry(name).or_default();
            entry.fields.extend(entity.fields);
        }
    }
}

/// Compare paths by their components, resolving links where both exist
fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => {
            fn parts(p: &Path) -> Vec<Component<'_>> {
                p.components()
                    .filter(|c| !matches!(c, Component::CurDir))
                    .collect::<Vec<_>>()
            }
            parts(a) == parts(b)
        }
    }
}
