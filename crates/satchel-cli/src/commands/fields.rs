//! Declared entity types and their fields

use crate::config::{FieldConfig, SatchelConfig};
use anyhow::Result;

pub fn run(config: &SatchelConfig) -> Result<()> {
    if config.entities.is_empty() {
        println!("No entity types declared");
        return Ok(());
    }

    println!("Storage root: {}", config.storage_root.display());
    println!("Metadata root: {}", config.metadata_root.display());
    for (name, entity) in &config.entities {
        println!();
        println!("{}:", name);
        for (field, field_config) in &entity.fields {
            match field_config {
                FieldConfig::Generic => println!("  {} : generic", field),
                FieldConfig::Image(options) => {
                    print!("  {} : image", field);
                    if let Some((w, h)) = options.size {
                        print!(" {}x{}", w, h);
                    } else if let Some(w) = options.width {
                        print!(" width {}", w);
                    } else if let Some(h) = options.height {
                        print!(" height {}", h);
                    }
                    println!(" ({})", options.transform);
                }
            }
        }
    }
    Ok(())
}
