//! Show the asset fields of one entity

use crate::config::SatchelConfig;
use anyhow::{bail, Result};
use satchel_asset::{AssetInstance, Entity, Metadata, Record, StorageContext};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct FieldReport {
    field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension: Option<String>,
    directory: bool,
    metadata: Metadata,
}

impl From<&AssetInstance> for FieldReport {
    fn from(instance: &AssetInstance) -> Self {
        Self {
            field: instance.field().to_string(),
            path: instance.path().map(|p| p.display().to_string()),
            extension: instance.extension().map(str::to_string),
            directory: instance.is_dir(),
            metadata: instance.metadata().clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EntityReport {
    entity: String,
    fields: Vec<FieldReport>,
}

/// Every declared field, bound or not, in declaration order
fn report(ctx: &StorageContext, record: &Record) -> Result<EntityReport> {
    let mut fields = Vec::new();
    for descriptor in record.entity_type().fields() {
        let instance = ctx.instance(record, descriptor.name())?;
        fields.push(FieldReport::from(&instance));
    }
    Ok(EntityReport {
        entity: record.entity_ref().to_string(),
        fields,
    })
}

pub fn run(config: &SatchelConfig, entity_type: &str, id: &str, format: &str) -> Result<()> {
    let record = Record::new(config.entity_type(entity_type)?, id);
    let report = report(&config.context(), &record)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "toml" => print!("{}", toml::to_string_pretty(&report)?),
        other => bail!("Unknown format '{}'. Use: toml, json", other),
    }
    Ok(())
}
