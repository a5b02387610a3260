//! Detach command

use crate::config::SatchelConfig;
use anyhow::{Context, Result};
use satchel_asset::Record;

pub fn run(config: &SatchelConfig, entity_type: &str, id: &str, field: &str) -> Result<()> {
    let record = Record::new(config.entity_type(entity_type)?, id);
    let ctx = config.context();

    let current = ctx.instance(&record, field)?;
    if current.is_none() {
        println!("{}/{}.{} has no asset", entity_type, id, field);
        return Ok(());
    }

    ctx.delete(&record, field)
        .with_context(|| format!("Failed to detach {}/{}.{}", entity_type, id, field))?;
    println!("Detached {}/{}.{}", entity_type, id, field);
    Ok(())
}
