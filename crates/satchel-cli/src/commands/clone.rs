//! Clone command

use crate::config::SatchelConfig;
use anyhow::{Context, Result};
use satchel_asset::Record;

pub fn run(config: &SatchelConfig, entity_type: &str, from: &str, to: &str) -> Result<()> {
    let ty = config.entity_type(entity_type)?;
    let source = Record::new(ty.clone(), from);
    let dest = Record::new(ty, to);

    let commits = config
        .context()
        .clone_assets(&source, &dest)
        .with_context(|| format!("Failed to clone {}/{} to {}/{}", entity_type, from, entity_type, to))?;

    if commits.is_empty() {
        println!("{}/{} has no assets to clone", entity_type, from);
        return Ok(());
    }

    println!("Cloned {} field(s) to {}/{}:", commits.len(), entity_type, to);
    for commit in &commits {
        if let Some(path) = commit.instance.path() {
            println!("  {}: {}", commit.instance.field(), path.display());
        }
        if let Some(err) = &commit.stale_cleanup {
            eprintln!("Warning: {}", err);
        }
    }
    Ok(())
}
