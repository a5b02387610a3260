//! Attach command

use crate::config::SatchelConfig;
use anyhow::{Context, Result};
use satchel_asset::{AssetSource, Metadata, Record};

pub struct AttachArgs {
    pub entity_type: String,
    pub id: String,
    pub field: String,
    /// File or directory path, or `-` for stdin
    pub source: String,
    pub meta: Vec<String>,
    pub ext: Option<String>,
}

pub fn run(config: &SatchelConfig, args: AttachArgs) -> Result<()> {
    let record = Record::new(config.entity_type(&args.entity_type)?, &args.id);
    let metadata = parse_meta(&args.meta)?;
    let source = source_for(&args.source, args.ext.as_deref());

    let commit = config
        .context()
        .assign(&record, &args.field, source, metadata)
        .with_context(|| {
            format!(
                "Failed to attach to {}/{}.{}",
                args.entity_type, args.id, args.field
            )
        })?;

    if let Some(err) = &commit.stale_cleanup {
        eprintln!("Warning: {}", err);
    }

    let instance = &commit.instance;
    match instance.path() {
        Some(path) => println!(
            "Attached {}/{}.{}: {}",
            args.entity_type,
            args.id,
            args.field,
            path.display()
        ),
        None => println!("Attached {}/{}.{}", args.entity_type, args.id, args.field),
    }
    for (key, value) in instance.metadata().iter() {
        println!("  {} = {}", key, value);
    }
    Ok(())
}

fn source_for(arg: &str, ext: Option<&str>) -> AssetSource {
    let source = if arg == "-" {
        AssetSource::stream(std::io::stdin())
    } else {
        AssetSource::path(arg)
    };
    match ext {
        Some(ext) => source.with_extension(ext),
        None => source,
    }
}

/// `key=value` pairs; no pairs means no explicit metadata
fn parse_meta(pairs: &[String]) -> Result<Option<Metadata>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut metadata = Metadata::new();
    for pair in pairs {
        let (key, value) = Metadata::parse_pair(pair)
            .with_context(|| format!("Invalid metadata '{}', expected key=value", pair))?;
        metadata.try_insert(key, value)?;
    }
    Ok(Some(metadata))
}
