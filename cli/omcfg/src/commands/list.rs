//! `omcfg list`: built-in platforms and platform files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use omcfg_platform::parse::{discover_platforms, load_platform_toml};
use omcfg_platform::PlatformDefinition;

/// One line of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub package: String,
    pub origin: Option<PathBuf>,
}

pub fn run(dir: Option<&Path>) -> Result<()> {
    let entries = collect(dir)?;
    println!("Platforms:");
    println!();
    for e in &entries {
        match &e.origin {
            Some(path) => println!("  {:<16} {:<24} {}", e.name, e.package, path.display()),
            None => println!("  {:<16} {:<24} built-in", e.name, e.package),
        }
    }
    println!();
    println!("Use 'omcfg build --platform <name>' or 'omcfg build --file <path>'.");
    Ok(())
}

pub fn collect(dir: Option<&Path>) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = PlatformDefinition::builtins()
        .into_iter()
        .map(|d| Entry {
            name: d.name,
            package: d.package,
            origin: None,
        })
        .collect();
    if let Some(dir) = dir {
        let found = discover_platforms(dir)
            .with_context(|| format!("failed to search {}", dir.display()))?;
        for (name, path) in found {
            // An unreadable file is still listed, under its file name.
            let package = match load_platform_toml(&path) {
                Ok(def) => def.package,
                Err(e) => {
                    tracing::warn!(file = %path.display(), "unreadable platform file: {e}");
                    "?".to_string()
                }
            };
            entries.push(Entry {
                name,
                package,
                origin: Some(path),
            });
        }
    }
    Ok(entries)
}
