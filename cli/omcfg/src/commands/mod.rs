//! CLI command implementations.

pub mod build;
pub mod list;
pub mod show;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use omcfg_platform::parse::load_platform_toml;
use omcfg_platform::PlatformDefinition;

/// Where a command takes its platform definition from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSource {
    Builtin(String),
    File(PathBuf),
}

impl Default for PlatformSource {
    fn default() -> Self {
        PlatformSource::Builtin("evm6678".to_string())
    }
}

impl PlatformSource {
    pub fn resolve(&self) -> Result<PlatformDefinition> {
        match self {
            PlatformSource::Builtin(name) => PlatformDefinition::builtin(name)
                .ok_or_else(|| omcfg_platform::PlatformError::UnknownPlatform { name: name.clone() })
                .context("use 'omcfg list' to see available platforms"),
            PlatformSource::File(path) => load_platform_toml(path)
                .with_context(|| format!("failed to load {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_source_is_evm6678() {
        let def = PlatformSource::default().resolve().unwrap();
        assert_eq!(def.package, "platform.evm6678");
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        let err = PlatformSource::Builtin("evm0000".into()).resolve().unwrap_err();
        assert!(format!("{err:#}").contains("evm0000"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = PlatformSource::File("/nonexistent/x.platform.toml".into())
            .resolve()
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to load"));
    }
}
