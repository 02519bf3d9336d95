//! Platform builds: load a board package and create its platform instance.

use omcfg_core::{path, NodeId, Record, Value};
use omcfg_module::{create, validate_module, BuildContext, ModuleId};
use tracing::{info, warn};

use crate::cpu::CpuConfig;
use crate::definition::PlatformDefinition;
use crate::error::{PlatformError, Result};
use crate::packages::{platform_loader, BUILTIN_PACKAGES};
use crate::parse::validate_platform;

/// Per-build replacements for the board's section defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryOverrides {
    pub code_memory: Option<String>,
    pub data_memory: Option<String>,
    pub stack_memory: Option<String>,
}

impl MemoryOverrides {
    fn to_params(&self) -> Record {
        let mut params = Record::new();
        let fields = [
            ("codeMemory", &self.code_memory),
            ("dataMemory", &self.data_memory),
            ("stackMemory", &self.stack_memory),
        ];
        for (field, value) in fields {
            if let Some(v) = value {
                params.set(field, v.as_str());
            }
        }
        params
    }
}

/// A finished platform build.
#[derive(Debug)]
pub struct PlatformBuild {
    ctx: BuildContext,
    module: ModuleId,
    board: NodeId,
}

impl PlatformBuild {
    pub fn ctx(&self) -> &BuildContext {
        &self.ctx
    }

    /// The board package's `Platform` module.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// The platform instance created for this build.
    pub fn board(&self) -> NodeId {
        self.board
    }

    pub fn cpu_config(&self) -> Result<CpuConfig> {
        CpuConfig::extract(&self.ctx, self.board)
    }

    pub fn into_context(self) -> BuildContext {
        self.ctx
    }
}

/// Build the board package `def` describes, validate its module and create
/// one platform instance named after the board.
pub fn build_platform(def: &PlatformDefinition, overrides: &MemoryOverrides) -> Result<PlatformBuild> {
    if BUILTIN_PACKAGES.contains(&def.package.as_str()) {
        return Err(PlatformError::Validation {
            detail: format!("package '{}' is reserved", def.package),
        });
    }
    let mut errors = Vec::new();
    for issue in validate_platform(def) {
        if issue.is_error() {
            errors.push(issue.message);
        } else {
            warn!(platform = %def.name, "{}", issue.message);
        }
    }
    if !errors.is_empty() {
        return Err(PlatformError::Validation {
            detail: errors.join("; "),
        });
    }

    let loader = platform_loader(def);
    let mut ctx = BuildContext::new();
    loader.load(&mut ctx, &def.package)?;
    let module = ctx.find_module_strict(&path::join(&def.package, "Platform"))?;
    validate_module(&mut ctx, module)?;
    let board = create(
        &mut ctx,
        module,
        &def.name,
        Value::Undef,
        Some(&overrides.to_params()),
    )?;
    info!(
        platform = %def.name,
        bindings = ctx.om().binding_count(),
        "platform built"
    );
    Ok(PlatformBuild { ctx, module, board })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_carry_what_was_given() {
        let overrides = MemoryOverrides {
            code_memory: Some("DDR3".into()),
            ..Default::default()
        };
        let params = overrides.to_params();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("codeMemory"), Some(&Value::from("DDR3")));
    }

    #[test]
    fn reserved_package_names_are_rejected() {
        let mut def = PlatformDefinition::evm6678();
        def.package = "xdc.platform".into();
        let err = build_platform(&def, &MemoryOverrides::default()).unwrap_err();
        assert!(matches!(err, PlatformError::Validation { ref detail } if detail.contains("reserved")));
    }

    #[test]
    fn invalid_definitions_do_not_build() {
        let mut def = PlatformDefinition::evm6678();
        def.memory_map.clear();
        assert!(matches!(
            build_platform(&def, &MemoryOverrides::default()),
            Err(PlatformError::Validation { .. })
        ));
    }
}
