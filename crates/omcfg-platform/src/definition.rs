//! Platform definitions: the literal CPU parameters a board package binds.
//!
//! A definition names the board package to build, the device it carries
//! and the CPU's memory map. The built-in [`PlatformDefinition::evm6678`]
//! describes the TMS320C6678 evaluation module; others are read from
//! `.platform.toml` files (see [`crate::parse`]).

use serde::{Deserialize, Serialize};

use crate::cpu::MemoryRegion;

/// A board and the CPU it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformDefinition {
    /// Short name, e.g. `evm6678`.
    pub name: String,
    /// Dotted name of the board package, e.g. `platform.evm6678`.
    pub package: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Device catalog package, e.g. `ti.catalog.c6000`.
    pub catalog_name: String,
    /// Device name within the catalog.
    pub device_name: String,
    /// CPU clock rate in MHz.
    pub clock_rate: u32,
    /// L1 program cache size mode, e.g. `32k`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1p_mode: Option<String>,
    /// L1 data cache size mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1d_mode: Option<String>,
    /// L2 cache size mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_mode: Option<String>,
    /// Default region for code sections.
    pub code_memory: String,
    /// Default region for data sections.
    pub data_memory: String,
    /// Default region for the stack.
    pub stack_memory: String,
    /// The CPU's memory map, in declaration order.
    pub memory_map: Vec<MemoryRegion>,
}

impl PlatformDefinition {
    /// TI TMS320C6678 evaluation module.
    pub fn evm6678() -> Self {
        Self {
            name: "evm6678".into(),
            package: "platform.evm6678".into(),
            description: "TMS320C6678 evaluation module".into(),
            catalog_name: "ti.catalog.c6000".into(),
            device_name: "TMS320C6678".into(),
            clock_rate: 1000,
            l1p_mode: Some("32k".into()),
            l1d_mode: Some("32k".into()),
            l2_mode: Some("128k".into()),
            code_memory: "DDR3_STATIC".into(),
            data_memory: "MSMCSRAM_NOCACHE".into(),
            stack_memory: "L2SRAM1".into(),
            memory_map: vec![
                MemoryRegion::new("L2SRAM0", 0x0080_0000, 0x80),
                MemoryRegion::new("L2SRAM1", 0x0080_0080, 0x2_bf80),
                MemoryRegion::new("L2SRAM", 0x0082_c000, 0x3_4000),
                MemoryRegion::new("MSMCSRAM", 0x0C00_0000, 0x30_0000),
                MemoryRegion::new("DDR3", 0x8000_0000, 0x3EE0_0000),
                MemoryRegion::new("MSMCSRAM_NOCACHE", 0xBEE0_0000, 0x10_0000),
                MemoryRegion::new("DDR3_STATIC", 0xBEF0_0000, 0x10_0000),
                MemoryRegion::new("DDR3_NOCACHE0", 0xBF00_0000, 0x80_0000),
                MemoryRegion::new("DDR3_NOCACHE1", 0xBF80_0000, 0x80_0000),
            ],
        }
    }

    /// Every built-in definition.
    pub fn builtins() -> Vec<Self> {
        vec![Self::evm6678()]
    }

    /// A built-in definition by short name.
    pub fn builtin(name: &str) -> Option<Self> {
        Self::builtins().into_iter().find(|d| d.name == name)
    }

    /// Capsule path of the board module, relative to the package root.
    pub fn capsule_path(&self) -> String {
        format!("{}/Platform.xs", self.package.replace('.', "/"))
    }

    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.memory_map.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm6678_table() {
        let evm = PlatformDefinition::evm6678();
        assert_eq!(evm.memory_map.len(), 9);
        assert_eq!(
            evm.region("L2SRAM1"),
            Some(&MemoryRegion::new("L2SRAM1", 0x0080_0080, 0x2bf80))
        );
        assert_eq!(
            evm.region("DDR3_STATIC"),
            Some(&MemoryRegion::new("DDR3_STATIC", 0xBEF0_0000, 0x10_0000))
        );
        for default in [&evm.code_memory, &evm.data_memory, &evm.stack_memory] {
            assert!(evm.region(default).is_some(), "{default} not in memory map");
        }
    }

    #[test]
    fn builtin_lookup() {
        assert!(PlatformDefinition::builtin("evm6678").is_some());
        assert!(PlatformDefinition::builtin("evm9999").is_none());
        assert_eq!(
            PlatformDefinition::evm6678().capsule_path(),
            "platform/evm6678/Platform.xs"
        );
    }
}
