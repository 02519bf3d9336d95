//! Typed view of a built platform's CPU configuration.
//!
//! The build leaves its result as a sealed graph of registry nodes. Code
//! generators downstream want plain data, so [`CpuConfig::extract`] walks
//! from a board instance to its module's `CPU` instance and copies the
//! fields out.

use std::fmt;

use omcfg_core::hash::{content_hash, hash_hex};
use omcfg_core::{NodeId, ObjectModel, Value, ValueMap};
use omcfg_module::BuildContext;
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};

/// A named memory region in the CPU's address space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MemoryRegion {
    pub name: String,
    /// Base address.
    pub base: u32,
    /// Length in bytes.
    pub len: u32,
}

impl MemoryRegion {
    pub fn new(name: impl Into<String>, base: u32, len: u32) -> Self {
        Self {
            name: name.into(),
            base,
            len,
        }
    }

    /// One past the last address, or `None` if the region wraps the
    /// 32-bit address space.
    pub fn end(&self) -> Option<u64> {
        let end = u64::from(self.base) + u64::from(self.len);
        (end <= 1 << 32).then_some(end)
    }

    /// The region as an `IPlatform.Memory` record.
    pub fn to_value(&self) -> Value {
        omcfg_core::Record::new()
            .with("name", self.name.as_str())
            .with("base", self.base)
            .with("len", self.len)
            .into()
    }
}

/// CPU configuration of a built platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CpuConfig {
    /// Board instance name.
    pub platform: String,
    pub device_name: String,
    pub catalog_name: String,
    /// Clock rate in MHz.
    pub clock_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1p_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1d_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_mode: Option<String>,
    pub code_memory: String,
    pub data_memory: String,
    pub stack_memory: String,
    pub memory_map: Vec<MemoryRegion>,
}

impl CpuConfig {
    /// Read the configuration of board instance `board` out of the registry.
    pub fn extract(ctx: &BuildContext, board: NodeId) -> Result<Self> {
        let om = ctx.om();
        let module = node_field(om, board, "$module")?;
        let cpu = node_field(om, module, "CPU")?;
        let platform = match om.get(board, "$args").and_then(Value::as_record) {
            Some(args) => args.get("name").and_then(Value::as_str).unwrap_or_default(),
            None => "",
        }
        .to_string();

        Ok(Self {
            platform,
            device_name: str_field(om, cpu, "deviceName")?,
            catalog_name: str_field(om, cpu, "catalogName")?,
            clock_rate: u32_field(om, cpu, "clockRate")?,
            l1p_mode: opt_str_field(om, cpu, "l1PMode"),
            l1d_mode: opt_str_field(om, cpu, "l1DMode"),
            l2_mode: opt_str_field(om, cpu, "l2Mode"),
            code_memory: str_field(om, board, "codeMemory")?,
            data_memory: str_field(om, board, "dataMemory")?,
            stack_memory: str_field(om, board, "stackMemory")?,
            memory_map: regions(om, cpu, "memoryMap")?,
        })
    }

    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.memory_map.iter().find(|r| r.name == name)
    }

    /// SHA-256 of the JSON form, in hex.
    pub fn fingerprint(&self) -> Result<String> {
        Ok(hash_hex(&content_hash(self)?))
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for CpuConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "platform:  {}", self.platform)?;
        writeln!(f, "device:    {} ({})", self.device_name, self.catalog_name)?;
        writeln!(f, "clock:     {} MHz", self.clock_rate)?;
        let modes = [
            ("l1P", &self.l1p_mode),
            ("l1D", &self.l1d_mode),
            ("l2", &self.l2_mode),
        ];
        for (cache, mode) in modes {
            if let Some(mode) = mode {
                writeln!(f, "{:<10} {mode}", format!("{cache}:"))?;
            }
        }
        writeln!(f, "code:      {}", self.code_memory)?;
        writeln!(f, "data:      {}", self.data_memory)?;
        writeln!(f, "stack:     {}", self.stack_memory)?;
        writeln!(f, "memory map:")?;
        for r in &self.memory_map {
            writeln!(f, "  {:<18} 0x{:08X}  0x{:08X}", r.name, r.base, r.len)?;
        }
        Ok(())
    }
}

/// Convert an `IPlatform.MemoryMap` value into regions, in map order.
pub fn regions_from_map(owner: &str, map: &ValueMap) -> Result<Vec<MemoryRegion>> {
    map.iter()
        .map(|(key, entry)| {
            let path = format!("{owner}.memoryMap[{key}]");
            let rec = entry.as_record().ok_or_else(|| PlatformError::Extraction {
                path: path.clone(),
                detail: format!("expected a Memory record, found {}", entry.kind_name()),
            })?;
            let num = |field: &str| -> Result<u32> {
                let n = rec.get(field).and_then(Value::as_num).ok_or_else(|| {
                    PlatformError::Extraction {
                        path: format!("{path}.{field}"),
                        detail: "missing or not a number".to_string(),
                    }
                })?;
                u32::try_from(n).map_err(|_| PlatformError::Extraction {
                    path: format!("{path}.{field}"),
                    detail: format!("{n} does not fit in 32 bits"),
                })
            };
            Ok(MemoryRegion::new(key, num("base")?, num("len")?))
        })
        .collect()
}

fn missing(om: &ObjectModel, node: NodeId, field: &str, detail: &str) -> PlatformError {
    PlatformError::Extraction {
        path: format!("{}.{field}", om.node(node).name()),
        detail: detail.to_string(),
    }
}

fn node_field(om: &ObjectModel, node: NodeId, field: &str) -> Result<NodeId> {
    om.get(node, field)
        .and_then(Value::as_node)
        .ok_or_else(|| missing(om, node, field, "not bound to a node"))
}

fn str_field(om: &ObjectModel, node: NodeId, field: &str) -> Result<String> {
    opt_str_field(om, node, field).ok_or_else(|| missing(om, node, field, "not a string"))
}

fn opt_str_field(om: &ObjectModel, node: NodeId, field: &str) -> Option<String> {
    om.get(node, field).and_then(Value::as_str).map(str::to_string)
}

fn u32_field(om: &ObjectModel, node: NodeId, field: &str) -> Result<u32> {
    let n = om
        .get(node, field)
        .and_then(Value::as_num)
        .ok_or_else(|| missing(om, node, field, "not a number"))?;
    u32::try_from(n).map_err(|_| missing(om, node, field, "out of range"))
}

fn regions(om: &ObjectModel, node: NodeId, field: &str) -> Result<Vec<MemoryRegion>> {
    let map = om
        .get(node, field)
        .and_then(Value::as_map)
        .ok_or_else(|| missing(om, node, field, "not a memory map"))?;
    regions_from_map(om.node(node).name(), map)
}
