//! TOML parsing, serialization, validation, and discovery for platform
//! definitions.
//!
//! Platform definitions are stored as `.platform.toml` files. Region
//! overlap is not checked: boards alias the same memory under cached and
//! uncached names.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use omcfg_core::path;

use crate::definition::PlatformDefinition;
use crate::error::{PlatformError, Result};

/// A validation issue found in a platform definition.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: "error",
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: "warning",
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == "error"
    }
}

/// Load a platform definition from a `.platform.toml` file.
pub fn load_platform_toml(path: &Path) -> Result<PlatformDefinition> {
    if !path.exists() {
        return Err(PlatformError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_platform_toml(&content)
}

/// Parse a platform definition from a TOML string.
pub fn parse_platform_toml(toml_str: &str) -> Result<PlatformDefinition> {
    let def: PlatformDefinition = toml::from_str(toml_str)?;
    Ok(def)
}

/// Serialize a platform definition to pretty TOML.
pub fn platform_to_toml(def: &PlatformDefinition) -> Result<String> {
    Ok(toml::to_string_pretty(def)?)
}

/// Check a platform definition for structural problems.
///
/// Returns every issue found, warnings included; the definition is usable
/// when none of them is an error.
pub fn validate_platform(def: &PlatformDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    // 1. Names
    if def.name.is_empty() {
        issues.push(ValidationIssue::error("platform name is empty"));
    }
    if !path::is_well_formed(&def.package) {
        issues.push(ValidationIssue::error(format!(
            "package '{}' is not a dotted name",
            def.package
        )));
    }
    if def.device_name.is_empty() || def.catalog_name.is_empty() {
        issues.push(ValidationIssue::error("device-name and catalog-name are required"));
    }

    // 2. Clock
    if def.clock_rate == 0 {
        issues.push(ValidationIssue::error("clock-rate must be non-zero"));
    }

    // 3. Memory map
    if def.memory_map.is_empty() {
        issues.push(ValidationIssue::error("memory map is empty"));
    }
    let mut seen = HashSet::new();
    for r in &def.memory_map {
        if r.name.is_empty() {
            issues.push(ValidationIssue::error(format!(
                "memory region at 0x{:08X} has no name",
                r.base
            )));
        } else if !seen.insert(r.name.as_str()) {
            issues.push(ValidationIssue::error(format!(
                "memory region '{}' is declared twice",
                r.name
            )));
        }
        if r.len == 0 {
            issues.push(ValidationIssue::error(format!(
                "memory region '{}' has zero length",
                r.name
            )));
        }
        if r.end().is_none() {
            issues.push(ValidationIssue::error(format!(
                "memory region '{}' (0x{:08X} + 0x{:X}) runs past the 32-bit address space",
                r.name, r.base, r.len
            )));
        }
    }

    // 4. Section defaults name existing regions
    let defaults = [
        ("code-memory", &def.code_memory),
        ("data-memory", &def.data_memory),
        ("stack-memory", &def.stack_memory),
    ];
    for (key, region) in defaults {
        if def.region(region).is_none() {
            issues.push(ValidationIssue::warning(format!(
                "{key} '{region}' is not in the memory map"
            )));
        }
    }

    issues
}

/// Generate a template `.platform.toml` for a new board, seeded from the
/// evm6678 definition.
pub fn generate_template(name: &str) -> Result<String> {
    let mut def = PlatformDefinition::evm6678();
    def.package = format!("platform.{name}");
    def.name = name.into();
    def.description = String::new();
    platform_to_toml(&def)
}

/// Find all `.platform.toml` files directly under `dir`.
///
/// Returns (platform name, file path) pairs sorted by name.
pub fn discover_platforms(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".platform.toml"))
            .map(str::to_string);
        if let Some(name) = name {
            found.push((name, path));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::MemoryRegion;

    fn errors(def: &PlatformDefinition) -> Vec<String> {
        validate_platform(def)
            .into_iter()
            .filter(ValidationIssue::is_error)
            .map(|i| i.message)
            .collect()
    }

    #[test]
    fn round_trip_evm6678() {
        let original = PlatformDefinition::evm6678();
        let toml_str = platform_to_toml(&original).unwrap();
        assert_eq!(parse_platform_toml(&toml_str).unwrap(), original);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
name = "tiny"
package = "platform.tiny"
catalog-name = "ti.catalog.c6000"
device-name = "TMS320C6657"
clock-rate = 850
code-memory = "DDR3"
data-memory = "DDR3"
stack-memory = "L2SRAM"

[[memory-map]]
name = "L2SRAM"
base = 0x00800000
len = 0x100000

[[memory-map]]
name = "DDR3"
base = 0x80000000
len = 0x20000000
"#;
        let def = parse_platform_toml(toml_str).unwrap();
        assert_eq!(def.clock_rate, 850);
        assert!(def.l2_mode.is_none());
        assert_eq!(def.memory_map[1], MemoryRegion::new("DDR3", 0x8000_0000, 0x2000_0000));
        assert!(validate_platform(&def).is_empty());
    }

    #[test]
    fn parse_invalid_returns_error() {
        assert!(parse_platform_toml("this is not valid toml [[[").is_err());
        assert!(parse_platform_toml("name = \"incomplete\"").is_err());
    }

    #[test]
    fn builtin_is_valid() {
        assert!(validate_platform(&PlatformDefinition::evm6678()).is_empty());
    }

    #[test]
    fn duplicate_and_empty_regions_are_errors() {
        let mut def = PlatformDefinition::evm6678();
        def.memory_map.push(MemoryRegion::new("DDR3", 0xC000_0000, 0));
        let errs = errors(&def);
        assert!(errs.iter().any(|m| m.contains("declared twice")));
        assert!(errs.iter().any(|m| m.contains("zero length")));
    }

    #[test]
    fn wrapping_region_is_an_error() {
        let mut def = PlatformDefinition::evm6678();
        def.memory_map[8].len = 0x4100_0000;
        assert!(errors(&def).iter().any(|m| m.contains("32-bit")));
    }

    #[test]
    fn unknown_default_region_is_a_warning() {
        let mut def = PlatformDefinition::evm6678();
        def.stack_memory = "IRAM".into();
        let issues = validate_platform(&def);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, "warning");
        assert!(issues[0].message.contains("stack-memory 'IRAM'"));
    }

    #[test]
    fn overlapping_regions_are_accepted() {
        let mut def = PlatformDefinition::evm6678();
        def.memory_map.push(MemoryRegion::new("DDR3_ALIAS", 0x8000_0000, 0x1000));
        assert!(validate_platform(&def).is_empty());
    }

    #[test]
    fn bad_package_name() {
        let mut def = PlatformDefinition::evm6678();
        def.package = "platform..evm".into();
        assert!(errors(&def).iter().any(|m| m.contains("dotted name")));
    }

    #[test]
    fn generate_template_is_valid() {
        let toml_str = generate_template("evm6657").unwrap();
        let def = parse_platform_toml(&toml_str).unwrap();
        assert_eq!(def.name, "evm6657");
        assert_eq!(def.package, "platform.evm6657");
        assert!(validate_platform(&def).is_empty());
    }

    #[test]
    fn discover_finds_platform_files() {
        let dir = tempfile::tempdir().unwrap();
        let template = generate_template("board-a").unwrap();
        std::fs::write(dir.path().join("board-b.platform.toml"), &template).unwrap();
        std::fs::write(dir.path().join("board-a.platform.toml"), &template).unwrap();
        std::fs::write(dir.path().join("notes.toml"), "ignore me").unwrap();

        let found = discover_platforms(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "board-a");
        assert_eq!(found[1].0, "board-b");
        assert!(discover_platforms(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn load_not_found() {
        let result = load_platform_toml(Path::new("/nonexistent/evm.platform.toml"));
        assert!(matches!(result, Err(PlatformError::NotFound { .. })));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evm.platform.toml");
        std::fs::write(&path, platform_to_toml(&PlatformDefinition::evm6678()).unwrap()).unwrap();
        let def = load_platform_toml(&path).unwrap();
        assert_eq!(def, PlatformDefinition::evm6678());
    }
}
