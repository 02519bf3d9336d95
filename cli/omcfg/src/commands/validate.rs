//! `omcfg validate`: check a `.platform.toml` file, then try building it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use omcfg_platform::parse::{load_platform_toml, validate_platform, ValidationIssue};
use omcfg_platform::{build_platform, MemoryOverrides};

pub fn run(file: &Path) -> Result<()> {
    let (issues, summary) = check(file)?;
    for issue in &issues {
        println!("{}: {}", issue.severity, issue.message);
    }
    match summary {
        Some(summary) => {
            println!("{summary}");
            Ok(())
        }
        None => bail!(
            "{} has {} error(s)",
            file.display(),
            issues.iter().filter(|i| i.is_error()).count()
        ),
    }
}

/// Validate the definition in `file`. Returns the issues found and, when
/// none is an error and the platform builds, a one-line summary.
pub fn check(file: &Path) -> Result<(Vec<ValidationIssue>, Option<String>)> {
    let def = load_platform_toml(file).with_context(|| format!("failed to load {}", file.display()))?;
    let issues = validate_platform(&def);
    if issues.iter().any(ValidationIssue::is_error) {
        return Ok((issues, None));
    }
    let cpu = build_platform(&def, &MemoryOverrides::default())
        .and_then(|b| b.cpu_config())
        .with_context(|| format!("{} validates but does not build", file.display()))?;
    let summary = format!(
        "ok: {} ({}, {} regions, fingerprint {})",
        def.name,
        cpu.device_name,
        cpu.memory_map.len(),
        &cpu.fingerprint()?[..12]
    );
    Ok((issues, Some(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use omcfg_platform::parse::platform_to_toml;
    use omcfg_platform::PlatformDefinition;

    fn write(def: &PlatformDefinition) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{}.platform.toml", def.name));
        std::fs::write(&path, platform_to_toml(def).unwrap()).unwrap();
        (dir, path)
    }

    #[test]
    fn valid_file() {
        let (_dir, path) = write(&PlatformDefinition::evm6678());
        let (issues, summary) = check(&path).unwrap();
        assert!(issues.is_empty());
        assert!(summary.unwrap().starts_with("ok: evm6678 (TMS320C6678, 9 regions"));
    }

    #[test]
    fn errors_stop_before_the_build() {
        let mut def = PlatformDefinition::evm6678();
        def.memory_map[1].name = "L2SRAM0".into();
        let (_dir, path) = write(&def);
        let (issues, summary) = check(&path).unwrap();
        assert!(summary.is_none());
        assert!(issues.iter().any(|i| i.message.contains("declared twice")));
        assert!(run(&path).is_err());
    }

    #[test]
    fn warnings_that_break_the_build_are_reported() {
        let mut def = PlatformDefinition::evm6678();
        def.code_memory = "IRAM".into();
        let (_dir, path) = write(&def);
        let err = check(&path).unwrap_err();
        assert!(format!("{err:#}").contains("does not build"));
    }
}
