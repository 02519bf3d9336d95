//! `omcfg build`: build a platform and print its CPU configuration.

use anyhow::{Context, Result};
use clap::ValueEnum;
use omcfg_platform::{build_platform, CpuConfig, MemoryOverrides};

use super::PlatformSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Toml,
    Json,
}

pub fn run(source: &PlatformSource, overrides: &MemoryOverrides, format: OutputFormat) -> Result<()> {
    let cpu = build(source, overrides)?;
    print!("{}", render(&cpu, format)?);
    Ok(())
}

/// Build the platform and read its CPU configuration back.
pub fn build(source: &PlatformSource, overrides: &MemoryOverrides) -> Result<CpuConfig> {
    let def = source.resolve()?;
    let build = build_platform(&def, overrides)
        .with_context(|| format!("failed to build platform '{}'", def.name))?;
    let cpu = build
        .cpu_config()
        .context("failed to read the CPU configuration")?;
    Ok(cpu)
}

pub fn render(cpu: &CpuConfig, format: OutputFormat) -> Result<String> {
    let out = match format {
        OutputFormat::Text => format!("{cpu}fingerprint: {}\n", cpu.fingerprint()?),
        OutputFormat::Toml => cpu.to_toml()?,
        OutputFormat::Json => format!("{}\n", cpu.to_json()?),
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_default_platform() {
        let cpu = build(&PlatformSource::default(), &MemoryOverrides::default()).unwrap();
        assert_eq!(cpu.device_name, "TMS320C6678");
        assert_eq!(cpu.memory_map.len(), 9);
    }

    #[test]
    fn bad_override_reports_the_platform() {
        let overrides = MemoryOverrides {
            code_memory: Some("NOWHERE".into()),
            ..Default::default()
        };
        let err = build(&PlatformSource::default(), &overrides).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("failed to build platform 'evm6678'"));
        assert!(msg.contains("NOWHERE"));
    }

    #[test]
    fn every_format_renders() {
        let cpu = build(&PlatformSource::default(), &MemoryOverrides::default()).unwrap();
        let text = render(&cpu, OutputFormat::Text).unwrap();
        assert!(text.contains("DDR3_STATIC"));
        assert!(text.contains("fingerprint: "));
        let toml_str = render(&cpu, OutputFormat::Toml).unwrap();
        assert!(toml_str.contains("clock-rate = 1000"));
        let json = render(&cpu, OutputFormat::Json).unwrap();
        assert!(json.contains("\"catalog-name\": \"ti.catalog.c6000\""));
    }

    #[test]
    fn builds_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsk.platform.toml");
        let template = omcfg_platform::parse::generate_template("dsk").unwrap();
        std::fs::write(&path, template).unwrap();
        let cpu = build(&PlatformSource::File(path), &MemoryOverrides::default()).unwrap();
        assert_eq!(cpu.platform, "dsk");
    }
}
