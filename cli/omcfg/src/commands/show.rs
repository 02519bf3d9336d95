//! `omcfg show`: what a dotted path resolves to after a build.
//!
//! Registry paths resolve directly. Anything else is read as a field chain
//! off the longest bound prefix, so `platform.evm6678.Platform.CPU.clockRate`
//! works even though only `platform.evm6678.Platform` is bound.

use std::fmt::Write;

use anyhow::{bail, Context, Result};
use omcfg_core::{path, Binding, ObjectModel, Prototype, Value};
use omcfg_platform::{build_platform, MemoryOverrides};

use super::PlatformSource;

pub fn run(source: &PlatformSource, dotted: &str) -> Result<()> {
    let def = source.resolve()?;
    let build = build_platform(&def, &MemoryOverrides::default())
        .with_context(|| format!("failed to build platform '{}'", def.name))?;
    print!("{}", describe(build.ctx().om(), dotted)?);
    Ok(())
}

pub fn describe(om: &ObjectModel, dotted: &str) -> Result<String> {
    let Some(binding) = lookup(om, dotted) else {
        bail!("'{dotted}' does not resolve to anything");
    };
    let mut out = String::new();
    match binding {
        Binding::Node(id) => {
            let node = om.node(id);
            writeln!(out, "{dotted}: {}", node.name())?;
            if node.is_blessed() {
                writeln!(out, "  (sealed)")?;
            }
            for (key, value) in node.attrs().iter() {
                writeln!(out, "  {key} = {}", render(om, value))?;
            }
        }
        Binding::Proto(id) => {
            writeln!(out, "{dotted}: {} {}", om.proto(id).kind_name(), om.describe(id))?;
            if let Prototype::Struct(_) = om.proto(id) {
                for f in om.fields(id)? {
                    writeln!(
                        out,
                        "  {}: {} = {} [{}]",
                        f.name,
                        om.describe(f.ty),
                        render(om, &f.default),
                        f.mode
                    )?;
                }
            }
        }
        Binding::Value(v) => writeln!(out, "{dotted} = {}", render(om, &v))?,
    }
    Ok(out)
}

/// Resolve `dotted` as a registry path, or as a field of whatever its
/// parent resolves to.
fn lookup(om: &ObjectModel, dotted: &str) -> Option<Binding> {
    if let Some(b) = om.find(dotted, None) {
        return Some(b.clone());
    }
    let (parent, field) = path::split_last(dotted);
    let value = match lookup(om, parent?)? {
        Binding::Node(n) | Binding::Value(Value::Node(n)) => om.get(n, field)?.clone(),
        Binding::Value(Value::Record(r)) => r.get(field)?.clone(),
        Binding::Value(Value::Map(m)) => m.get(field)?.clone(),
        _ => return None,
    };
    Some(match value {
        Value::Node(n) => Binding::Node(n),
        other => Binding::Value(other),
    })
}

/// Like `Value`'s `Display`, but with node and prototype names spelled out.
fn render(om: &ObjectModel, value: &Value) -> String {
    match value {
        Value::Node(n) => om.node(*n).name().to_string(),
        Value::Proto(p) => om.describe(*p),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(|v| render(om, v)).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evm_om() -> ObjectModel {
        let def = omcfg_platform::PlatformDefinition::evm6678();
        let build = build_platform(&def, &MemoryOverrides::default()).unwrap();
        build.into_context().om().clone()
    }

    #[test]
    fn module_node() {
        let out = describe(&evm_om(), "platform.evm6678.Platform").unwrap();
        assert!(out.starts_with("platform.evm6678.Platform: platform.evm6678.Platform\n"));
        assert!(out.contains("(sealed)"));
        assert!(out.contains("$$inherits = [\"xdc.platform\"]"));
        assert!(out.contains("CPU = ti.platforms.generic.Platform.Instance#0"));
    }

    #[test]
    fn field_chains() {
        let om = evm_om();
        let out = describe(&om, "platform.evm6678.Platform.CPU.clockRate").unwrap();
        assert_eq!(out, "platform.evm6678.Platform.CPU.clockRate = 1000\n");
        let out = describe(&om, "platform.evm6678.Platform.PARAMS.stackMemory").unwrap();
        assert_eq!(out, "platform.evm6678.Platform.PARAMS.stackMemory = \"L2SRAM1\"\n");
        let out = describe(&om, "platform.evm6678.Platform.CPU.memoryMap.DDR3_STATIC.base").unwrap();
        assert!(out.ends_with(&format!("= {}\n", 0xBEF0_0000u32)));
    }

    #[test]
    fn prototypes_list_their_fields() {
        let out = describe(&evm_om(), "xdc.platform.IPlatform.Memory").unwrap();
        assert!(out.starts_with("xdc.platform.IPlatform.Memory: struct type"));
        assert!(out.contains("  base: Num = undefined [w]"));
    }

    #[test]
    fn unresolved_paths_fail() {
        let om = evm_om();
        assert!(describe(&om, "platform.evm6678.Nothing").is_err());
        assert!(describe(&om, "nowhere").is_err());
    }
}
