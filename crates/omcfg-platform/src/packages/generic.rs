//! `ti.platforms.generic`: a platform module whose instances describe a
//! single CPU.
//!
//! Instances are configured through the creation arguments rather than the
//! Params record: `instance$meta$init` copies each argument onto the
//! instance, then merges the external and custom memory maps into the
//! effective `memoryMap`.

use omcfg_core::{FieldMode, ModelError, NodeId, Record, Result, Value, ValueMap};
use omcfg_module::{
    BuildContext, Capsule, CapsuleLoader, FieldSpec, HookKind, ModuleBuilder, ModuleId,
    ModuleSchema, PackageDef, PackageId,
};
use tracing::debug;

use super::iplatform::IPLATFORM;

pub const PACKAGE: &str = "ti.platforms.generic";
pub const MODULE: &str = "ti.platforms.generic.Platform";
pub const CAPSULE: &str = "ti/platforms/generic/Platform.xs";

pub struct GenericPlatform;

impl PackageDef for GenericPlatform {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn imports(&self) -> Vec<String> {
        vec!["xdc".to_string(), "xdc.platform".to_string()]
    }

    fn declare(&self, ctx: &mut BuildContext, pkg: PackageId, capsules: &dyn CapsuleLoader) -> Result<()> {
        let mut b = ModuleBuilder::declare(ctx, pkg, "Platform", Some(IPLATFORM))?;
        b.alias("Board", &format!("{IPLATFORM}.Board"))?
            .alias("Memory", &format!("{IPLATFORM}.Memory"))?
            .alias("MemoryMap", &format!("{IPLATFORM}.MemoryMap"))?;
        b.declare_factories()?.install_capsule(capsules, CAPSULE)?;
        let schema = ModuleSchema::host()
            .instance_field(FieldSpec::num("clockRate", 0i64, FieldMode::W))
            .instance_field(FieldSpec::str("catalogName", Value::Undef, FieldMode::W))
            .instance_field(FieldSpec::str("deviceName", Value::Undef, FieldMode::W))
            .instance_field(FieldSpec::str("l1PMode", Value::Undef, FieldMode::W))
            .instance_field(FieldSpec::str("l1DMode", Value::Undef, FieldMode::W))
            .instance_field(FieldSpec::str("l2Mode", Value::Undef, FieldMode::W))
            .instance_field(FieldSpec::new(
                "memoryMap",
                format!("{IPLATFORM}.MemoryMap").as_str(),
                ValueMap::new(),
                FieldMode::WH,
            ));
        b.finish(&schema)?;
        Ok(())
    }
}

/// Hooks and query functions of the generic platform module.
pub fn capsule() -> Capsule {
    Capsule::new(CAPSULE)
        .with_instance_meta_init(init_instance)
        .with_function("getCpuDataSheet", |ctx, inst, args| {
            let om = ctx.om();
            let field = |f: &str| om.get(inst, f).cloned().unwrap_or_default();
            Ok(Record::new()
                .with("cpuId", args.first().cloned().unwrap_or_default())
                .with("catalogName", field("catalogName"))
                .with("deviceName", field("deviceName"))
                .with("clockRate", field("clockRate"))
                .into())
        })
        .with_function("getCreateArgs", |ctx, inst, _| {
            let om = ctx.om();
            let mut args = Record::new();
            for f in ["clockRate", "catalogName", "deviceName", "l1PMode", "l1DMode", "l2Mode"] {
                match om.get(inst, f) {
                    Some(Value::Undef) | None => {}
                    Some(v) => {
                        args.set(f, v.clone());
                    }
                }
            }
            if let Some(map) = om.get(inst, "customMemoryMap") {
                args.set("customMemoryMap", map.clone());
            }
            Ok(args.into())
        })
}

fn init_instance(
    ctx: &mut BuildContext,
    module: ModuleId,
    inst: NodeId,
    name: &str,
    args: &Value,
) -> Result<()> {
    let qn = ctx.module(module).name.clone();
    let fail = |detail: String| ModelError::Hook {
        module: qn.clone(),
        hook: HookKind::InstanceMetaInit.name().to_string(),
        detail,
    };

    let surface = ctx.om().params_surface(ctx.module(module).params_proto)?;
    let entries: Vec<(String, Value)> = match args {
        Value::Undef => Vec::new(),
        Value::Record(r) => r.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        Value::Map(m) => m.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        other => {
            return Err(fail(format!(
                "creation args of '{name}' must be a record, found {}",
                other.kind_name()
            )))
        }
    };
    for (key, value) in entries {
        if !surface.contains(&key) {
            return Err(fail(format!("'{name}': unknown parameter '{key}'")));
        }
        ctx.om_mut().set(inst, &key, value)?;
    }

    let om = ctx.om();
    for required in ["catalogName", "deviceName"] {
        if om.get(inst, required).and_then(Value::as_str).is_none() {
            return Err(fail(format!("'{name}': {required} is required")));
        }
    }

    let mut effective = ValueMap::new();
    for source in ["externalMemoryMap", "customMemoryMap"] {
        let Some(map) = om.get(inst, source).and_then(Value::as_map) else {
            continue;
        };
        for (key, entry) in map.iter() {
            let rec = memory_entry(key, entry).map_err(|d| fail(format!("'{name}'.{source}: {d}")))?;
            effective.insert(key, rec);
        }
    }
    debug!(instance = name, regions = effective.len(), "memory map resolved");
    ctx.om_mut().set(inst, "memoryMap", effective)
}

/// Check one memory map entry and fill in its name from the key.
fn memory_entry(key: &str, entry: &Value) -> std::result::Result<Record, String> {
    let rec = entry
        .as_record()
        .ok_or_else(|| format!("entry '{key}' is a {}, not a Memory record", entry.kind_name()))?;
    match rec.get("name") {
        None | Some(Value::Undef) => {}
        Some(Value::Str(n)) if n == key => {}
        Some(other) => return Err(format!("entry '{key}' is named {other}")),
    }
    for field in ["base", "len"] {
        if rec.get(field).and_then(Value::as_num).is_none() {
            return Err(format!("entry '{key}' has no numeric {field}"));
        }
    }
    let mut rec = rec.clone();
    rec.set("name", key);
    Ok(rec)
}
