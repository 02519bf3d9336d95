//! Board packages such as `platform.evm6678`.
//!
//! A board package holds one `Platform` module implementing `IPlatform`.
//! Its singleton carries a literal `CPU`, an instance of the generic
//! platform module built from a [`PlatformDefinition`], and its `PARAMS`
//! name the default code, data and stack regions.

use omcfg_core::{path, FieldMode, ModelError, NodeId, Record, Result, Value, ValueMap};
use omcfg_module::{
    create, invoke_instance, BuildContext, Capsule, CapsuleLoader, FieldSpec, HookKind,
    ModuleBuilder, ModuleId, ModuleSchema, PackageDef, PackageId,
};
use tracing::debug;

use super::generic;
use super::iplatform::IPLATFORM;
use crate::definition::PlatformDefinition;

/// Link command template shared by every board.
pub const LINK_TEMPLATE: &str = "ti/platforms/generic/linkcmd.xdt";

const SECTION_FIELDS: [&str; 3] = ["codeMemory", "dataMemory", "stackMemory"];

pub struct BoardPackage {
    def: PlatformDefinition,
}

impl BoardPackage {
    pub fn new(def: PlatformDefinition) -> Self {
        Self { def }
    }

    pub fn module_name(&self) -> String {
        path::join(&self.def.package, "Platform")
    }
}

impl PackageDef for BoardPackage {
    fn name(&self) -> &str {
        &self.def.package
    }

    fn imports(&self) -> Vec<String> {
        ["xdc", generic::PACKAGE, "xdc.platform"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn declare(&self, ctx: &mut BuildContext, pkg: PackageId, capsules: &dyn CapsuleLoader) -> Result<()> {
        let mut b = ModuleBuilder::declare(ctx, pkg, "Platform", Some(IPLATFORM))?;
        b.alias("Board", &format!("{IPLATFORM}.Board"))?
            .alias("Memory", &format!("{IPLATFORM}.Memory"))?
            .alias("MemoryMap", &format!("{IPLATFORM}.MemoryMap"))?;
        b.declare_factories()?
            .install_capsule(capsules, &self.def.capsule_path())?;
        let cpu_type = format!("{}.Instance", generic::MODULE);
        let schema = ModuleSchema::host()
            .module_field(FieldSpec::new(
                "CPU",
                cpu_type.as_str(),
                Value::Undef,
                FieldMode::WH,
            ))
            .instance_field(FieldSpec::str("codeMemory", self.def.code_memory.as_str(), FieldMode::WH))
            .instance_field(FieldSpec::str("dataMemory", self.def.data_memory.as_str(), FieldMode::WH))
            .instance_field(FieldSpec::str(
                "stackMemory",
                self.def.stack_memory.as_str(),
                FieldMode::WH,
            ));
        b.finish(&schema)?;
        Ok(())
    }

    fn initialize(&self, ctx: &mut BuildContext, _pkg: PackageId) -> Result<()> {
        let cpu_module = ctx.find_module_strict(generic::MODULE)?;
        let cpu = create(ctx, cpu_module, "CPU", cpu_args(&self.def), None)?;
        let module = ctx.find_module_strict(&self.module_name())?;
        let node = ctx.module(module).node;
        ctx.om_mut().set(node, "CPU", cpu)?;
        debug!(package = %self.def.package, device = %self.def.device_name, "CPU bound");
        Ok(())
    }
}

/// Creation arguments of the generic CPU instance.
fn cpu_args(def: &PlatformDefinition) -> Value {
    let mut args = Record::new()
        .with("clockRate", def.clock_rate)
        .with("catalogName", def.catalog_name.as_str())
        .with("deviceName", def.device_name.as_str());
    let modes = [
        ("l1PMode", &def.l1p_mode),
        ("l1DMode", &def.l1d_mode),
        ("l2Mode", &def.l2_mode),
    ];
    for (field, mode) in modes {
        if let Some(mode) = mode {
            args.set(field, mode.as_str());
        }
    }
    let mut map = ValueMap::new();
    for region in &def.memory_map {
        map.insert(region.name.as_str(), region.to_value());
    }
    args.with("customMemoryMap", map).into()
}

/// The board capsule. Every board shares the same behavior; only the path
/// differs.
pub fn capsule(path: &str) -> Capsule {
    Capsule::new(path)
        .with_instance_meta_init(|ctx, module, inst, name, _args| {
            check_sections(ctx, module, inst, HookKind::InstanceMetaInit)
                .map_err(|e| prefix(e, name))
        })
        .with_module_validate(|ctx, module| {
            let node = ctx.module(module).node;
            check_sections(ctx, module, node, HookKind::ModuleValidate)
        })
        .with_function("getCpuDataSheet", |ctx, inst, args| {
            let cpu = cpu_of(ctx, inst)?;
            invoke_instance(ctx, cpu, "getCpuDataSheet", args)
        })
        .with_function("getCreateArgs", |ctx, inst, _| {
            let cpu = cpu_of(ctx, inst)?;
            invoke_instance(ctx, cpu, "getCreateArgs", &[])
        })
        .with_function("getExeContext", |ctx, inst, _| {
            let cpu = cpu_of(ctx, inst)?;
            let om = ctx.om();
            let text = |f: &str| om.get(cpu, f).and_then(Value::as_str).unwrap_or_default();
            Ok(Value::from(format!("{}.{}", text("catalogName"), text("deviceName"))))
        })
        .with_function("getExecCmd", |ctx, inst, args| {
            let pkg = package_name(ctx, inst);
            let prog = program_name(&args[0]);
            Ok(Value::from(format!("@$(ECHO) {pkg} platform cannot execute {prog}")))
        })
        .with_function("getLinkTemplate", |_, _, _| Ok(Value::from(LINK_TEMPLATE)))
}

/// Every section default on `target` (the board singleton's `PARAMS` or a
/// fresh instance) must name a region of the CPU's memory map.
fn check_sections(ctx: &BuildContext, module: ModuleId, target: NodeId, hook: HookKind) -> Result<()> {
    let m = ctx.module(module);
    let om = ctx.om();
    let fail = |detail: String| ModelError::Hook {
        module: m.name.clone(),
        hook: hook.name().to_string(),
        detail,
    };
    let cpu = om
        .get(m.node, "CPU")
        .and_then(Value::as_node)
        .ok_or_else(|| fail("CPU is not bound".to_string()))?;
    let map = om
        .get(cpu, "memoryMap")
        .and_then(Value::as_map)
        .ok_or_else(|| fail("CPU has no memory map".to_string()))?;

    let values: Vec<(&str, Option<&Value>)> = if target == m.node {
        let params = om.get(m.node, "PARAMS").and_then(Value::as_record);
        SECTION_FIELDS
            .iter()
            .map(|f| (*f, params.and_then(|p| p.get(f))))
            .collect()
    } else {
        SECTION_FIELDS.iter().map(|f| (*f, om.get(target, f))).collect()
    };
    for (field, value) in values {
        match value.and_then(Value::as_str) {
            Some(region) if map.contains_key(region) => {}
            Some(region) => {
                return Err(fail(format!("{field} '{region}' is not in the CPU memory map")))
            }
            None => return Err(fail(format!("{field} is not set"))),
        }
    }
    Ok(())
}

fn prefix(err: ModelError, name: &str) -> ModelError {
    match err {
        ModelError::Hook { module, hook, detail } => ModelError::Hook {
            module,
            hook,
            detail: format!("'{name}': {detail}"),
        },
        other => other,
    }
}

fn cpu_of(ctx: &BuildContext, inst: NodeId) -> Result<NodeId> {
    let om = ctx.om();
    om.get(inst, "$module")
        .and_then(Value::as_node)
        .and_then(|m| om.get(m, "CPU"))
        .and_then(Value::as_node)
        .ok_or_else(|| ModelError::UnresolvedReference {
            path: "$module.CPU".to_string(),
            context: om.node(inst).name().to_string(),
        })
}

fn package_name(ctx: &BuildContext, inst: NodeId) -> String {
    let om = ctx.om();
    om.get(inst, "$package")
        .and_then(Value::as_node)
        .and_then(|p| om.get(p, "$name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn program_name(prog: &Value) -> String {
    match prog {
        Value::Str(s) => s.clone(),
        Value::Record(r) => r
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("program")
            .to_string(),
        _ => "program".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_args_carry_the_literal_table() {
        let args = cpu_args(&PlatformDefinition::evm6678());
        let rec = args.as_record().unwrap();
        assert_eq!(rec.get("clockRate"), Some(&Value::Num(1000)));
        assert_eq!(rec.get("l2Mode"), Some(&Value::from("128k")));
        let map = rec.get("customMemoryMap").and_then(Value::as_map).unwrap();
        let names: Vec<&str> = map.keys().collect();
        assert_eq!(names.first(), Some(&"L2SRAM0"));
        assert_eq!(names.last(), Some(&"DDR3_NOCACHE1"));
        let static_region = map.get("DDR3_STATIC").and_then(Value::as_record).unwrap();
        assert_eq!(static_region.get("base"), Some(&Value::Num(0xBEF0_0000)));
    }

    #[test]
    fn cache_modes_are_omitted_when_unset() {
        let mut def = PlatformDefinition::evm6678();
        def.l2_mode = None;
        let args = cpu_args(&def);
        assert!(args.as_record().unwrap().get("l2Mode").is_none());
    }

    #[test]
    fn program_names() {
        assert_eq!(program_name(&Value::from("app.x64")), "app.x64");
        assert_eq!(program_name(&Record::new().with("name", "hello").into()), "hello");
        assert_eq!(program_name(&Value::Undef), "program");
    }
}
