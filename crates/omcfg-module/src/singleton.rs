//! Module singletons: materialization, sealing and initialization.

use omcfg_core::{path, ModelError, Result, Value};
use tracing::debug;

use crate::capsule::HookKind;
use crate::context::BuildContext;
use crate::module::{Lifecycle, ModuleId};
use crate::package;

/// Bind the runtime fields of a typed module onto its singleton node,
/// register it with its package and `$modules`, and seal its attributes.
///
/// Runs once per module: a second call fails with `DuplicateBinding` on
/// the `Module` field.
pub fn materialize(ctx: &mut BuildContext, module: ModuleId) -> Result<()> {
    let m = ctx.module(module).clone();
    if ctx.om().get(m.node, "Module").is_some() {
        return Err(ModelError::DuplicateBinding {
            path: format!("{}.Module", m.name),
        });
    }
    m.require(Lifecycle::Typed, "materialize")?;
    let pkg_node = ctx.package(m.package).node;
    let meta_iobj = ctx.om().has(&format!("{}$$instance$static$init", m.name));
    let params = ctx.om().new_record(m.params_proto)?;

    {
        let om = ctx.om_mut();
        om.init_node(m.node, m.module_proto)?;
        let n = om.node_mut(m.node);
        n.bind("Module", m.module_proto)?;
        n.bind("$category", "Module")?;
        if let Some(cap) = &m.capsule {
            n.bind("$capsule", cap.path())?;
        }
        n.bind("Instance", m.instance_proto)?;
        n.bind("Params", m.params_proto)?;
        n.bind("PARAMS", params)?;
        n.bind("$package", pkg_node)?;
    }
    ctx.module_mut(module).advance(Lifecycle::SingletonBound)?;

    {
        let n = ctx.om_mut().node_mut(m.node);
        for alias in &m.aliases {
            n.bind(&alias.local, alias.proto)?;
        }
        let tdefs: Vec<Value> = m
            .aliases
            .iter()
            .filter(|a| a.tdef)
            .map(|a| Value::Proto(a.proto))
            .collect();
        n.bind("$$tdefs", tdefs)?;
        n.bind(
            "$$proxies",
            m.proxies.iter().map(|p| Value::Proto(*p)).collect::<Vec<_>>(),
        )?;
        n.bind("$$mcfgs", strings(&m.mcfgs))?;
        n.bind("$$icfgs", strings(&m.icfgs))?;
        let inherits: Vec<String> = m
            .inherits
            .iter()
            .map(|i| path::split_last(i).0.unwrap_or(i).to_string())
            .collect();
        n.bind("$$inherits", strings(&inherits))?;
        n.bind("$$instflag", 1i64)?;
        n.bind("$$meta_iobj", i64::from(meta_iobj))?;
        n.bind("Object", m.object_proto)?;
    }

    package::add_module(ctx, m.package, module)?;
    ctx.register_module(module)?;

    ctx.om_mut().node_mut(m.node).seal_attrs();
    ctx.module_mut(module).advance(Lifecycle::Sealed)?;
    debug!(module = %m.name, "singleton materialized");
    Ok(())
}

/// Run `module$meta$init`, if the capsule has one. The module is
/// `INITIALIZED` afterwards.
pub fn initialize(ctx: &mut BuildContext, module: ModuleId) -> Result<()> {
    let m = ctx.module(module);
    if m.state != Lifecycle::Sealed {
        return Err(ModelError::LifecycleViolation {
            module: m.name.clone(),
            from: m.state.to_string(),
            to: Lifecycle::Initialized.to_string(),
        });
    }
    run_module_hook(ctx, module, HookKind::ModuleMetaInit)?;
    ctx.module_mut(module).advance(Lifecycle::Initialized)
}

/// Freeze the module singleton.
pub fn bless(ctx: &mut BuildContext, module: ModuleId) {
    let node = ctx.module(module).node;
    ctx.om_mut().node_mut(node).bless();
}

/// Run `module$use`, if present.
pub fn use_module(ctx: &mut BuildContext, module: ModuleId) -> Result<bool> {
    ctx.module(module).require(Lifecycle::Typed, "use")?;
    run_module_hook(ctx, module, HookKind::ModuleUse)
}

/// Run `module$validate`, if present.
pub fn validate_module(ctx: &mut BuildContext, module: ModuleId) -> Result<bool> {
    ctx.module(module)
        .require(Lifecycle::Initialized, "validate")?;
    run_module_hook(ctx, module, HookKind::ModuleValidate)
}

/// Run a module-level hook. Returns whether the capsule had one.
pub(crate) fn run_module_hook(ctx: &mut BuildContext, module: ModuleId, kind: HookKind) -> Result<bool> {
    let hook = ctx
        .module(module)
        .capsule
        .as_ref()
        .and_then(|c| c.module_hook(kind));
    match hook {
        Some(hook) => {
            debug!(module = %ctx.module(module).name, hook = %kind, "running hook");
            hook(ctx, module)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn strings(items: &[String]) -> Vec<Value> {
    items.iter().map(|s| Value::from(s.as_str())).collect()
}
