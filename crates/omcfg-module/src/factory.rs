//! Instance factories.
//!
//! `create` produces a fresh instance; `construct` wires up a caller-owned
//! Object record. Both copy the module's `PARAMS` defaults, overlay the
//! caller's overrides and bless the result. Overrides are permissive: keys
//! the Params schema does not declare are accepted as-is. Only `$`-prefixed
//! bookkeeping keys are skipped, so `$index` and friends stay intact.

use omcfg_core::{FunctionSource, ModelError, NodeId, ObjectModel, ProtoId, Record, Result, Value};
use tracing::{debug, warn};

use crate::capsule::HookKind;
use crate::context::BuildContext;
use crate::module::{Lifecycle, ModuleId};
use crate::singleton::run_module_hook;

/// Create an instance of `module`.
///
/// The instance gets `$package`, `$index` (its position in the module's
/// instance list), `$category`, `$args` and `$module`, then the `PARAMS`
/// defaults and `params` overrides. `instance$meta$init(name, args)` runs
/// with the current package switched to the module's package. The instance
/// joins the module's instance list only once it is blessed, so a failed
/// create leaves the list and the next `$index` untouched.
pub fn create(
    ctx: &mut BuildContext,
    module: ModuleId,
    name: &str,
    args: Value,
    params: Option<&Record>,
) -> Result<NodeId> {
    let m = ctx.module(module);
    m.require(Lifecycle::SingletonBound, "create")?;
    let qn = m.name.clone();
    let index = m.instances.len();
    let (mod_node, inst_proto, pkg) = (m.node, m.instance_proto, m.package);
    let hook = m.capsule.as_ref().and_then(|c| c.instance_meta_init());
    let (pkg_node, pkg_name) = {
        let p = ctx.package(pkg);
        (p.node, p.name.clone())
    };

    let inst = ctx
        .om_mut()
        .instantiate_named(inst_proto, format!("{qn}.Instance#{index}"))?;
    {
        let n = ctx.om_mut().node_mut(inst);
        n.bind("$package", pkg_node)?;
        n.bind("$index", index)?;
        n.bind("$category", "Instance")?;
        n.bind("$args", creation_args(name, &args))?;
        n.bind("$module", mod_node)?;
    }
    apply_params(ctx, module, inst, params)?;

    if let Some(hook) = hook {
        let saved = ctx.set_current_package(Some(pkg_name));
        let result = hook(ctx, module, inst, name, &args);
        ctx.set_current_package(saved);
        result?;
    }

    ctx.om_mut().node_mut(inst).bless();
    ctx.module_mut(module).instances.push(inst);
    debug!(module = %qn, index, name, "instance created");
    Ok(inst)
}

/// A fresh Object record of `module`, ready for [`construct`].
pub fn new_object(ctx: &mut BuildContext, module: ModuleId) -> Result<NodeId> {
    let m = ctx.module(module);
    let name = format!("{}.Object#{}", m.name, m.objects.len());
    let proto = m.object_proto;
    ctx.om_mut().instantiate_named(proto, name)
}

/// Wire `obj` up as an object of `module`. No `$index`, no hook.
pub fn construct(
    ctx: &mut BuildContext,
    module: ModuleId,
    obj: NodeId,
    name: &str,
    args: Value,
    params: Option<&Record>,
) -> Result<()> {
    let m = ctx.module(module);
    m.require(Lifecycle::SingletonBound, "construct")?;
    let (qn, mod_node, object_proto) = (m.name.clone(), m.node, m.object_proto);
    let om = ctx.om();
    if !om.conforms(&Value::Node(obj), object_proto) {
        return Err(ModelError::TypeMismatch {
            owner: format!("{qn}.construct"),
            field: "__obj".to_string(),
            expected: om.describe(object_proto),
            found: om.node(obj).name().to_string(),
        });
    }

    {
        let n = ctx.om_mut().node_mut(obj);
        n.bind("$args", creation_args(name, &args))?;
        n.bind("$module", mod_node)?;
    }
    apply_params(ctx, module, obj, params)?;
    ctx.om_mut().node_mut(obj).bless();
    ctx.module_mut(module).objects.push(obj);
    debug!(module = %qn, name, "object constructed");
    Ok(())
}

/// Call `function` through the module's function table.
pub fn invoke(
    ctx: &mut BuildContext,
    module: ModuleId,
    function: &str,
    args: &[Value],
) -> Result<Value> {
    let m = ctx.module(module);
    let qn = m.name.clone();
    let slot = ctx
        .om()
        .lookup_function(m.module_proto, function)
        .cloned()
        .ok_or_else(|| ModelError::UnknownFunction {
            owner: qn.clone(),
            function: function.to_string(),
        })?;
    let args = check_call(ctx.om(), &format!("{qn}.{function}"), slot.proto, args)?;

    match &slot.source {
        FunctionSource::Builtin(b) if b == "create" => {
            let name = required_name(&qn, "create", &args[0])?;
            let inst = create(ctx, module, &name, args[1].clone(), args[2].as_record())?;
            Ok(Value::Node(inst))
        }
        FunctionSource::Builtin(b) if b == "construct" => {
            let obj = args[0].as_node().ok_or_else(|| ModelError::TypeMismatch {
                owner: format!("{qn}.construct"),
                field: "__obj".to_string(),
                expected: "object".to_string(),
                found: args[0].kind_name().to_string(),
            })?;
            let name = required_name(&qn, "construct", &args[1])?;
            construct(ctx, module, obj, &name, args[2].clone(), args[3].as_record())?;
            Ok(Value::Undef)
        }
        FunctionSource::Capsule(hook) => {
            let kind = HookKind::ALL
                .into_iter()
                .find(|k| k.name() == hook)
                .ok_or_else(|| ModelError::UnknownFunction {
                    owner: qn.clone(),
                    function: hook.clone(),
                })?;
            if kind == HookKind::InstanceMetaInit {
                // Runs only from `create`, which supplies the instance.
                return Err(ModelError::WrongKind {
                    path: format!("{qn}.{hook}"),
                    expected: "module hook",
                    found: "instance hook",
                });
            }
            run_module_hook(ctx, module, kind)?;
            Ok(Value::Undef)
        }
        FunctionSource::Builtin(other) => Err(ModelError::UnknownFunction {
            owner: qn,
            function: other.clone(),
        }),
    }
}

/// Call a capsule-supplied public function on an instance or object.
pub fn invoke_instance(
    ctx: &mut BuildContext,
    inst: NodeId,
    function: &str,
    args: &[Value],
) -> Result<Value> {
    let node = ctx.om().node(inst);
    let owner = node.name().to_string();
    let proto = node.proto().ok_or_else(|| ModelError::WrongKind {
        path: owner.clone(),
        expected: "instance",
        found: "untyped node",
    })?;
    let module = node
        .get("$module")
        .and_then(Value::as_node)
        .and_then(|n| ctx.module_by_node(n))
        .ok_or_else(|| ModelError::UnresolvedReference {
            path: format!("{owner}.$module"),
            context: owner.clone(),
        })?;
    let slot = ctx
        .om()
        .lookup_function(proto, function)
        .cloned()
        .ok_or_else(|| ModelError::UnknownFunction {
            owner: owner.clone(),
            function: function.to_string(),
        })?;
    let args = check_call(ctx.om(), &format!("{owner}.{function}"), slot.proto, args)?;

    let f = match &slot.source {
        FunctionSource::Capsule(name) => ctx
            .module(module)
            .capsule
            .as_ref()
            .and_then(|c| c.function(name)),
        FunctionSource::Builtin(_) => None,
    }
    .ok_or_else(|| ModelError::UnknownFunction {
        owner: owner.clone(),
        function: function.to_string(),
    })?;
    f(ctx, inst, &args)
}

/// Arity-check a call, fill trailing defaults and type-check each argument.
fn check_call(om: &ObjectModel, function: &str, fn_proto: ProtoId, given: &[Value]) -> Result<Vec<Value>> {
    let f = om.function_type(fn_proto)?;
    if !f.accepts(given.len()) {
        return Err(ModelError::ArityMismatch {
            function: function.to_string(),
            expected: f.arity(),
            given: given.len(),
        });
    }
    let mut out = given.to_vec();
    for (i, arg) in f.args.iter().enumerate() {
        if i >= out.len() {
            out.push(arg.default.clone());
        }
        if let Some(ty) = arg.ty {
            if !om.conforms(&out[i], ty) {
                return Err(ModelError::TypeMismatch {
                    owner: function.to_string(),
                    field: arg.name.clone(),
                    expected: om.describe(ty),
                    found: out[i].kind_name().to_string(),
                });
            }
        }
    }
    Ok(out)
}

/// The `name` argument of a factory call. `Undef` passes the `Str` type
/// check but is not a name.
fn required_name(module: &str, factory: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ModelError::TypeMismatch {
            owner: format!("{module}.{factory}"),
            field: "name".to_string(),
            expected: "Str".to_string(),
            found: value.kind_name().to_string(),
        })
}

fn creation_args(name: &str, args: &Value) -> Record {
    Record::new().with("name", name).with("args", args.clone())
}

/// Copy the module's non-`$` `PARAMS` defaults onto `target`, then the
/// caller's overrides.
fn apply_params(
    ctx: &mut BuildContext,
    module: ModuleId,
    target: NodeId,
    params: Option<&Record>,
) -> Result<()> {
    let m = ctx.module(module);
    let defaults: Vec<(String, Value)> = match ctx.om().get(m.node, "PARAMS") {
        Some(Value::Record(r)) => r
            .iter()
            .filter(|(k, _)| !k.starts_with('$'))
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        _ => {
            return Err(ModelError::UnresolvedReference {
                path: format!("{}.PARAMS", m.name),
                context: m.name.clone(),
            })
        }
    };
    let node = ctx.om_mut().node_mut(target);
    for (k, v) in defaults {
        node.set(&k, v)?;
    }
    if let Some(p) = params {
        for (k, v) in p.iter() {
            if k.starts_with('$') {
                warn!(field = k, instance = node.name(), "bookkeeping field in override ignored");
                continue;
            }
            node.set(k, v.clone())?;
        }
    }
    Ok(())
}
