//! Packages and the per-package build sequence.
//!
//! A package build runs in a fixed order: imports, package objects, the
//! package's own declarations (interfaces and module descriptors), the
//! package singleton, every module singleton, and finally initialization.
//! Initialization runs `module$meta$init` for each module, then the
//! package's literal configuration, then blesses the modules and registers
//! the package in `$packages`.

use std::fmt;

use omcfg_core::{path, ModelError, Node, NodeId, ProtoId, Prototype, Result, StructType, Value};
use tracing::{debug, info};

use crate::context::BuildContext;
use crate::loader::{CapsuleLoader, PackageLoader};
use crate::module::ModuleId;
use crate::singleton;

/// Handle of a package in the build context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub(crate) usize);

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PackageState {
    pub name: String,
    pub node: NodeId,
    pub proto: ProtoId,
    pub imports: Vec<String>,
    /// Modules in declaration order.
    pub units: Vec<ModuleId>,
    pub interfaces: Vec<String>,
    /// The package's `$modules`, filled as singletons are materialized.
    pub modules: Vec<ModuleId>,
    pub unit_names: Vec<String>,
}

/// A package definition: what a package imports, declares and configures.
pub trait PackageDef {
    fn name(&self) -> &str;

    /// Packages to load first, in order.
    fn imports(&self) -> Vec<String> {
        Vec::new()
    }

    /// Base prototype of the package singleton.
    fn base(&self) -> Option<&str> {
        Some("xdc.IPackage.Module")
    }

    /// Declare interfaces and module descriptors.
    fn declare(
        &self,
        ctx: &mut BuildContext,
        pkg: PackageId,
        capsules: &dyn CapsuleLoader,
    ) -> Result<()>;

    /// Literal configuration, run after every module's `module$meta$init`
    /// and before the modules are blessed.
    fn initialize(&self, _ctx: &mut BuildContext, _pkg: PackageId) -> Result<()> {
        Ok(())
    }
}

/// Build one package. Imports go through `loader` before anything local is
/// bound; a second build of the same package fails on its first binding,
/// and a package that reaches itself through its imports fails with the
/// import chain.
pub fn build_package<L>(ctx: &mut BuildContext, def: &dyn PackageDef, loader: &L) -> Result<PackageId>
where
    L: PackageLoader + CapsuleLoader,
{
    let name = def.name().to_string();
    ctx.enter_package(&name)?;
    let result = run_build(ctx, def, loader, &name);
    ctx.leave_package(&name);
    result
}

fn run_build<L>(ctx: &mut BuildContext, def: &dyn PackageDef, loader: &L, name: &str) -> Result<PackageId>
where
    L: PackageLoader + CapsuleLoader,
{
    let imports = def.imports();
    info!(package = %name, imports = imports.len(), "building package");

    for import in &imports {
        loader.load_package(ctx, name, import)?;
    }

    let pkg = declare_package(ctx, name, imports)?;
    def.declare(ctx, pkg, loader)?;
    bind_package_singleton(ctx, pkg, def.base())?;

    let units = ctx.package(pkg).units.clone();
    for &module in &units {
        singleton::materialize(ctx, module)?;
    }
    for &module in &units {
        singleton::initialize(ctx, module)?;
    }
    def.initialize(ctx, pkg)?;
    for &module in &units {
        singleton::bless(ctx, module);
    }
    ctx.register_package(pkg)?;
    Ok(pkg)
}

fn declare_package(ctx: &mut BuildContext, name: &str, imports: Vec<String>) -> Result<PackageId> {
    let om = ctx.om_mut();
    let proto = om.bind_proto(
        &path::join(name, "Package"),
        Prototype::Struct(StructType::default()),
    )?;
    let node = om.bind_node(name, Node::new(name, None))?;
    Ok(ctx.add_package(PackageState {
        name: name.to_string(),
        node,
        proto,
        imports,
        units: Vec::new(),
        interfaces: Vec::new(),
        modules: Vec::new(),
        unit_names: Vec::new(),
    }))
}

fn bind_package_singleton(ctx: &mut BuildContext, pkg: PackageId, base: Option<&str>) -> Result<()> {
    let (name, node, proto, imports) = {
        let p = ctx.package(pkg);
        (p.name.clone(), p.node, p.proto, p.imports.clone())
    };
    let om = ctx.om_mut();
    let parent = match base {
        Some(b) => Some(om.find_strict_proto(b, Some(&name))?),
        None => None,
    };
    om.init_struct(proto, &path::join(&name, "Package"), parent)?;
    om.finalize_struct(proto)?;
    om.init_node(node, proto)?;

    let n = om.node_mut(node);
    n.bind("$name", name.as_str())?;
    n.bind("$category", "Package")?;
    n.bind("$$qn", format!("{name}."))?;
    n.bind("$vers", Value::Array(Vec::new()))?;
    n.bind(
        "$imports",
        Value::Array(imports.into_iter().map(Value::from).collect()),
    )?;
    n.bind("$modules", Value::Array(Vec::new()))?;
    n.bind("$unitNames", Value::Array(Vec::new()))?;
    n.seal_attrs();
    debug!(package = %name, "package singleton bound");
    Ok(())
}

/// Append a module to its package's `$modules` and `$unitNames`, mirroring
/// the lists onto the package node.
pub(crate) fn add_module(ctx: &mut BuildContext, pkg: PackageId, module: ModuleId) -> Result<()> {
    let unit = ctx.module(module).unit_name().to_string();
    let (node, modules, unit_names) = {
        let state = ctx.package_mut(pkg);
        if state.modules.contains(&module) {
            return Err(ModelError::DuplicateBinding {
                path: format!("{}.$modules[{unit}]", state.name),
            });
        }
        state.modules.push(module);
        state.unit_names.push(unit);
        let unit_names: Vec<Value> = state
            .unit_names
            .iter()
            .map(|u| Value::from(u.as_str()))
            .collect();
        (state.node, state.modules.clone(), unit_names)
    };
    let modules: Vec<Value> = modules
        .into_iter()
        .map(|m| Value::Node(ctx.module(m).node))
        .collect();
    let n = ctx.om_mut().node_mut(node);
    n.set("$modules", modules)?;
    n.set("$unitNames", unit_names)?;
    Ok(())
}
