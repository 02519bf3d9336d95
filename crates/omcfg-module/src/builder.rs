//! Module descriptor builder.
//!
//! Declares a module's type shape in five ordered steps:
//!
//! 1. [`ModuleBuilder::declare`] binds the skeleton prototypes and the
//!    singleton node.
//! 2. [`ModuleBuilder::alias`] re-exports types from the inherited interface.
//! 3. [`ModuleBuilder::declare_factories`] binds the `create`/`construct`
//!    signatures.
//! 4. [`ModuleBuilder::install_capsule`] (or [`ModuleBuilder::without_capsule`])
//!    names the structs and fills their function tables.
//! 5. [`ModuleBuilder::finish`] adds the field schema and finalizes.
//!
//! Calling a step before the one it depends on is [`ModelError::OutOfOrder`].

use omcfg_core::{
    path, ElementKind, FunctionSource, ModelError, Node, Prototype, Record, Result, StructType,
    Value,
};
use tracing::debug;

use crate::capsule::{Capsule, HookKind};
use crate::context::BuildContext;
use crate::interface::{add_fields, FieldSpec};
use crate::loader::CapsuleLoader;
use crate::module::{Lifecycle, ModuleId, ModuleState, TypeAlias};
use crate::package::PackageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    Skeleton,
    Aliases,
    Factories,
    Types,
}

/// Field schema for [`ModuleBuilder::finish`].
#[derive(Debug, Clone, Default)]
pub struct ModuleSchema {
    /// Add `$hostonly` to Module, Instance and Params.
    pub host_only: bool,
    pub module_fields: Vec<FieldSpec>,
    /// Declared on both Instance and Params.
    pub instance_fields: Vec<FieldSpec>,
}

impl ModuleSchema {
    pub fn host() -> Self {
        Self {
            host_only: true,
            ..Default::default()
        }
    }

    pub fn module_field(mut self, field: FieldSpec) -> Self {
        self.module_fields.push(field);
        self
    }

    pub fn instance_field(mut self, field: FieldSpec) -> Self {
        self.instance_fields.push(field);
        self
    }
}

pub struct ModuleBuilder<'a> {
    ctx: &'a mut BuildContext,
    module: ModuleId,
    package: String,
    step: Step,
}

impl<'a> ModuleBuilder<'a> {
    /// Step 1: bind `pkg.M.Module`, the node `pkg.M`, `pkg.M.Instance`,
    /// `pkg.M$$Object`/`pkg.M.Object` and `pkg.M$$Params`/`pkg.M.Params`, and
    /// bind the module into its package node.
    pub fn declare(
        ctx: &'a mut BuildContext,
        pkg: PackageId,
        name: &str,
        inherits: Option<&str>,
    ) -> Result<Self> {
        let package = ctx.package(pkg).name.clone();
        let pkg_node = ctx.package(pkg).node;
        let qn = path::join(&package, name);
        let inherits = match inherits {
            Some(i) => vec![ctx.interface_strict(i, &package)?.name.clone()],
            None => Vec::new(),
        };

        let om = ctx.om_mut();
        let module_proto = om.bind_proto(&format!("{qn}.Module"), skeleton())?;
        let node = om.bind_node(&qn, Node::new(qn.as_str(), None))?;
        om.node_mut(pkg_node).bind(name, node)?;
        let instance_proto = om.bind_proto(&format!("{qn}.Instance"), skeleton())?;
        let object_proto = om.bind_proto(&format!("{qn}$$Object"), skeleton())?;
        om.bind(&format!("{qn}.Object"), object_proto)?;
        om.set_instantiable(object_proto, true)?;
        let params_proto = om.bind_proto(&format!("{qn}$$Params"), skeleton())?;
        om.bind(&format!("{qn}.Params"), params_proto)?;
        om.set_instantiable(params_proto, true)?;

        let module = ctx.add_module(ModuleState {
            name: qn.clone(),
            package: pkg,
            node,
            module_proto,
            instance_proto,
            params_proto,
            object_proto,
            create_fn: None,
            construct_fn: None,
            capsule: None,
            instances: Vec::new(),
            objects: Vec::new(),
            inherits,
            aliases: Vec::new(),
            proxies: Vec::new(),
            mcfgs: Vec::new(),
            icfgs: Vec::new(),
            state: Lifecycle::Declared,
        });
        ctx.package_mut(pkg).units.push(module);
        debug!(module = %qn, "module declared");
        Ok(Self {
            ctx,
            module,
            package,
            step: Step::Skeleton,
        })
    }

    pub fn id(&self) -> ModuleId {
        self.module
    }

    fn qn(&self) -> &str {
        &self.ctx.module(self.module).name
    }

    fn expect(&self, allowed: &[Step], step: &'static str) -> Result<()> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(ModelError::OutOfOrder {
                module: self.qn().to_string(),
                step,
            })
        }
    }

    /// Step 2: bind `pkg.M.<local>` to whatever is bound at `target`.
    pub fn alias(&mut self, local: &str, target: &str) -> Result<&mut Self> {
        self.expect(&[Step::Skeleton, Step::Aliases], "alias")?;
        let qn = self.qn().to_string();
        let om = self.ctx.om_mut();
        let proto = om.find_strict_proto(target, Some(&self.package))?;
        om.bind(&path::join(&qn, local), proto)?;
        let tdef = matches!(om.proto(proto), Prototype::Struct(_));
        self.ctx.module_mut(self.module).aliases.push(TypeAlias {
            local: local.to_string(),
            target: target.to_string(),
            proto,
            tdef,
        });
        self.step = Step::Aliases;
        Ok(self)
    }

    /// Step 3: bind `pkg.M$$create` and `pkg.M$$construct`.
    pub fn declare_factories(&mut self) -> Result<&mut Self> {
        self.expect(&[Step::Skeleton, Step::Aliases], "declare_factories")?;
        let (qn, module_proto, instance_proto, params_proto, object_proto) = {
            let m = self.ctx.module(self.module);
            (
                m.name.clone(),
                m.module_proto,
                m.instance_proto,
                m.params_proto,
                m.object_proto,
            )
        };
        let om = self.ctx.om_mut();
        let str_t = om.element(ElementKind::Str);
        let obj_t = om.element(ElementKind::Obj);

        let create = om.new_function(Some(module_proto), Some(instance_proto), 2, Some(3), false);
        om.add_arg(create, "name", Some(str_t), Value::Undef)?;
        om.add_arg(create, "args", Some(obj_t), Value::Undef)?;
        om.add_arg(create, "__params", Some(params_proto), Record::new())?;
        om.bind(&format!("{qn}$$create"), create)?;

        let construct = om.new_function(Some(module_proto), None, 2, Some(4), false);
        om.add_arg(construct, "__obj", Some(object_proto), Value::Undef)?;
        om.add_arg(construct, "name", Some(str_t), Value::Undef)?;
        om.add_arg(construct, "args", Some(obj_t), Value::Undef)?;
        om.add_arg(construct, "__params", Some(params_proto), Record::new())?;
        om.bind(&format!("{qn}$$construct"), construct)?;

        let m = self.ctx.module_mut(self.module);
        m.create_fn = Some(create);
        m.construct_fn = Some(construct);
        self.step = Step::Factories;
        Ok(self)
    }

    /// Step 4: load the capsule at `path` and install the type bodies.
    pub fn install_capsule(&mut self, loader: &dyn CapsuleLoader, path: &str) -> Result<&mut Self> {
        self.expect(&[Step::Factories], "install_capsule")?;
        let capsule = loader.load_capsule(self.qn(), path)?;
        self.install_types(Some(capsule))?;
        Ok(self)
    }

    /// Step 4 for a module with no capsule: no hooks, no public functions.
    pub fn without_capsule(&mut self) -> Result<&mut Self> {
        self.expect(&[Step::Factories], "without_capsule")?;
        self.install_types(None)?;
        Ok(self)
    }

    fn install_types(&mut self, capsule: Option<Capsule>) -> Result<()> {
        let m = self.ctx.module(self.module).clone();
        let iface = match m.inherits.first() {
            Some(name) => Some(self.ctx.interface_strict(name, &self.package)?.clone()),
            None => None,
        };
        let qn = m.name.as_str();
        let om = self.ctx.om_mut();
        om.init_struct(
            m.module_proto,
            &format!("{qn}.Module"),
            iface.as_ref().map(|i| i.module_proto),
        )?;
        om.init_struct(
            m.instance_proto,
            &format!("{qn}.Instance"),
            iface.as_ref().map(|i| i.instance_proto),
        )?;
        om.init_struct(
            m.params_proto,
            &format!("{qn}.Params"),
            iface.as_ref().map(|i| i.params_proto),
        )?;
        om.init_struct(m.object_proto, &format!("{qn}.Object"), Some(m.instance_proto))?;

        if let (Some(create), Some(construct)) = (m.create_fn, m.construct_fn) {
            om.add_function(m.module_proto, "create", create, FunctionSource::Builtin("create".into()))?;
            om.add_function(
                m.module_proto,
                "construct",
                construct,
                FunctionSource::Builtin("construct".into()),
            )?;
        }

        if let Some(cap) = &capsule {
            om.bind(&format!("{qn}$$capsule"), Value::from(cap.path()))?;
            let hook_fn = om.new_function(Some(m.module_proto), None, 0, None, true);
            for kind in HookKind::ALL.into_iter().filter(|k| cap.has(*k)) {
                om.bind(&format!("{qn}$${}", kind.name()), Value::Bool(true))?;
                om.add_function(
                    m.module_proto,
                    kind.name(),
                    hook_fn,
                    FunctionSource::Capsule(kind.name().into()),
                )?;
            }
            if let Some(iface) = &iface {
                for (name, f) in iface.functions.iter().filter(|(n, _)| cap.has_function(n)) {
                    for target in [m.instance_proto, m.object_proto] {
                        om.add_function(target, name, *f, FunctionSource::Capsule(name.clone()))?;
                    }
                }
            }
        }

        self.ctx.module_mut(self.module).capsule = capsule;
        self.step = Step::Types;
        Ok(())
    }

    /// Step 5: add the field schema, finalize all four structs. The module
    /// is `TYPED` afterwards.
    pub fn finish(self, schema: &ModuleSchema) -> Result<ModuleId> {
        self.expect(&[Step::Types], "finish")?;
        let m = self.ctx.module(self.module).clone();
        let host: Vec<FieldSpec> = if schema.host_only {
            vec![FieldSpec::host_only()]
        } else {
            Vec::new()
        };

        add_fields(self.ctx, m.module_proto, &self.package, &host)?;
        add_fields(self.ctx, m.module_proto, &self.package, &schema.module_fields)?;
        for target in [m.instance_proto, m.params_proto] {
            add_fields(self.ctx, target, &self.package, &host)?;
            add_fields(self.ctx, target, &self.package, &schema.instance_fields)?;
        }

        let om = self.ctx.om_mut();
        for id in [m.module_proto, m.instance_proto, m.params_proto, m.object_proto] {
            om.finalize_struct(id)?;
        }

        let visible = |fields: &[FieldSpec]| -> Vec<String> {
            fields
                .iter()
                .filter(|f| !f.mode.hidden && !f.name.starts_with('$'))
                .map(|f| f.name.clone())
                .collect()
        };
        let state = self.ctx.module_mut(self.module);
        state.mcfgs = visible(schema.module_fields.as_slice());
        state.icfgs = visible(schema.instance_fields.as_slice());
        state.advance(Lifecycle::Typed)?;
        Ok(self.module)
    }
}

fn skeleton() -> Prototype {
    Prototype::Struct(StructType::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::InterfaceBuilder;
    use crate::package::{PackageDef, PackageState};
    use omcfg_core::FieldMode;

    fn bare_package(ctx: &mut BuildContext, name: &str) -> PackageId {
        let om = ctx.om_mut();
        let proto = om
            .bind_proto(&format!("{name}.Package"), skeleton())
            .unwrap();
        let node = om.bind_node(name, Node::new(name, None)).unwrap();
        ctx.add_package(PackageState {
            name: name.into(),
            node,
            proto,
            imports: Vec::new(),
            units: Vec::new(),
            interfaces: Vec::new(),
            modules: Vec::new(),
            unit_names: Vec::new(),
        })
    }

    fn context_with_package(name: &str) -> (BuildContext, PackageId) {
        let mut ctx = BuildContext::new();
        let pkg = bare_package(&mut ctx, name);
        (ctx, pkg)
    }

    #[test]
    fn skeleton_paths_are_bound() {
        let (mut ctx, pkg) = context_with_package("board");
        let b = ModuleBuilder::declare(&mut ctx, pkg, "Platform", None).unwrap();
        let id = b.id();
        let om = ctx.om();
        for p in [
            "board.Platform.Module",
            "board.Platform",
            "board.Platform.Instance",
            "board.Platform$$Object",
            "board.Platform.Object",
            "board.Platform$$Params",
            "board.Platform.Params",
        ] {
            assert!(om.has(p), "{p} should be bound");
        }
        let pkg_node = ctx.package(pkg).node;
        assert_eq!(
            om.get(pkg_node, "Platform"),
            Some(&Value::Node(ctx.module(id).node))
        );
        assert_eq!(ctx.module(id).state, Lifecycle::Declared);
    }

    #[test]
    fn steps_must_run_in_order() {
        let (mut ctx, pkg) = context_with_package("board");
        let mut b = ModuleBuilder::declare(&mut ctx, pkg, "Platform", None).unwrap();
        assert!(matches!(
            b.without_capsule(),
            Err(ModelError::OutOfOrder { step: "without_capsule", .. })
        ));
        b.declare_factories().unwrap();
        assert!(matches!(
            b.alias("Board", "board.Whatever"),
            Err(ModelError::OutOfOrder { step: "alias", .. })
        ));
        assert!(matches!(
            b.declare_factories(),
            Err(ModelError::OutOfOrder { .. })
        ));
        b.without_capsule().unwrap();
        let id = b.finish(&ModuleSchema::host()).unwrap();
        assert_eq!(ctx.module(id).state, Lifecycle::Typed);
    }

    #[test]
    fn finish_before_types_is_out_of_order() {
        let (mut ctx, pkg) = context_with_package("board");
        let b = ModuleBuilder::declare(&mut ctx, pkg, "Platform", None).unwrap();
        assert!(matches!(
            b.finish(&ModuleSchema::host()),
            Err(ModelError::OutOfOrder { step: "finish", .. })
        ));
    }

    #[test]
    fn factory_signatures_have_declared_arity() {
        let (mut ctx, pkg) = context_with_package("board");
        let mut b = ModuleBuilder::declare(&mut ctx, pkg, "Platform", None).unwrap();
        b.declare_factories().unwrap();
        let id = b.id();
        let om = ctx.om();
        let create = om.function_type(ctx.module(id).create_fn.unwrap()).unwrap();
        assert_eq!((create.min_args, create.max_args), (2, Some(3)));
        assert_eq!(create.args.len(), 3);
        assert_eq!(create.ret, Some(ctx.module(id).instance_proto));
        let construct = om.function_type(ctx.module(id).construct_fn.unwrap()).unwrap();
        assert_eq!((construct.min_args, construct.max_args), (2, Some(4)));
        assert!(construct.ret.is_none());
        assert_eq!(om.find_strict_proto("board.Platform$$create", None).ok(), ctx.module(id).create_fn);
    }

    struct Caps;

    impl PackageDef for Caps {
        fn name(&self) -> &str {
            "caps"
        }
        fn base(&self) -> Option<&str> {
            None
        }
        fn declare(&self, ctx: &mut BuildContext, pkg: PackageId, _: &dyn CapsuleLoader) -> Result<()> {
            let mut i = InterfaceBuilder::declare(ctx, pkg, "IBoard", None)?;
            i.record("Memory", &[FieldSpec::str("name", Value::Undef, FieldMode::W)])?;
            i.instance_fields(&[FieldSpec::str("codeMemory", Value::Undef, FieldMode::WH)])?;
            i.function("getExecCmd", None, &[])?;
            i.function("getLinkTemplate", None, &[])?;
            i.finish()?;
            Ok(())
        }
    }

    #[test]
    fn capsule_hooks_and_functions_are_installed() {
        let loader = crate::StaticLoader::new().with_capsule("board/Platform.xs", || {
            Capsule::new("board/Platform.xs")
                .with_module_meta_init(|_, _| Ok(()))
                .with_function("getExecCmd", |_, _, _| Ok(Value::from("run")))
        });
        let mut ctx = BuildContext::new();
        crate::package::build_package(&mut ctx, &Caps, &loader).unwrap();
        let pkg = bare_package(&mut ctx, "board");

        let mut b = ModuleBuilder::declare(&mut ctx, pkg, "Platform", Some("caps.IBoard")).unwrap();
        b.alias("Memory", "caps.IBoard.Memory").unwrap();
        b.declare_factories().unwrap();
        b.install_capsule(&loader, "board/Platform.xs").unwrap();
        let schema = ModuleSchema::host().instance_field(FieldSpec::str(
            "codeMemory",
            "DDR3_STATIC",
            FieldMode::WH,
        ));
        let id = b.finish(&schema).unwrap();

        let m = ctx.module(id);
        let om = ctx.om();
        assert!(om.has("board.Platform$$module$meta$init"));
        assert!(!om.has("board.Platform$$module$use"));
        assert!(om.lookup_function(m.module_proto, "module$meta$init").is_some());
        assert!(om.lookup_function(m.module_proto, "create").is_some());
        assert!(om.lookup_function(m.instance_proto, "getExecCmd").is_some());
        assert!(om.lookup_function(m.object_proto, "getExecCmd").is_some());
        assert!(om.lookup_function(m.instance_proto, "getLinkTemplate").is_none());

        let params = om.new_record(m.params_proto).unwrap();
        assert_eq!(params.get("codeMemory"), Some(&Value::from("DDR3_STATIC")));
        assert!(om.is_subtype(m.object_proto, m.instance_proto));
        assert!(m.aliases[0].tdef);
        assert!(m.icfgs.is_empty());
    }

    #[test]
    fn missing_interface_is_unresolved() {
        let (mut ctx, pkg) = context_with_package("board");
        assert!(matches!(
            ModuleBuilder::declare(&mut ctx, pkg, "Platform", Some("caps.INope")),
            Err(ModelError::UnresolvedReference { .. })
        ));
    }
}
