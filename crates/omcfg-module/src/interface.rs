//! Capability sets ("interfaces") that modules inherit.
//!
//! An interface contributes base prototypes for a module's Module, Instance
//! and Params structs, record types and aliases the module re-exports, and
//! a set of function prototypes whose implementations the module's capsule
//! may supply.

use omcfg_core::{
    path, ElementKind, FieldMode, ModelError, ProtoId, Prototype, Result, StructType, Value,
};
use tracing::debug;

use crate::context::BuildContext;
use crate::package::PackageId;

/// A field type, resolved against the registry when the field is added.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Element(ElementKind),
    /// A path, looked up strictly from the declaring package.
    Named(String),
    Proto(ProtoId),
}

impl TypeSpec {
    pub fn resolve(&self, ctx: &BuildContext, context: &str) -> Result<ProtoId> {
        match self {
            TypeSpec::Element(kind) => Ok(ctx.om().element(*kind)),
            TypeSpec::Named(p) => ctx.om().find_strict_proto(p, Some(context)),
            TypeSpec::Proto(id) => Ok(*id),
        }
    }
}

impl From<ElementKind> for TypeSpec {
    fn from(kind: ElementKind) -> Self {
        TypeSpec::Element(kind)
    }
}

impl From<ProtoId> for TypeSpec {
    fn from(id: ProtoId) -> Self {
        TypeSpec::Proto(id)
    }
}

impl From<&str> for TypeSpec {
    fn from(p: &str) -> Self {
        TypeSpec::Named(p.to_string())
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: TypeSpec,
    pub default: Value,
    pub mode: FieldMode,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        ty: impl Into<TypeSpec>,
        default: impl Into<Value>,
        mode: FieldMode,
    ) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default: default.into(),
            mode,
        }
    }

    pub fn str(name: impl Into<String>, default: impl Into<Value>, mode: FieldMode) -> Self {
        Self::new(name, ElementKind::Str, default, mode)
    }

    pub fn num(name: impl Into<String>, default: impl Into<Value>, mode: FieldMode) -> Self {
        Self::new(name, ElementKind::Num, default, mode)
    }

    pub fn bool(name: impl Into<String>, default: impl Into<Value>, mode: FieldMode) -> Self {
        Self::new(name, ElementKind::Bool, default, mode)
    }

    /// The `$hostonly` marker every host-side struct carries.
    pub fn host_only() -> Self {
        Self::num("$hostonly", 1i64, FieldMode::R)
    }
}

/// Add `fields` to struct `id`, resolving their types from `context`.
pub(crate) fn add_fields(
    ctx: &mut BuildContext,
    id: ProtoId,
    context: &str,
    fields: &[FieldSpec],
) -> Result<()> {
    for f in fields {
        let ty = f.ty.resolve(ctx, context)?;
        ctx.om_mut()
            .add_field(id, &f.name, ty, f.default.clone(), f.mode)?;
    }
    Ok(())
}

/// What a declared interface provides to the modules inheriting it.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceInfo {
    /// Fully qualified name, e.g. `xdc.platform.IPlatform`.
    pub name: String,
    pub package: String,
    pub module_proto: ProtoId,
    pub instance_proto: ProtoId,
    pub params_proto: ProtoId,
    /// Public functions, by name, with their prototypes.
    pub functions: Vec<(String, ProtoId)>,
}

/// Declares one interface. Types and functions may be added in any order;
/// [`InterfaceBuilder::finish`] finalizes the three structs and publishes
/// the interface.
pub struct InterfaceBuilder<'a> {
    ctx: &'a mut BuildContext,
    info: InterfaceInfo,
}

impl<'a> InterfaceBuilder<'a> {
    /// Bind `I.Module`, `I.Instance`, `I$$Params` and `I.Params`, deriving
    /// from `parent`'s structs when given.
    pub fn declare(
        ctx: &'a mut BuildContext,
        pkg: PackageId,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Self> {
        let package = ctx.package(pkg).name.clone();
        let qn = path::join(&package, name);
        let parent = match parent {
            Some(p) => Some(ctx.interface_strict(p, &package)?.clone()),
            None => None,
        };

        let om = ctx.om_mut();
        let module_proto = om.bind_proto(&format!("{qn}.Module"), skeleton())?;
        om.init_struct(
            module_proto,
            &format!("{qn}.Module"),
            parent.as_ref().map(|p| p.module_proto),
        )?;
        let instance_proto = om.bind_proto(&format!("{qn}.Instance"), skeleton())?;
        om.init_struct(
            instance_proto,
            &format!("{qn}.Instance"),
            parent.as_ref().map(|p| p.instance_proto),
        )?;
        let params_proto = om.bind_proto(&format!("{qn}$$Params"), skeleton())?;
        om.bind(&format!("{qn}.Params"), params_proto)?;
        om.init_struct(
            params_proto,
            &format!("{qn}.Params"),
            parent.as_ref().map(|p| p.params_proto),
        )?;

        let functions = parent.map(|p| p.functions).unwrap_or_default();
        debug!(interface = %qn, "interface declared");
        Ok(Self {
            ctx,
            info: InterfaceInfo {
                name: qn,
                package,
                module_proto,
                instance_proto,
                params_proto,
                functions,
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Declare a record type `I.<name>` and finalize it.
    pub fn record(&mut self, name: &str, fields: &[FieldSpec]) -> Result<ProtoId> {
        let path = path::join(&self.info.name, name);
        let id = self.ctx.om_mut().bind_proto(&path, skeleton())?;
        self.ctx.om_mut().init_struct(id, &path, None)?;
        self.ctx.om_mut().set_instantiable(id, true)?;
        add_fields(self.ctx, id, &self.info.package, fields)?;
        self.ctx.om_mut().finalize_struct(id)?;
        Ok(id)
    }

    /// Declare `I.<name>` as a keyed collection of `value`.
    pub fn map_typedef(&mut self, name: &str, value: impl Into<TypeSpec>) -> Result<ProtoId> {
        let value = value.into().resolve(self.ctx, &self.info.package)?;
        let om = self.ctx.om_mut();
        let map = om.new_map(value);
        let alias = om.new_typedef(map);
        om.bind(&path::join(&self.info.name, name), alias)?;
        Ok(alias)
    }

    pub fn module_fields(&mut self, fields: &[FieldSpec]) -> Result<&mut Self> {
        add_fields(self.ctx, self.info.module_proto, &self.info.package, fields)?;
        Ok(self)
    }

    /// Instance configuration: declared on both Instance and Params.
    pub fn instance_fields(&mut self, fields: &[FieldSpec]) -> Result<&mut Self> {
        add_fields(self.ctx, self.info.instance_proto, &self.info.package, fields)?;
        add_fields(self.ctx, self.info.params_proto, &self.info.package, fields)?;
        Ok(self)
    }

    /// Declare a public function `I$$<name>` taking `args`.
    pub fn function(
        &mut self,
        name: &str,
        ret: Option<TypeSpec>,
        args: &[(&str, TypeSpec)],
    ) -> Result<ProtoId> {
        if self.info.functions.iter().any(|(n, _)| n == name) {
            return Err(ModelError::DuplicateField {
                owner: self.info.name.clone(),
                field: name.to_string(),
            });
        }
        let ret = match ret {
            Some(t) => Some(t.resolve(self.ctx, &self.info.package)?),
            None => None,
        };
        let mut resolved = Vec::with_capacity(args.len());
        for (arg, ty) in args {
            resolved.push((*arg, ty.resolve(self.ctx, &self.info.package)?));
        }
        let om = self.ctx.om_mut();
        let f = om.new_function(
            Some(self.info.module_proto),
            ret,
            args.len(),
            Some(args.len()),
            false,
        );
        for (arg, ty) in resolved {
            om.add_arg(f, arg, Some(ty), Value::Undef)?;
        }
        om.bind(&format!("{}$${name}", self.info.name), f)?;
        self.info.functions.push((name.to_string(), f));
        Ok(f)
    }

    /// Finalize the interface structs and publish the interface.
    pub fn finish(self) -> Result<InterfaceInfo> {
        let om = self.ctx.om_mut();
        om.finalize_struct(self.info.module_proto)?;
        om.finalize_struct(self.info.instance_proto)?;
        om.finalize_struct(self.info.params_proto)?;
        let pkg = self
            .ctx
            .find_package(&self.info.package)
            .ok_or_else(|| ModelError::UnresolvedReference {
                path: self.info.package.clone(),
                context: self.info.name.clone(),
            })?;
        let unit = path::split_last(&self.info.name).1.to_string();
        let state = self.ctx.package_mut(pkg);
        state.interfaces.push(self.info.name.clone());
        state.unit_names.push(unit);
        self.ctx.add_interface(self.info.clone());
        Ok(self.info)
    }
}

fn skeleton() -> Prototype {
    Prototype::Struct(StructType::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{build_package, PackageDef};
    use crate::StaticLoader;

    struct Iface;

    impl PackageDef for Iface {
        fn name(&self) -> &str {
            "caps"
        }

        fn base(&self) -> Option<&str> {
            None
        }

        fn declare(
            &self,
            ctx: &mut BuildContext,
            pkg: PackageId,
            _: &dyn crate::CapsuleLoader,
        ) -> Result<()> {
            let mut b = InterfaceBuilder::declare(ctx, pkg, "IBoard", None)?;
            b.record(
                "Memory",
                &[
                    FieldSpec::str("name", Value::Undef, FieldMode::W),
                    FieldSpec::num("base", Value::Undef, FieldMode::W),
                ],
            )?;
            b.map_typedef("MemoryMap", "IBoard.Memory")?;
            b.instance_fields(&[FieldSpec::new(
                "memoryMap",
                "IBoard.MemoryMap",
                Value::Undef,
                FieldMode::W,
            )])?;
            b.function(
                "getExecCmd",
                Some(TypeSpec::Element(ElementKind::Str)),
                &[("prog", TypeSpec::Element(ElementKind::Obj))],
            )?;
            let err = b.function("getExecCmd", None, &[]).unwrap_err();
            assert!(matches!(err, ModelError::DuplicateField { .. }));
            b.finish()?;
            Ok(())
        }
    }

    #[test]
    fn interface_binds_types_and_functions() {
        let mut ctx = BuildContext::new();
        build_package(&mut ctx, &Iface, &StaticLoader::new()).unwrap();
        let om = ctx.om();
        assert!(om.has("caps.IBoard.Module"));
        assert!(om.has("caps.IBoard$$Params"));
        assert!(om.has("caps.IBoard.Params"));
        assert!(om.has("caps.IBoard.Memory"));
        assert!(om.has("caps.IBoard$$getExecCmd"));

        let info = ctx.interface("caps.IBoard").unwrap();
        assert_eq!(info.functions.len(), 1);
        let fields = om.fields(info.params_proto).unwrap();
        assert_eq!(fields[0].name, "memoryMap");
        let f = om.function_type(info.functions[0].1).unwrap();
        assert_eq!(f.arity(), "1..=1");
        assert_eq!(ctx.package(ctx.find_package("caps").unwrap()).unit_names, vec!["IBoard"]);
    }
}
