//! `xdc`: the root package. Its `IPackage` interface supplies the base
//! prototype of every other package singleton.

use omcfg_core::{FieldMode, Result, Value};
use omcfg_module::{BuildContext, CapsuleLoader, FieldSpec, InterfaceBuilder, PackageDef, PackageId};

pub struct Xdc;

impl PackageDef for Xdc {
    fn name(&self) -> &str {
        "xdc"
    }

    fn base(&self) -> Option<&str> {
        None
    }

    fn declare(&self, ctx: &mut BuildContext, pkg: PackageId, _: &dyn CapsuleLoader) -> Result<()> {
        let mut i = InterfaceBuilder::declare(ctx, pkg, "IPackage", None)?;
        i.module_fields(&[
            FieldSpec::str("packageBase", Value::Undef, FieldMode::W),
            FieldSpec::str("packageRepository", Value::Undef, FieldMode::W),
        ])?;
        i.finish()?;
        Ok(())
    }
}
