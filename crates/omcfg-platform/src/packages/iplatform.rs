//! `xdc.platform`: the `IPlatform` interface every board module inherits.

use omcfg_core::{ElementKind, FieldMode, Result, Value, ValueMap};
use omcfg_module::{
    BuildContext, CapsuleLoader, FieldSpec, InterfaceBuilder, PackageDef, PackageId, TypeSpec,
};

pub const IPLATFORM: &str = "xdc.platform.IPlatform";

pub struct XdcPlatform;

impl PackageDef for XdcPlatform {
    fn name(&self) -> &str {
        "xdc.platform"
    }

    fn imports(&self) -> Vec<String> {
        vec!["xdc".to_string()]
    }

    fn declare(&self, ctx: &mut BuildContext, pkg: PackageId, _: &dyn CapsuleLoader) -> Result<()> {
        let mut i = InterfaceBuilder::declare(ctx, pkg, "IPlatform", None)?;
        i.record(
            "Board",
            &[
                FieldSpec::str("id", Value::Undef, FieldMode::W),
                FieldSpec::str("boardName", Value::Undef, FieldMode::W),
                FieldSpec::str("boardFamily", Value::Undef, FieldMode::W),
                FieldSpec::str("boardRevision", Value::Undef, FieldMode::W),
            ],
        )?;
        let memory = i.record(
            "Memory",
            &[
                FieldSpec::str("comment", Value::Undef, FieldMode::W),
                FieldSpec::str("name", Value::Undef, FieldMode::W),
                FieldSpec::str("space", Value::Undef, FieldMode::W),
                FieldSpec::num("page", Value::Undef, FieldMode::W),
                FieldSpec::num("base", Value::Undef, FieldMode::W),
                FieldSpec::num("len", Value::Undef, FieldMode::W),
                FieldSpec::str("access", Value::Undef, FieldMode::W),
                FieldSpec::bool("cacheable", Value::Undef, FieldMode::W),
                FieldSpec::bool("cacheMemory", Value::Undef, FieldMode::W),
                FieldSpec::bool("isVirtual", Value::Undef, FieldMode::W),
            ],
        )?;
        let memory_map = i.map_typedef("MemoryMap", memory)?;

        i.instance_fields(&[
            FieldSpec::new("externalMemoryMap", memory_map, ValueMap::new(), FieldMode::W),
            FieldSpec::new("customMemoryMap", memory_map, ValueMap::new(), FieldMode::W),
            FieldSpec::new("renameMap", ElementKind::Obj, Value::Undef, FieldMode::W),
            FieldSpec::str("dataMemory", Value::Undef, FieldMode::W),
            FieldSpec::str("codeMemory", Value::Undef, FieldMode::W),
            FieldSpec::str("stackMemory", Value::Undef, FieldMode::W),
            FieldSpec::new("sectMap", ElementKind::Obj, Value::Undef, FieldMode::W),
        ])?;

        let str_t = || Some(TypeSpec::Element(ElementKind::Str));
        let obj_t = || TypeSpec::Element(ElementKind::Obj);
        i.function(
            "getCpuDataSheet",
            Some(obj_t()),
            &[("cpuId", TypeSpec::Element(ElementKind::Str))],
        )?;
        i.function("getCreateArgs", Some(obj_t()), &[])?;
        i.function("getExeContext", str_t(), &[("prog", obj_t())])?;
        i.function(
            "getExecCmd",
            str_t(),
            &[("prog", obj_t()), ("platPath", TypeSpec::Element(ElementKind::Str))],
        )?;
        i.function("getLinkTemplate", str_t(), &[("prog", obj_t())])?;
        i.finish()?;
        Ok(())
    }
}
