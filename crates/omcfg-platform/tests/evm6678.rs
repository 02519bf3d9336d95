use omcfg_core::{ModelError, Record, Value};
use omcfg_module::{create, invoke_instance, Lifecycle};
use omcfg_platform::parse::{load_platform_toml, platform_to_toml};
use omcfg_platform::{
    build_platform, MemoryOverrides, MemoryRegion, PlatformBuild, PlatformDefinition, PlatformError,
};

fn evm() -> PlatformBuild {
    build_platform(&PlatformDefinition::evm6678(), &MemoryOverrides::default()).unwrap()
}

#[test]
fn evm6678_cpu_configuration() {
    let cpu = evm().cpu_config().unwrap();
    assert_eq!(cpu.platform, "evm6678");
    assert_eq!(cpu.clock_rate, 1000);
    assert_eq!(cpu.catalog_name, "ti.catalog.c6000");
    assert_eq!(cpu.device_name, "TMS320C6678");
    assert_eq!(cpu.l1p_mode.as_deref(), Some("32k"));
    assert_eq!(cpu.l1d_mode.as_deref(), Some("32k"));
    assert_eq!(cpu.l2_mode.as_deref(), Some("128k"));

    let expected: [(&str, u32, u32); 9] = [
        ("L2SRAM0", 0x0080_0000, 0x80),
        ("L2SRAM1", 0x0080_0080, 0x2_bf80),
        ("L2SRAM", 0x0082_c000, 0x3_4000),
        ("MSMCSRAM", 0x0C00_0000, 0x30_0000),
        ("DDR3", 0x8000_0000, 0x3EE0_0000),
        ("MSMCSRAM_NOCACHE", 0xBEE0_0000, 0x10_0000),
        ("DDR3_STATIC", 0xBEF0_0000, 0x10_0000),
        ("DDR3_NOCACHE0", 0xBF00_0000, 0x80_0000),
        ("DDR3_NOCACHE1", 0xBF80_0000, 0x80_0000),
    ];
    let expected: Vec<MemoryRegion> = expected
        .iter()
        .map(|&(name, base, len)| MemoryRegion::new(name, base, len))
        .collect();
    assert_eq!(cpu.memory_map, expected);

    assert_eq!(cpu.code_memory, "DDR3_STATIC");
    assert_eq!(cpu.data_memory, "MSMCSRAM_NOCACHE");
    assert_eq!(cpu.stack_memory, "L2SRAM1");
}

#[test]
fn module_singleton_shape() {
    let build = evm();
    let ctx = build.ctx();
    let m = ctx.module(build.module());
    assert_eq!(m.name, "platform.evm6678.Platform");
    assert_eq!(m.state, Lifecycle::Initialized);

    let om = ctx.om();
    let node = om.node(m.node);
    assert!(node.is_blessed());
    let params = node.get("PARAMS").and_then(Value::as_record).unwrap();
    assert_eq!(params.get("codeMemory"), Some(&Value::from("DDR3_STATIC")));
    assert_eq!(params.get("dataMemory"), Some(&Value::from("MSMCSRAM_NOCACHE")));
    assert_eq!(params.get("stackMemory"), Some(&Value::from("L2SRAM1")));
    assert_eq!(
        node.get("$$inherits"),
        Some(&Value::Array(vec![Value::from("xdc.platform")]))
    );
    assert_eq!(node.get("$hostonly"), Some(&Value::Num(1)));
    // Board and Memory are record types; MemoryMap is a typedef.
    assert_eq!(node.get("$$tdefs").and_then(Value::as_array).map(<[Value]>::len), Some(2));
    for alias in ["Board", "Memory", "MemoryMap"] {
        assert!(om.has(&format!("platform.evm6678.Platform.{alias}")), "{alias}");
    }
    assert!(om.has("platform.evm6678.Platform$$capsule"));
    assert!(om.has("platform.evm6678.Platform$$module$validate"));
    assert!(!om.has("platform.evm6678.Platform$$module$use"));

    let packages: Vec<&str> = ctx
        .registered_packages()
        .iter()
        .map(|&p| ctx.package(p).name.as_str())
        .collect();
    assert_eq!(
        packages,
        ["xdc", "xdc.platform", "ti.platforms.generic", "platform.evm6678"]
    );
}

#[test]
fn cpu_instance_is_sealed_and_indexed() {
    let mut ctx = evm().into_context();
    let module = ctx.find_module_strict("platform.evm6678.Platform").unwrap();
    let cpu = ctx
        .om()
        .get(ctx.module(module).node, "CPU")
        .and_then(Value::as_node)
        .unwrap();
    assert_eq!(ctx.om().get(cpu, "$index"), Some(&Value::Num(0)));
    assert!(matches!(
        ctx.om_mut().set(cpu, "clockRate", 1200i64),
        Err(ModelError::SealedRecord { .. })
    ));
}

#[test]
fn section_overrides() {
    let overrides = MemoryOverrides {
        code_memory: Some("DDR3".into()),
        stack_memory: Some("L2SRAM".into()),
        ..Default::default()
    };
    let build = build_platform(&PlatformDefinition::evm6678(), &overrides).unwrap();
    let cpu = build.cpu_config().unwrap();
    assert_eq!(cpu.code_memory, "DDR3");
    assert_eq!(cpu.data_memory, "MSMCSRAM_NOCACHE");
    assert_eq!(cpu.stack_memory, "L2SRAM");

    // The module defaults are untouched.
    let ctx = build.ctx();
    let node = ctx.module(build.module()).node;
    let params = ctx.om().get(node, "PARAMS").and_then(Value::as_record).unwrap();
    assert_eq!(params.get("codeMemory"), Some(&Value::from("DDR3_STATIC")));
}

#[test]
fn override_outside_the_memory_map_fails() {
    let overrides = MemoryOverrides {
        data_memory: Some("IRAM".into()),
        ..Default::default()
    };
    let err = build_platform(&PlatformDefinition::evm6678(), &overrides).unwrap_err();
    assert!(matches!(
        err,
        PlatformError::Model(ModelError::Hook { ref detail, .. }) if detail.contains("dataMemory 'IRAM'")
    ));
}

#[test]
fn platform_queries() {
    let build = evm();
    let board = build.board();
    let mut ctx = build.into_context();

    let sheet = invoke_instance(&mut ctx, board, "getCpuDataSheet", &[Value::from("0")]).unwrap();
    let sheet = sheet.as_record().unwrap();
    assert_eq!(sheet.get("deviceName"), Some(&Value::from("TMS320C6678")));
    assert_eq!(sheet.get("clockRate"), Some(&Value::Num(1000)));

    let args = invoke_instance(&mut ctx, board, "getCreateArgs", &[]).unwrap();
    let map = args
        .as_record()
        .and_then(|r| r.get("customMemoryMap"))
        .and_then(Value::as_map)
        .unwrap();
    assert_eq!(map.len(), 9);

    let exe = invoke_instance(&mut ctx, board, "getExeContext", &[Value::Undef]).unwrap();
    assert_eq!(exe, Value::from("ti.catalog.c6000.TMS320C6678"));

    let prog = Record::new().with("name", "hello.xe66");
    let cmd = invoke_instance(
        &mut ctx,
        board,
        "getExecCmd",
        &[prog.into(), Value::from("/opt/platforms")],
    )
    .unwrap();
    assert_eq!(
        cmd,
        Value::from("@$(ECHO) platform.evm6678 platform cannot execute hello.xe66")
    );

    let tmpl = invoke_instance(&mut ctx, board, "getLinkTemplate", &[Value::Undef]).unwrap();
    assert_eq!(tmpl, Value::from("ti/platforms/generic/linkcmd.xdt"));

    assert!(matches!(
        invoke_instance(&mut ctx, board, "getExecCmd", &[Value::Undef]),
        Err(ModelError::ArityMismatch { .. })
    ));
}

#[test]
fn generic_platform_rejects_unknown_arguments() {
    let mut ctx = evm().into_context();
    let generic = ctx.find_module_strict("ti.platforms.generic.Platform").unwrap();
    let args = Record::new()
        .with("deviceName", "TMS320C6657")
        .with("catalogName", "ti.catalog.c6000")
        .with("cacheSize", 4i64);
    let err = create(&mut ctx, generic, "cpu2", args.into(), None).unwrap_err();
    assert!(matches!(err, ModelError::Hook { ref detail, .. } if detail.contains("cacheSize")));

    let err = create(&mut ctx, generic, "cpu3", Value::Undef, None).unwrap_err();
    assert!(matches!(err, ModelError::Hook { ref detail, .. } if detail.contains("is required")));
}

#[test]
fn definition_file_builds_the_same_platform() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evm6678.platform.toml");
    std::fs::write(&path, platform_to_toml(&PlatformDefinition::evm6678()).unwrap()).unwrap();

    let def = load_platform_toml(&path).unwrap();
    let from_file = build_platform(&def, &MemoryOverrides::default())
        .unwrap()
        .cpu_config()
        .unwrap();
    let builtin = evm().cpu_config().unwrap();
    assert_eq!(from_file, builtin);
    assert_eq!(from_file.fingerprint().unwrap(), builtin.fingerprint().unwrap());
}

#[test]
fn custom_board_from_toml() {
    let toml_str = r#"
name = "dsk"
package = "platform.dsk"
catalog-name = "ti.catalog.c6000"
device-name = "TMS320C6657"
clock-rate = 850
code-memory = "DDR3"
data-memory = "DDR3"
stack-memory = "L2SRAM"

[[memory-map]]
name = "L2SRAM"
base = 0x00800000
len = 0x100000

[[memory-map]]
name = "DDR3"
base = 0x80000000
len = 0x20000000
"#;
    let def = omcfg_platform::parse::parse_platform_toml(toml_str).unwrap();
    let build = build_platform(&def, &MemoryOverrides::default()).unwrap();
    let cpu = build.cpu_config().unwrap();
    assert_eq!(cpu.platform, "dsk");
    assert_eq!(cpu.clock_rate, 850);
    assert!(cpu.l2_mode.is_none());
    assert_eq!(cpu.memory_map.len(), 2);
    assert!(build.ctx().find_module("platform.dsk.Platform").is_some());
}
