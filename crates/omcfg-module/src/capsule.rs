//! Capsules: the optional hooks and public functions a module's type
//! definition supplies.
//!
//! Hooks are looked up once, when the capsule is loaded; every hook slot is
//! an `Option`, so callers check presence instead of probing by name.

use std::fmt;
use std::rc::Rc;

use omcfg_core::{NodeId, Result, Value};

use crate::context::BuildContext;
use crate::module::ModuleId;

/// A module-level hook: `module$use`, `module$meta$init`, `module$validate`.
pub type ModuleHook = Rc<dyn Fn(&mut BuildContext, ModuleId) -> Result<()>>;

/// `instance$meta$init(name, args)`, run on the instance being created.
pub type InstanceHook = Rc<dyn Fn(&mut BuildContext, ModuleId, NodeId, &str, &Value) -> Result<()>>;

/// A public query function, called on an instance.
pub type QueryFn = Rc<dyn Fn(&mut BuildContext, NodeId, &[Value]) -> Result<Value>>;

/// The four well-known hook names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    ModuleUse,
    ModuleMetaInit,
    InstanceMetaInit,
    ModuleValidate,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::ModuleUse,
        HookKind::ModuleMetaInit,
        HookKind::InstanceMetaInit,
        HookKind::ModuleValidate,
    ];

    /// The registry name of the hook.
    pub fn name(self) -> &'static str {
        match self {
            HookKind::ModuleUse => "module$use",
            HookKind::ModuleMetaInit => "module$meta$init",
            HookKind::InstanceMetaInit => "instance$meta$init",
            HookKind::ModuleValidate => "module$validate",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A loaded capsule.
#[derive(Clone, Default)]
pub struct Capsule {
    path: String,
    module_use: Option<ModuleHook>,
    module_meta_init: Option<ModuleHook>,
    instance_meta_init: Option<InstanceHook>,
    module_validate: Option<ModuleHook>,
    functions: Vec<(String, QueryFn)>,
}

impl Capsule {
    /// An empty capsule loaded from `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn with_module_use(
        mut self,
        f: impl Fn(&mut BuildContext, ModuleId) -> Result<()> + 'static,
    ) -> Self {
        self.module_use = Some(Rc::new(f));
        self
    }

    pub fn with_module_meta_init(
        mut self,
        f: impl Fn(&mut BuildContext, ModuleId) -> Result<()> + 'static,
    ) -> Self {
        self.module_meta_init = Some(Rc::new(f));
        self
    }

    pub fn with_instance_meta_init(
        mut self,
        f: impl Fn(&mut BuildContext, ModuleId, NodeId, &str, &Value) -> Result<()> + 'static,
    ) -> Self {
        self.instance_meta_init = Some(Rc::new(f));
        self
    }

    pub fn with_module_validate(
        mut self,
        f: impl Fn(&mut BuildContext, ModuleId) -> Result<()> + 'static,
    ) -> Self {
        self.module_validate = Some(Rc::new(f));
        self
    }

    /// Supply a public function. A later definition of the same name wins.
    pub fn with_function(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut BuildContext, NodeId, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        let name = name.into();
        self.functions.retain(|(n, _)| *n != name);
        self.functions.push((name, Rc::new(f)));
        self
    }

    pub fn has(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::ModuleUse => self.module_use.is_some(),
            HookKind::ModuleMetaInit => self.module_meta_init.is_some(),
            HookKind::InstanceMetaInit => self.instance_meta_init.is_some(),
            HookKind::ModuleValidate => self.module_validate.is_some(),
        }
    }

    /// The module-level hook of that kind, if supplied.
    pub fn module_hook(&self, kind: HookKind) -> Option<ModuleHook> {
        match kind {
            HookKind::ModuleUse => self.module_use.clone(),
            HookKind::ModuleMetaInit => self.module_meta_init.clone(),
            HookKind::ModuleValidate => self.module_validate.clone(),
            HookKind::InstanceMetaInit => None,
        }
    }

    pub fn instance_meta_init(&self) -> Option<InstanceHook> {
        self.instance_meta_init.clone()
    }

    pub fn function(&self, name: &str) -> Option<QueryFn> {
        self.functions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f.clone())
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|(n, _)| n == name)
    }
}

impl fmt::Debug for Capsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<&str> = HookKind::ALL
            .iter()
            .filter(|k| self.has(**k))
            .map(|k| k.name())
            .collect();
        f.debug_struct("Capsule")
            .field("path", &self.path)
            .field("hooks", &hooks)
            .field(
                "functions",
                &self.functions.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
