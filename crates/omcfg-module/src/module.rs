//! Module records and their lifecycle.

use std::fmt;

use omcfg_core::{ModelError, NodeId, ProtoId, Result};
use tracing::debug;

use crate::capsule::Capsule;
use crate::package::PackageId;

/// Handle of a module in the build context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) usize);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// Module lifecycle. Transitions are strictly forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Skeleton prototypes bound.
    Declared,
    /// Capsule loaded and field schema finalized.
    Typed,
    /// Runtime fields bound on the singleton node.
    SingletonBound,
    /// Attribute map sealed, module registered.
    Sealed,
    /// `module$meta$init` has run.
    Initialized,
}

impl Lifecycle {
    fn next(self) -> Option<Lifecycle> {
        match self {
            Lifecycle::Declared => Some(Lifecycle::Typed),
            Lifecycle::Typed => Some(Lifecycle::SingletonBound),
            Lifecycle::SingletonBound => Some(Lifecycle::Sealed),
            Lifecycle::Sealed => Some(Lifecycle::Initialized),
            Lifecycle::Initialized => None,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Declared => "DECLARED",
            Lifecycle::Typed => "TYPED",
            Lifecycle::SingletonBound => "SINGLETON-BOUND",
            Lifecycle::Sealed => "SEALED",
            Lifecycle::Initialized => "INITIALIZED",
        };
        f.write_str(s)
    }
}

/// A type alias a module re-exports from the capability set it implements.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAlias {
    pub local: String,
    pub target: String,
    pub proto: ProtoId,
    /// Listed in the module's `$$tdefs`. Collection aliases such as
    /// `MemoryMap` are bound on the singleton but not listed.
    pub tdef: bool,
}

/// Everything the build context knows about one module.
#[derive(Debug, Clone)]
pub struct ModuleState {
    /// Fully qualified name, e.g. `platform.evm6678.Platform`.
    pub name: String,
    pub package: PackageId,
    /// The singleton node bound at `name`.
    pub node: NodeId,
    pub module_proto: ProtoId,
    pub instance_proto: ProtoId,
    pub params_proto: ProtoId,
    pub object_proto: ProtoId,
    pub create_fn: Option<ProtoId>,
    pub construct_fn: Option<ProtoId>,
    pub capsule: Option<Capsule>,
    /// Instances in creation order; position is the instance's `$index`.
    pub instances: Vec<NodeId>,
    /// Records wired up through `construct`.
    pub objects: Vec<NodeId>,
    pub inherits: Vec<String>,
    pub aliases: Vec<TypeAlias>,
    pub proxies: Vec<ProtoId>,
    pub mcfgs: Vec<String>,
    pub icfgs: Vec<String>,
    pub state: Lifecycle,
}

impl ModuleState {
    /// Move one step forward. Anything else is a lifecycle violation.
    pub fn advance(&mut self, to: Lifecycle) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(ModelError::LifecycleViolation {
                module: self.name.clone(),
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        debug!(module = %self.name, from = %self.state, %to, "lifecycle");
        self.state = to;
        Ok(())
    }

    /// Require the module to be at `min` or later.
    pub fn require(&self, min: Lifecycle, operation: &str) -> Result<()> {
        if self.state < min {
            return Err(ModelError::LifecycleViolation {
                module: self.name.clone(),
                from: self.state.to_string(),
                to: format!("{operation} (needs {min})"),
            });
        }
        Ok(())
    }

    /// The package-relative unit name (`Platform` for `a.b.Platform`).
    pub fn unit_name(&self) -> &str {
        omcfg_core::path::split_last(&self.name).1
    }
}
