//! Collaborator seams: loading dependency packages and capsules.

use std::collections::HashMap;
use std::rc::Rc;

use omcfg_core::{Collaborator, ModelError, Result};
use tracing::debug;

use crate::capsule::Capsule;
use crate::context::BuildContext;
use crate::package::{build_package, PackageDef};

/// Loads a dependency package into the context. Loading a package that is
/// already present must be a no-op.
pub trait PackageLoader {
    fn load_package(&self, ctx: &mut BuildContext, context: &str, name: &str) -> Result<()>;
}

/// Resolves a capsule path, relative to the loading module, to its hooks
/// and public functions.
pub trait CapsuleLoader {
    fn load_capsule(&self, context: &str, path: &str) -> Result<Capsule>;
}

type CapsuleCtor = Rc<dyn Fn() -> Capsule>;

/// In-process loader backed by registered package definitions and capsule
/// constructors.
#[derive(Default, Clone)]
pub struct StaticLoader {
    packages: HashMap<String, Rc<dyn PackageDef>>,
    capsules: HashMap<String, CapsuleCtor>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, def: impl PackageDef + 'static) -> Self {
        self.add_package(def);
        self
    }

    pub fn add_package(&mut self, def: impl PackageDef + 'static) {
        self.packages.insert(def.name().to_string(), Rc::new(def));
    }

    pub fn with_capsule(
        mut self,
        path: impl Into<String>,
        ctor: impl Fn() -> Capsule + 'static,
    ) -> Self {
        self.capsules.insert(path.into(), Rc::new(ctor));
        self
    }

    pub fn package_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.packages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Load `name` and everything it imports from the root context.
    pub fn load(&self, ctx: &mut BuildContext, name: &str) -> Result<()> {
        self.load_package(ctx, "<root>", name)
    }
}

impl PackageLoader for StaticLoader {
    fn load_package(&self, ctx: &mut BuildContext, context: &str, name: &str) -> Result<()> {
        if ctx.find_package(name).is_some() {
            debug!(package = name, "already loaded");
            return Ok(());
        }
        let def = self
            .packages
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::CollaboratorFailure {
                collaborator: Collaborator::PackageLoader,
                context: context.to_string(),
                target: name.to_string(),
                detail: "no such package".to_string(),
            })?;
        build_package(ctx, def.as_ref(), self)?;
        Ok(())
    }
}

impl CapsuleLoader for StaticLoader {
    fn load_capsule(&self, context: &str, path: &str) -> Result<Capsule> {
        let ctor = self
            .capsules
            .get(path)
            .ok_or_else(|| ModelError::CollaboratorFailure {
                collaborator: Collaborator::CapsuleLoader,
                context: context.to_string(),
                target: path.to_string(),
                detail: "no such capsule".to_string(),
            })?;
        debug!(context, path, "capsule loaded");
        Ok(ctor())
    }
}
