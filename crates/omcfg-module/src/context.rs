//! The build context: the single store of record for one build.

use omcfg_core::{Collaborator, ModelError, ObjectModel, Result};
use tracing::info;

use crate::interface::InterfaceInfo;
use crate::module::{ModuleId, ModuleState};
use crate::package::{PackageId, PackageState};

/// Owns the registry plus the typed side tables that modules, packages and
/// interfaces keep outside it. Passed by `&mut` through every operation.
#[derive(Debug, Default)]
pub struct BuildContext {
    om: ObjectModel,
    modules: Vec<ModuleState>,
    packages: Vec<PackageState>,
    interfaces: Vec<InterfaceInfo>,
    current_package: Option<String>,
    /// Packages whose build has started but not finished, outermost first.
    building: Vec<String>,
    /// The global `$modules` collection.
    registered_modules: Vec<ModuleId>,
    /// The global `$packages` collection.
    registered_packages: Vec<PackageId>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn om(&self) -> &ObjectModel {
        &self.om
    }

    pub fn om_mut(&mut self) -> &mut ObjectModel {
        &mut self.om
    }

    // --- modules ---

    pub(crate) fn add_module(&mut self, state: ModuleState) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(state);
        id
    }

    /// Panics on a handle from another context.
    pub fn module(&self, id: ModuleId) -> &ModuleState {
        &self.modules[id.0]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut ModuleState {
        &mut self.modules[id.0]
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &ModuleState)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleId(i), m))
    }

    /// Lenient lookup by qualified name, then relative to the current package.
    pub fn find_module(&self, name: &str) -> Option<ModuleId> {
        let by_name = |n: &str| self.modules.iter().position(|m| m.name == n).map(ModuleId);
        by_name(name).or_else(|| {
            let pkg = self.current_package.as_deref()?;
            by_name(&omcfg_core::path::join(pkg, name))
        })
    }

    pub fn find_module_strict(&self, name: &str) -> Result<ModuleId> {
        self.find_module(name)
            .ok_or_else(|| ModelError::UnresolvedReference {
                path: name.to_string(),
                context: self.current_package.as_deref().unwrap_or("<root>").to_string(),
            })
    }

    /// The module whose singleton is `node`, if any.
    pub fn module_by_node(&self, node: omcfg_core::NodeId) -> Option<ModuleId> {
        self.modules.iter().position(|m| m.node == node).map(ModuleId)
    }

    // --- packages ---

    pub(crate) fn add_package(&mut self, state: PackageState) -> PackageId {
        let id = PackageId(self.packages.len());
        self.packages.push(state);
        id
    }

    pub fn package(&self, id: PackageId) -> &PackageState {
        &self.packages[id.0]
    }

    pub fn package_mut(&mut self, id: PackageId) -> &mut PackageState {
        &mut self.packages[id.0]
    }

    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &PackageState)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (PackageId(i), p))
    }

    pub fn find_package(&self, name: &str) -> Option<PackageId> {
        self.packages.iter().position(|p| p.name == name).map(PackageId)
    }

    // --- interfaces ---

    pub(crate) fn add_interface(&mut self, info: InterfaceInfo) {
        self.interfaces.push(info);
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceInfo> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn interface_strict(&self, name: &str, context: &str) -> Result<&InterfaceInfo> {
        self.interface(name)
            .or_else(|| self.interface(&omcfg_core::path::join(context, name)))
            .ok_or_else(|| ModelError::UnresolvedReference {
                path: name.to_string(),
                context: context.to_string(),
            })
    }

    // --- current package ---

    pub fn current_package(&self) -> Option<&str> {
        self.current_package.as_deref()
    }

    /// Replace the current package, returning the previous one so the caller
    /// can restore it.
    pub fn set_current_package(&mut self, package: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.current_package, package)
    }

    // --- build stack ---

    /// Push `name` onto the build stack. A package that is already being
    /// built imports itself through some chain; that chain is reported.
    pub(crate) fn enter_package(&mut self, name: &str) -> Result<()> {
        if let Some(start) = self.building.iter().position(|p| p == name) {
            let mut cycle: Vec<&str> = self.building[start..].iter().map(String::as_str).collect();
            cycle.push(name);
            return Err(ModelError::CollaboratorFailure {
                collaborator: Collaborator::PackageLoader,
                context: self.building.last().cloned().unwrap_or_default(),
                target: name.to_string(),
                detail: format!("import cycle: {}", cycle.join(" -> ")),
            });
        }
        self.building.push(name.to_string());
        Ok(())
    }

    pub(crate) fn leave_package(&mut self, name: &str) {
        if let Some(pos) = self.building.iter().rposition(|p| p == name) {
            self.building.truncate(pos);
        }
    }

    // --- global collections ---

    /// Append to `$modules`. A module is registered exactly once.
    pub(crate) fn register_module(&mut self, id: ModuleId) -> Result<()> {
        if self.registered_modules.contains(&id) {
            return Err(ModelError::DuplicateBinding {
                path: format!("$modules[{}]", self.module(id).name),
            });
        }
        self.registered_modules.push(id);
        Ok(())
    }

    /// Append to `$packages`. A package is registered exactly once.
    pub(crate) fn register_package(&mut self, id: PackageId) -> Result<()> {
        if self.registered_packages.contains(&id) {
            return Err(ModelError::DuplicateBinding {
                path: format!("$packages[{}]", self.package(id).name),
            });
        }
        info!(package = %self.package(id).name, "package registered");
        self.registered_packages.push(id);
        Ok(())
    }

    pub fn registered_modules(&self) -> &[ModuleId] {
        &self.registered_modules
    }

    pub fn registered_packages(&self) -> &[PackageId] {
        &self.registered_packages
    }

    pub fn is_registered(&self, package: &str) -> bool {
        self.find_package(package)
            .is_some_and(|id| self.registered_packages.contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_package_swap_and_restore() {
        let mut ctx = BuildContext::new();
        assert!(ctx.current_package().is_none());
        let saved = ctx.set_current_package(Some("ti.platforms.generic".into()));
        assert_eq!(ctx.current_package(), Some("ti.platforms.generic"));
        ctx.set_current_package(saved);
        assert!(ctx.current_package().is_none());
    }

    #[test]
    fn build_stack_reports_cycles() {
        let mut ctx = BuildContext::new();
        ctx.enter_package("a").unwrap();
        ctx.enter_package("b").unwrap();
        let err = ctx.enter_package("a").unwrap_err();
        assert!(matches!(
            err,
            ModelError::CollaboratorFailure { ref context, ref target, ref detail, .. }
                if context == "b" && target == "a" && detail == "import cycle: a -> b -> a"
        ));
        ctx.leave_package("b");
        ctx.leave_package("a");
        ctx.enter_package("a").unwrap();
    }

    #[test]
    fn strict_module_lookup_names_context() {
        let mut ctx = BuildContext::new();
        ctx.set_current_package(Some("board".into()));
        let err = ctx.find_module_strict("Platform").unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnresolvedReference { ref path, ref context }
                if path == "Platform" && context == "board"
        ));
    }
}
