//! Modules, instances and packages on top of the object-model registry.
//!
//! A package build goes through [`build_package`]: dependency packages are
//! loaded first, then the package declares its interfaces
//! ([`InterfaceBuilder`]) and module descriptors ([`ModuleBuilder`]). Each
//! module singleton is then materialized and sealed, its
//! `module$meta$init` hook runs, the package applies its literal
//! configuration (usually a few [`create`] calls), and finally the modules
//! are blessed and the package registered.

pub mod builder;
pub mod capsule;
pub mod context;
pub mod factory;
pub mod interface;
pub mod loader;
pub mod module;
pub mod package;
pub mod singleton;

pub use builder::{ModuleBuilder, ModuleSchema};
pub use capsule::{Capsule, HookKind, InstanceHook, ModuleHook, QueryFn};
pub use context::BuildContext;
pub use factory::{construct, create, invoke, invoke_instance, new_object};
pub use interface::{FieldSpec, InterfaceBuilder, InterfaceInfo, TypeSpec};
pub use loader::{CapsuleLoader, PackageLoader, StaticLoader};
pub use module::{Lifecycle, ModuleId, ModuleState, TypeAlias};
pub use package::{build_package, PackageDef, PackageId, PackageState};
pub use singleton::{materialize, use_module, validate_module};
