//! The built-in packages a platform build loads.

pub mod board;
pub mod generic;
pub mod iplatform;
pub mod xdc;

use omcfg_module::StaticLoader;

use crate::definition::PlatformDefinition;

pub use board::BoardPackage;
pub use generic::GenericPlatform;
pub use iplatform::XdcPlatform;
pub use xdc::Xdc;

/// Package names reserved by the built-in packages.
pub const BUILTIN_PACKAGES: [&str; 3] = ["xdc", "xdc.platform", generic::PACKAGE];

/// A loader that knows the built-in packages plus the board package
/// described by `def`.
pub fn platform_loader(def: &PlatformDefinition) -> StaticLoader {
    let board_capsule = def.capsule_path();
    StaticLoader::new()
        .with_package(Xdc)
        .with_package(XdcPlatform)
        .with_package(GenericPlatform)
        .with_package(BoardPackage::new(def.clone()))
        .with_capsule(generic::CAPSULE, generic::capsule)
        .with_capsule(board_capsule.clone(), move || board::capsule(&board_capsule))
}
