//! Built-in platform packages and typed CPU configuration.
//!
//! A platform build loads four packages, leaf first:
//!
//! - `xdc`: the `IPackage` interface every package singleton derives from.
//! - `xdc.platform`: the `IPlatform` interface with its `Board`, `Memory`
//!   and `MemoryMap` types and five query functions.
//! - `ti.platforms.generic`: a `Platform` module whose instances describe
//!   one CPU.
//! - the board package (e.g. `platform.evm6678`), whose `Platform` module
//!   binds a literal `CPU` instance built from a [`PlatformDefinition`].
//!
//! [`build_platform`] runs the build and creates the platform instance;
//! [`CpuConfig`] reads the result back as plain data.

pub mod build;
pub mod cpu;
pub mod definition;
pub mod error;
pub mod packages;
pub mod parse;

pub use build::{build_platform, MemoryOverrides, PlatformBuild};
pub use cpu::{CpuConfig, MemoryRegion};
pub use definition::PlatformDefinition;
pub use error::{PlatformError, Result};
pub use packages::platform_loader;
