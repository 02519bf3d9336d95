//! Object-model core: values, type prototypes and the registry.
//!
//! The registry ([`ObjectModel`]) is the single store of record for a build.
//! It maps dotted paths to bindings and owns the arenas that prototypes and
//! nodes live in:
//!
//! ```rust
//! use omcfg_core::{ElementKind, FieldMode, ObjectModel, Value};
//!
//! let mut om = ObjectModel::new();
//! let params = om.new_struct(None).unwrap();
//! om.init_struct(params, "board.Platform.Params", None).unwrap();
//! let str_t = om.element(ElementKind::Str);
//! om.add_field(params, "codeMemory", str_t, "DDR3_STATIC", FieldMode::WH).unwrap();
//! om.finalize_struct(params).unwrap();
//! om.bind("board.Platform.Params", params).unwrap();
//!
//! let inst = om.instantiate(params).unwrap();
//! assert_eq!(om.get(inst, "codeMemory"), Some(&Value::from("DDR3_STATIC")));
//! assert!(om.bind("board.Platform.Params", params).is_err());
//! ```

pub mod attr;
pub mod error;
pub mod hash;
pub mod node;
pub mod path;
pub mod proto;
pub mod registry;
pub mod value;

pub use attr::AttrMap;
pub use error::{Collaborator, ModelError, Result};
pub use node::{Node, NodeId};
pub use proto::{
    ArgDesc, ElementKind, FieldDesc, FieldMode, FunctionSlot, FunctionSource, FunctionType,
    ProtoId, Prototype, StructType,
};
pub use registry::{Binding, ObjectModel};
pub use value::{Record, Value, ValueMap};
