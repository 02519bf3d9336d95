//! The type prototype system.
//!
//! Prototypes describe the shape of everything bound into the registry:
//! scalar element kinds, function signatures, structs with typed fields,
//! maps, arrays and aliases. They are stored in the registry arena and
//! referenced by [`ProtoId`].

use std::fmt;

use serde::Serialize;

use crate::value::Value;

/// Handle of a prototype in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProtoId(pub(crate) u32);

impl ProtoId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proto#{}", self.0)
    }
}

/// Primitive scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    Bool,
    Num,
    Str,
    /// Any value at all.
    Obj,
}

impl ElementKind {
    pub const ALL: [ElementKind; 4] = [
        ElementKind::Bool,
        ElementKind::Num,
        ElementKind::Str,
        ElementKind::Obj,
    ];
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Bool => write!(f, "Bool"),
            ElementKind::Num => write!(f, "Num"),
            ElementKind::Str => write!(f, "Str"),
            ElementKind::Obj => write!(f, "Obj"),
        }
    }
}

/// Field access mode.
///
/// Written as a combination of `r` (read-only), `w` (writable) and `h`
/// (hidden from the external parameter surface), e.g. `"wh"`.
///
/// Only `h` changes behavior: it removes the field from the parameter
/// surface. `r` and `w` are descriptive. Hooks and the build itself write
/// `r` fields such as `$hostonly`; writes end when a record is blessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FieldMode {
    pub readonly: bool,
    pub writable: bool,
    pub hidden: bool,
}

impl FieldMode {
    pub const R: FieldMode = FieldMode {
        readonly: true,
        writable: false,
        hidden: false,
    };
    pub const W: FieldMode = FieldMode {
        readonly: false,
        writable: true,
        hidden: false,
    };
    pub const WH: FieldMode = FieldMode {
        readonly: false,
        writable: true,
        hidden: true,
    };
}

impl fmt::Display for FieldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.readonly {
            write!(f, "r")?;
        }
        if self.writable {
            write!(f, "w")?;
        }
        if self.hidden {
            write!(f, "h")?;
        }
        Ok(())
    }
}

/// A declared struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    pub name: String,
    pub ty: ProtoId,
    pub default: Value,
    pub mode: FieldMode,
}

/// A declared function argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgDesc {
    pub name: String,
    /// `None` for arguments of unconstrained type.
    pub ty: Option<ProtoId>,
    pub default: Value,
}

/// A function signature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionType {
    /// Module prototype the function belongs to.
    pub owner: Option<ProtoId>,
    /// Return prototype; `None` for functions returning nothing.
    pub ret: Option<ProtoId>,
    pub min_args: usize,
    /// `None` when there is no upper bound.
    pub max_args: Option<usize>,
    pub variadic: bool,
    pub args: Vec<ArgDesc>,
}

impl FunctionType {
    /// Whether a call with `given` positional arguments is within bounds.
    pub fn accepts(&self, given: usize) -> bool {
        if given < self.min_args {
            return false;
        }
        match self.max_args {
            Some(max) => self.variadic || given <= max,
            None => true,
        }
    }

    /// Human-readable arity bounds, e.g. `2..=3` or `0..`.
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if !self.variadic => format!("{}..={}", self.min_args, max),
            _ => format!("{}..", self.min_args),
        }
    }
}

/// Where a function table entry's implementation comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FunctionSource {
    /// Implemented by the object model itself (e.g. `create`).
    Builtin(String),
    /// Supplied by the module's capsule under this name.
    Capsule(String),
}

/// An entry in a struct's function table.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSlot {
    pub name: String,
    pub proto: ProtoId,
    pub source: FunctionSource,
}

/// A record type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructType {
    /// Set once by `init_struct`; skeleton structs are anonymous.
    pub name: Option<String>,
    pub parent: Option<ProtoId>,
    pub instantiable: bool,
    pub fields: Vec<FieldDesc>,
    pub functions: Vec<FunctionSlot>,
    /// Whether every default has been type-checked.
    pub finalized: bool,
}

impl StructType {
    pub fn own_field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous struct>")
    }
}

/// A type prototype.
#[derive(Debug, Clone, PartialEq)]
pub enum Prototype {
    Element(ElementKind),
    Function(FunctionType),
    Struct(StructType),
    Map { value: ProtoId },
    Array { element: ProtoId },
    Typedef { target: ProtoId },
}

impl Prototype {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Prototype::Element(_) => "element type",
            Prototype::Function(_) => "function type",
            Prototype::Struct(_) => "struct type",
            Prototype::Map { .. } => "map type",
            Prototype::Array { .. } => "array type",
            Prototype::Typedef { .. } => "typedef",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_mode_display() {
        assert_eq!(FieldMode::WH.to_string(), "wh");
        assert_eq!(FieldMode::R.to_string(), "r");
        assert_eq!(FieldMode::default().to_string(), "");
    }

    #[test]
    fn function_arity_bounds() {
        let f = FunctionType {
            min_args: 2,
            max_args: Some(3),
            ..Default::default()
        };
        assert!(!f.accepts(1));
        assert!(f.accepts(2));
        assert!(f.accepts(3));
        assert!(!f.accepts(4));
        assert_eq!(f.arity(), "2..=3");

        let any = FunctionType {
            max_args: None,
            ..Default::default()
        };
        assert!(any.accepts(0));
        assert!(any.accepts(17));
        assert_eq!(any.arity(), "0..");
    }
}
