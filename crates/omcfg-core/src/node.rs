//! Object-model nodes.
//!
//! A node is a package, a module singleton, or an instance. Its fields live
//! in an [`AttrMap`]; blessing a node freezes it entirely.

use std::fmt;

use serde::Serialize;

use crate::attr::{AttrMap, AttrRejection};
use crate::error::{ModelError, Result};
use crate::proto::ProtoId;
use crate::value::Value;

/// Handle of a node in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A registry node.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    proto: Option<ProtoId>,
    attrs: AttrMap,
    blessed: bool,
}

impl Node {
    pub fn new(name: impl Into<String>, proto: Option<ProtoId>) -> Self {
        Self {
            name: name.into(),
            proto,
            attrs: AttrMap::new(),
            blessed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proto(&self) -> Option<ProtoId> {
        self.proto
    }

    /// Attach the prototype a skeleton node was declared without.
    pub(crate) fn set_proto(&mut self, proto: ProtoId) {
        self.proto = Some(proto);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attrs.get(field)
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    /// Bind a new attribute. Fails if it exists or the node is closed.
    pub fn bind(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        if self.blessed {
            return Err(self.sealed_error(field));
        }
        self.attrs
            .insert_new(field, value.into())
            .map_err(|r| self.rejection(field, r))
    }

    /// Assign a field, adding it if the attribute map is still open.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        if self.blessed {
            return Err(self.sealed_error(field));
        }
        self.attrs
            .assign(field, value.into())
            .map_err(|r| self.rejection(field, r))
    }

    /// Close the attribute map to new keys.
    pub fn seal_attrs(&mut self) {
        self.attrs.seal();
    }

    /// Freeze the node. Idempotent.
    pub fn bless(&mut self) {
        self.blessed = true;
        self.attrs.seal();
    }

    pub fn is_blessed(&self) -> bool {
        self.blessed
    }

    fn rejection(&self, field: &str, rejection: AttrRejection) -> ModelError {
        match rejection {
            AttrRejection::Duplicate => ModelError::DuplicateBinding {
                path: format!("{}.{}", self.name, field),
            },
            AttrRejection::Sealed => self.sealed_error(field),
        }
    }

    fn sealed_error(&self, field: &str) -> ModelError {
        ModelError::SealedRecord {
            owner: self.name.clone(),
            field: field.to_string(),
        }
    }
}
