//! The object-model registry.
//!
//! [`ObjectModel`] owns two append-only arenas (prototypes and nodes) and a
//! table mapping dotted paths to bindings. Handles returned by the arenas
//! are only meaningful for the model that minted them.
//!
//! Lookups come in two flavours: [`ObjectModel::find`] returns `None` for a
//! missing path and is used for optional probing, while
//! [`ObjectModel::find_strict`] turns a miss into
//! [`ModelError::UnresolvedReference`]. Both try the path as given and then
//! relative to the context package.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{ModelError, Result};
use crate::node::{Node, NodeId};
use crate::path;
use crate::proto::{
    ArgDesc, ElementKind, FieldDesc, FieldMode, FunctionSlot, FunctionSource, FunctionType,
    ProtoId, Prototype, StructType,
};
use crate::value::{Record, Value};

/// What a path is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Proto(ProtoId),
    Node(NodeId),
    Value(Value),
}

impl Binding {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Binding::Proto(_) => "prototype",
            Binding::Node(_) => "node",
            Binding::Value(_) => "value",
        }
    }

    pub fn as_proto(&self) -> Option<ProtoId> {
        match self {
            Binding::Proto(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Binding::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Binding::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<ProtoId> for Binding {
    fn from(id: ProtoId) -> Self {
        Binding::Proto(id)
    }
}

impl From<NodeId> for Binding {
    fn from(id: NodeId) -> Self {
        Binding::Node(id)
    }
}

impl From<Value> for Binding {
    fn from(v: Value) -> Self {
        Binding::Value(v)
    }
}

/// The registry: prototype arena, node arena and path table.
#[derive(Debug, Clone)]
pub struct ObjectModel {
    protos: Vec<Prototype>,
    nodes: Vec<Node>,
    bindings: HashMap<String, Binding>,
    /// Paths in binding order, for introspection.
    order: Vec<String>,
    elements: [ProtoId; 4],
}

impl ObjectModel {
    /// Create a model holding only the four element prototypes.
    pub fn new() -> Self {
        let mut om = Self {
            protos: Vec::new(),
            nodes: Vec::new(),
            bindings: HashMap::new(),
            order: Vec::new(),
            elements: [ProtoId(0); 4],
        };
        for (i, kind) in ElementKind::ALL.iter().enumerate() {
            let id = om.alloc_proto(Prototype::Element(*kind));
            om.elements[i] = id;
        }
        om
    }

    // === Path table ===

    /// Bind a path. The registry never rebinds: an existing path is an error.
    pub fn bind(&mut self, path: &str, binding: impl Into<Binding>) -> Result<Binding> {
        self.ensure_unbound(path)?;
        let binding = binding.into();
        debug!(path, kind = binding.kind_name(), "bind");
        self.bindings.insert(path.to_string(), binding.clone());
        self.order.push(path.to_string());
        Ok(binding)
    }

    /// Allocate a prototype and bind it in one step.
    pub fn bind_proto(&mut self, path: &str, proto: Prototype) -> Result<ProtoId> {
        self.ensure_unbound(path)?;
        let id = self.alloc_proto(proto);
        self.bind(path, id)?;
        Ok(id)
    }

    /// Allocate a node and bind it in one step.
    pub fn bind_node(&mut self, path: &str, node: Node) -> Result<NodeId> {
        self.ensure_unbound(path)?;
        let id = self.alloc_node(node);
        self.bind(path, id)?;
        Ok(id)
    }

    /// Lenient lookup: `None` when neither the path nor its
    /// context-relative form is bound.
    pub fn find(&self, path: &str, context: Option<&str>) -> Option<&Binding> {
        trace!(path, ?context, "find");
        if let Some(b) = self.bindings.get(path) {
            return Some(b);
        }
        let ctx = context?;
        self.bindings.get(&path::join(ctx, path))
    }

    /// Strict lookup: a miss is an unresolved reference.
    pub fn find_strict(&self, path: &str, context: Option<&str>) -> Result<&Binding> {
        self.find(path, context)
            .ok_or_else(|| ModelError::UnresolvedReference {
                path: path.to_string(),
                context: context.unwrap_or("<root>").to_string(),
            })
    }

    /// Strict lookup of a prototype binding.
    pub fn find_strict_proto(&self, path: &str, context: Option<&str>) -> Result<ProtoId> {
        let binding = self.find_strict(path, context)?;
        binding.as_proto().ok_or_else(|| ModelError::WrongKind {
            path: path.to_string(),
            expected: "prototype",
            found: binding.kind_name(),
        })
    }

    /// Strict lookup of a node binding.
    pub fn find_strict_node(&self, path: &str, context: Option<&str>) -> Result<NodeId> {
        let binding = self.find_strict(path, context)?;
        binding.as_node().ok_or_else(|| ModelError::WrongKind {
            path: path.to_string(),
            expected: "node",
            found: binding.kind_name(),
        })
    }

    /// Whether the exact path is bound.
    pub fn has(&self, path: &str) -> bool {
        self.bindings.contains_key(path)
    }

    /// All bindings in the order they were made.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.order
            .iter()
            .map(|p| (p.as_str(), &self.bindings[p]))
    }

    pub fn binding_count(&self) -> usize {
        self.order.len()
    }

    fn ensure_unbound(&self, path: &str) -> Result<()> {
        if self.bindings.contains_key(path) {
            return Err(ModelError::DuplicateBinding {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    // === Prototype arena ===

    fn alloc_proto(&mut self, proto: Prototype) -> ProtoId {
        let id = ProtoId(self.protos.len() as u32);
        self.protos.push(proto);
        id
    }

    /// Borrow a prototype. Panics on a handle from another model.
    pub fn proto(&self, id: ProtoId) -> &Prototype {
        &self.protos[id.index()]
    }

    /// The shared prototype for an element kind.
    pub fn element(&self, kind: ElementKind) -> ProtoId {
        match kind {
            ElementKind::Bool => self.elements[0],
            ElementKind::Num => self.elements[1],
            ElementKind::Str => self.elements[2],
            ElementKind::Obj => self.elements[3],
        }
    }

    /// Element prototypes are interned; this returns the shared handle.
    pub fn new_element(&mut self, kind: ElementKind) -> ProtoId {
        self.element(kind)
    }

    /// A fresh struct, optionally deriving from an initialized parent.
    pub fn new_struct(&mut self, parent: Option<ProtoId>) -> Result<ProtoId> {
        if let Some(p) = parent {
            self.ensure_initialized(p)?;
        }
        Ok(self.alloc_proto(Prototype::Struct(StructType {
            parent,
            ..Default::default()
        })))
    }

    pub fn new_function(
        &mut self,
        owner: Option<ProtoId>,
        ret: Option<ProtoId>,
        min_args: usize,
        max_args: Option<usize>,
        variadic: bool,
    ) -> ProtoId {
        self.alloc_proto(Prototype::Function(FunctionType {
            owner,
            ret,
            min_args,
            max_args,
            variadic,
            args: Vec::new(),
        }))
    }

    pub fn new_map(&mut self, value: ProtoId) -> ProtoId {
        self.alloc_proto(Prototype::Map { value })
    }

    pub fn new_array(&mut self, element: ProtoId) -> ProtoId {
        self.alloc_proto(Prototype::Array { element })
    }

    pub fn new_typedef(&mut self, target: ProtoId) -> ProtoId {
        self.alloc_proto(Prototype::Typedef { target })
    }

    pub fn struct_type(&self, id: ProtoId) -> Result<&StructType> {
        match self.proto(id) {
            Prototype::Struct(s) => Ok(s),
            other => Err(ModelError::WrongKind {
                path: id.to_string(),
                expected: "struct type",
                found: other.kind_name(),
            }),
        }
    }

    fn struct_type_mut(&mut self, id: ProtoId) -> Result<&mut StructType> {
        match &mut self.protos[id.index()] {
            Prototype::Struct(s) => Ok(s),
            other => Err(ModelError::WrongKind {
                path: id.to_string(),
                expected: "struct type",
                found: other.kind_name(),
            }),
        }
    }

    pub fn function_type(&self, id: ProtoId) -> Result<&FunctionType> {
        match self.proto(id) {
            Prototype::Function(f) => Ok(f),
            other => Err(ModelError::WrongKind {
                path: id.to_string(),
                expected: "function type",
                found: other.kind_name(),
            }),
        }
    }

    /// Name a skeleton struct and attach its parent. Runs once per struct.
    pub fn init_struct(&mut self, id: ProtoId, name: &str, parent: Option<ProtoId>) -> Result<()> {
        if let Some(p) = parent {
            self.ensure_initialized(p)?;
        }
        let st = self.struct_type_mut(id)?;
        if st.name.is_some() {
            return Err(ModelError::DuplicateBinding {
                path: name.to_string(),
            });
        }
        st.name = Some(name.to_string());
        if parent.is_some() {
            st.parent = parent;
        }
        debug!(name, "struct initialized");
        Ok(())
    }

    pub fn set_instantiable(&mut self, id: ProtoId, instantiable: bool) -> Result<()> {
        self.struct_type_mut(id)?.instantiable = instantiable;
        Ok(())
    }

    /// Declare a field. A name already declared on this struct is a
    /// duplicate; a name inherited from an ancestor is overridden, which is
    /// how a derived struct changes an inherited default.
    pub fn add_field(
        &mut self,
        id: ProtoId,
        name: &str,
        ty: ProtoId,
        default: impl Into<Value>,
        mode: FieldMode,
    ) -> Result<()> {
        let st = self.struct_type_mut(id)?;
        let owner = st.display_name().to_string();
        if st.finalized {
            return Err(ModelError::SealedRecord {
                owner,
                field: name.to_string(),
            });
        }
        if st.own_field(name).is_some() {
            return Err(ModelError::DuplicateField {
                owner,
                field: name.to_string(),
            });
        }
        st.fields.push(FieldDesc {
            name: name.to_string(),
            ty,
            default: default.into(),
            mode,
        });
        Ok(())
    }

    /// Add an entry to a struct's function table.
    pub fn add_function(
        &mut self,
        id: ProtoId,
        name: &str,
        fn_proto: ProtoId,
        source: FunctionSource,
    ) -> Result<()> {
        self.function_type(fn_proto)?;
        let st = self.struct_type_mut(id)?;
        if st.functions.iter().any(|f| f.name == name) {
            return Err(ModelError::DuplicateField {
                owner: st.display_name().to_string(),
                field: name.to_string(),
            });
        }
        st.functions.push(FunctionSlot {
            name: name.to_string(),
            proto: fn_proto,
            source,
        });
        Ok(())
    }

    /// Append an argument descriptor to a function prototype.
    pub fn add_arg(
        &mut self,
        fn_proto: ProtoId,
        name: &str,
        ty: Option<ProtoId>,
        default: impl Into<Value>,
    ) -> Result<()> {
        match &mut self.protos[fn_proto.index()] {
            Prototype::Function(f) => {
                f.args.push(ArgDesc {
                    name: name.to_string(),
                    ty,
                    default: default.into(),
                });
                Ok(())
            }
            other => Err(ModelError::WrongKind {
                path: fn_proto.to_string(),
                expected: "function type",
                found: other.kind_name(),
            }),
        }
    }

    /// Type-check every visible field default and mark the struct
    /// initialized. Idempotent.
    pub fn finalize_struct(&mut self, id: ProtoId) -> Result<()> {
        let st = self.struct_type(id)?;
        if st.finalized {
            return Ok(());
        }
        if st.name.is_none() {
            return Err(ModelError::UninitializedPrototype {
                name: st.display_name().to_string(),
            });
        }
        let owner = st.display_name().to_string();
        for field in self.fields(id)? {
            if !self.conforms(&field.default, field.ty) {
                return Err(ModelError::TypeMismatch {
                    owner,
                    field: field.name,
                    expected: self.describe(field.ty),
                    found: field.default.kind_name().to_string(),
                });
            }
        }
        self.struct_type_mut(id)?.finalized = true;
        debug!(name = %owner, "struct finalized");
        Ok(())
    }

    /// The struct and its ancestors, root first.
    fn chain(&self, id: ProtoId) -> Result<Vec<ProtoId>> {
        let mut chain = vec![id];
        let mut cur = self.struct_type(id)?.parent;
        while let Some(p) = cur {
            chain.push(p);
            cur = self.struct_type(p)?.parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Every field visible on a struct: ancestors first, with derived
    /// declarations replacing inherited ones in place.
    pub fn fields(&self, id: ProtoId) -> Result<Vec<FieldDesc>> {
        let mut out: Vec<FieldDesc> = Vec::new();
        for sid in self.chain(id)? {
            for f in &self.struct_type(sid)?.fields {
                match out.iter_mut().find(|existing| existing.name == f.name) {
                    Some(slot) => *slot = f.clone(),
                    None => out.push(f.clone()),
                }
            }
        }
        Ok(out)
    }

    /// Resolve a function by name, most-derived first.
    pub fn lookup_function(&self, id: ProtoId, name: &str) -> Option<&FunctionSlot> {
        let mut cur = Some(id);
        while let Some(sid) = cur {
            let st = self.struct_type(sid).ok()?;
            if let Some(slot) = st.functions.iter().find(|f| f.name == name) {
                return Some(slot);
            }
            cur = st.parent;
        }
        None
    }

    /// Whether `child` is `ancestor` or derives from it.
    pub fn is_subtype(&self, child: ProtoId, ancestor: ProtoId) -> bool {
        let mut cur = Some(child);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = match self.proto(id) {
                Prototype::Struct(s) => s.parent,
                _ => None,
            };
        }
        false
    }

    /// Structural conformance of a value to a prototype. `Undef` conforms
    /// to everything; untyped records conform to any struct.
    pub fn conforms(&self, value: &Value, ty: ProtoId) -> bool {
        match (self.proto(ty), value) {
            (_, Value::Undef) => true,
            (Prototype::Element(ElementKind::Obj), _) => true,
            (Prototype::Element(ElementKind::Bool), Value::Bool(_)) => true,
            (Prototype::Element(ElementKind::Num), Value::Num(_)) => true,
            (Prototype::Element(ElementKind::Str), Value::Str(_)) => true,
            (Prototype::Typedef { target }, v) => self.conforms(v, *target),
            (Prototype::Map { value: vt }, Value::Map(m)) => {
                m.iter().all(|(_, v)| self.conforms(v, *vt))
            }
            (Prototype::Array { element }, Value::Array(items)) => {
                items.iter().all(|v| self.conforms(v, *element))
            }
            (Prototype::Struct(_), Value::Record(r)) => match r.proto() {
                Some(p) => self.is_subtype(p, ty),
                None => true,
            },
            (Prototype::Struct(_), Value::Node(n)) => self
                .node(*n)
                .proto()
                .is_some_and(|p| self.is_subtype(p, ty)),
            _ => false,
        }
    }

    /// Readable name of a prototype, for diagnostics.
    pub fn describe(&self, ty: ProtoId) -> String {
        match self.proto(ty) {
            Prototype::Element(kind) => kind.to_string(),
            Prototype::Function(f) => format!("function({})", f.arity()),
            Prototype::Struct(s) => s.display_name().to_string(),
            Prototype::Map { value } => format!("Map<{}>", self.describe(*value)),
            Prototype::Array { element } => format!("Array<{}>", self.describe(*element)),
            Prototype::Typedef { target } => self.describe(*target),
        }
    }

    /// Externally visible parameter names: no hidden fields, no `$` fields.
    pub fn params_surface(&self, id: ProtoId) -> Result<Vec<String>> {
        Ok(self
            .fields(id)?
            .into_iter()
            .filter(|f| !f.mode.hidden && !f.name.starts_with('$'))
            .map(|f| f.name)
            .collect())
    }

    fn ensure_initialized(&self, id: ProtoId) -> Result<()> {
        let st = self.struct_type(id)?;
        if st.name.is_none() {
            return Err(ModelError::UninitializedPrototype {
                name: st.display_name().to_string(),
            });
        }
        Ok(())
    }

    fn ensure_finalized(&self, id: ProtoId) -> Result<()> {
        let st = self.struct_type(id)?;
        if !st.finalized {
            return Err(ModelError::UninitializedPrototype {
                name: st.display_name().to_string(),
            });
        }
        Ok(())
    }

    /// A fresh anonymous node holding every default of the struct and its
    /// ancestors.
    pub fn instantiate(&mut self, id: ProtoId) -> Result<NodeId> {
        let name = format!("{}#{}", self.struct_type(id)?.display_name(), self.nodes.len());
        self.instantiate_named(id, name)
    }

    /// [`ObjectModel::instantiate`] with a caller-chosen node name.
    pub fn instantiate_named(&mut self, id: ProtoId, name: impl Into<String>) -> Result<NodeId> {
        self.ensure_finalized(id)?;
        let mut node = Node::new(name, Some(id));
        for f in self.fields(id)? {
            node.set(&f.name, f.default)?;
        }
        Ok(self.alloc_node(node))
    }

    /// Like [`ObjectModel::instantiate`] but returns a detached typed record.
    pub fn new_record(&self, id: ProtoId) -> Result<Record> {
        self.ensure_finalized(id)?;
        let mut record = Record::typed(id);
        for f in self.fields(id)? {
            record.set(f.name, f.default);
        }
        Ok(record)
    }

    // === Node arena ===

    pub fn alloc_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Borrow a node. Panics on a handle from another model.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn proto_count(&self) -> usize {
        self.protos.len()
    }

    /// Give a skeleton node its prototype and populate its defaults.
    pub fn init_node(&mut self, id: NodeId, proto: ProtoId) -> Result<()> {
        self.ensure_finalized(proto)?;
        let fields = self.fields(proto)?;
        let node = &mut self.nodes[id.index()];
        node.set_proto(proto);
        for f in fields {
            if node.get(&f.name).is_none() {
                node.set(&f.name, f.default)?;
            }
        }
        Ok(())
    }

    /// Read a field of a node.
    pub fn get(&self, id: NodeId, field: &str) -> Option<&Value> {
        self.node(id).get(field)
    }

    /// Assign a field of a node.
    pub fn set(&mut self, id: NodeId, field: &str, value: impl Into<Value>) -> Result<()> {
        self.node_mut(id).set(field, value)
    }
}

impl Default for ObjectModel {
    fn default() -> Self {
        Self::new()
    }
}
