//! Property metadata registry
//!
//! Every model type owns one static [`PropertyTable`] that maps its property
//! names to wire keys (both ways), flags required properties and carries the
//! optional serialize/deserialize transforms. Tables are built once, the first
//! time a type is used, and never change afterwards.

use crate::object::PropertyValue;
use crate::types::Value;
use std::collections::HashMap;

/// Transform applied to a property's wire value on the way out
pub type SerializeFn = fn(Value) -> Value;

/// Transform applied to a raw wire value on the way in
pub type DeserializeFn = fn(&Value) -> Option<PropertyValue>;

/// Kind of value a property holds
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
    Object,
    Array(Box<ValueKind>),
}

impl ValueKind {
    pub fn array_of(kind: ValueKind) -> Self {
        ValueKind::Array(Box::new(kind))
    }

    fn default_serializer(&self) -> Option<SerializeFn> {
        match self {
            ValueKind::Bool => Some(serialize_bool),
            ValueKind::Array(inner) => inner.default_serializer(),
            _ => None,
        }
    }

    fn default_deserializer(&self) -> Option<DeserializeFn> {
        match self {
            ValueKind::Bool => Some(deserialize_bool),
            ValueKind::Array(inner) => inner.default_deserializer(),
            _ => None,
        }
    }
}

/// Booleans travel as 1/0
fn serialize_bool(value: Value) -> Value {
    match value {
        Value::Bool(b) => Value::Int(if b { 1 } else { 0 }),
        other => other,
    }
}

fn deserialize_bool(raw: &Value) -> Option<PropertyValue> {
    let on = match raw {
        Value::Bool(b) => *b,
        Value::Int(i) => *i == 1,
        Value::Float(f) => *f == 1.0,
        Value::String(s) => s == "true" || s == "on",
        _ => false,
    };
    Some(PropertyValue::Bool(on))
}

/// Metadata for a single property
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: &'static str,
    key: &'static str,
    kind: ValueKind,
    required: bool,
    serializer: Option<SerializeFn>,
    deserializer: Option<DeserializeFn>,
}

impl PropertyDescriptor {
    pub fn new(name: &'static str, key: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            key,
            kind,
            required: false,
            serializer: None,
            deserializer: None,
        }
    }

    /// Mark the property as always present in serialized objects
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn serialize_with(mut self, transform: SerializeFn) -> Self {
        self.serializer = Some(transform);
        self
    }

    pub fn deserialize_with(mut self, transform: DeserializeFn) -> Self {
        self.deserializer = Some(transform);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The registered serializer, or the value-kind default
    pub fn serializer(&self) -> Option<SerializeFn> {
        self.serializer.or_else(|| self.kind.default_serializer())
    }

    /// The registered deserializer, or the value-kind default
    pub fn deserializer(&self) -> Option<DeserializeFn> {
        self.deserializer.or_else(|| self.kind.default_deserializer())
    }
}

/// Static property table of one model type
#[derive(Debug)]
pub struct PropertyTable {
    type_name: &'static str,
    properties: Vec<PropertyDescriptor>,
    by_name: HashMap<&'static str, usize>,
    by_key: HashMap<&'static str, usize>,
}

impl PropertyTable {
    pub fn builder(type_name: &'static str) -> PropertyTableBuilder {
        PropertyTableBuilder {
            table: PropertyTable {
                type_name,
                properties: Vec::new(),
                by_name: HashMap::new(),
                by_key: HashMap::new(),
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Look up a descriptor by property name
    pub fn descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.by_name.get(name).map(|&i| &self.properties[i])
    }

    /// Look up a descriptor by wire key
    pub fn descriptor_by_key(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.by_key.get(key).map(|&i| &self.properties[i])
    }

    pub fn key_for(&self, name: &str) -> Option<&'static str> {
        self.descriptor(name).map(|d| d.key)
    }

    pub fn name_for(&self, key: &str) -> Option<&'static str> {
        self.descriptor_by_key(key).map(|d| d.name)
    }

    /// Returns the wire key for a property name, or the property name for a wire key
    pub fn resolve(&self, key_or_name: &str) -> Option<&'static str> {
        self.key_for(key_or_name)
            .or_else(|| self.name_for(key_or_name))
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.descriptor(name).map(|d| d.required).unwrap_or(false)
    }

    pub fn serializer_for(&self, name: &str) -> Option<SerializeFn> {
        self.descriptor(name).and_then(PropertyDescriptor::serializer)
    }

    pub fn deserializer_for(&self, name: &str) -> Option<DeserializeFn> {
        self.descriptor(name).and_then(PropertyDescriptor::deserializer)
    }

    /// Property names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.properties.iter().map(|d| d.name)
    }

    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Builder for [`PropertyTable`]
pub struct PropertyTableBuilder {
    table: PropertyTable,
}

impl PropertyTableBuilder {
    /// Register a property.
    ///
    /// Panics if the name or wire key is already taken: names and keys must
    /// stay a bijection within one type.
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        let table = &mut self.table;
        assert!(
            !table.by_name.contains_key(descriptor.name),
            "{}: property {} registered twice",
            table.type_name,
            descriptor.name
        );
        assert!(
            !table.by_key.contains_key(descriptor.key),
            "{}: wire key {} registered twice",
            table.type_name,
            descriptor.key
        );

        let index = table.properties.len();
        table.by_name.insert(descriptor.name, index);
        table.by_key.insert(descriptor.key, index);
        table.properties.push(descriptor);
        self
    }

    pub fn build(self) -> PropertyTable {
        self.table
    }
}
