//! Typed model objects
//!
//! Concrete models (lights, scenes, groups, ...) implement [`IpsoObject`] by
//! exposing their fields through `get`/`set` by property name. The codec only
//! ever talks to models through this trait, with the type's
//! [`PropertyTable`] deciding keys and transforms.

use crate::codec;
use crate::registry::PropertyTable;
use crate::types::{Value, WireObject};
use crate::Result;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;

/// Owned value written into a model property
#[derive(Debug)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Object(Box<dyn IpsoObject>),
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn object<T: IpsoObject + 'static>(obj: T) -> Self {
        PropertyValue::Object(Box::new(obj))
    }

    /// Converts a primitive wire value. Null and objects have no direct counterpart.
    pub fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            Value::Int(i) => Some(PropertyValue::Int(*i)),
            Value::Float(f) => Some(PropertyValue::Float(*f)),
            Value::String(s) => Some(PropertyValue::String(s.clone())),
            Value::Array(items) => Some(PropertyValue::Array(
                items.iter().filter_map(PropertyValue::from_wire).collect(),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Float(f) => Some(f.round() as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<PropertyValue>> {
        match self {
            PropertyValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Take the nested object out, if it is a `T`
    pub fn into_object<T: IpsoObject + 'static>(self) -> Option<T> {
        match self {
            PropertyValue::Object(obj) => obj.into_any().downcast::<T>().ok().map(|b| *b),
            _ => None,
        }
    }

    /// Collect an array of nested `T` objects. Any other element fails the whole conversion.
    pub fn into_objects<T: IpsoObject + 'static>(self) -> Option<Vec<T>> {
        self.into_array()?
            .into_iter()
            .map(PropertyValue::into_object)
            .collect()
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

/// Borrowed view of a model property
#[derive(Debug, Clone)]
pub enum PropertyRef<'a> {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Cow<'a, str>),
    Object(&'a dyn IpsoObject),
    Array(Vec<PropertyRef<'a>>),
}

impl<'a> PropertyRef<'a> {
    pub fn borrowed(s: &'a str) -> Self {
        PropertyRef::Str(Cow::Borrowed(s))
    }

    /// A computed string that has no field to borrow from
    pub fn owned(s: String) -> Self {
        PropertyRef::Str(Cow::Owned(s))
    }

    /// Borrow each element of a slice of nested objects
    pub fn objects<T: IpsoObject>(items: &'a [T]) -> Self {
        PropertyRef::Array(
            items
                .iter()
                .map(|item| PropertyRef::Object(item as &dyn IpsoObject))
                .collect(),
        )
    }

    pub fn ints(items: &'a [i64]) -> Self {
        PropertyRef::Array(items.iter().map(|&i| PropertyRef::Int(i)).collect())
    }

    /// Equality of primitive values. Objects never compare equal.
    pub fn same_as(&self, other: &PropertyRef<'_>) -> bool {
        match (self, other) {
            (PropertyRef::Bool(a), PropertyRef::Bool(b)) => a == b,
            (PropertyRef::Int(a), PropertyRef::Int(b)) => a == b,
            (PropertyRef::Float(a), PropertyRef::Float(b)) => a == b,
            (PropertyRef::Int(a), PropertyRef::Float(b)) | (PropertyRef::Float(b), PropertyRef::Int(a)) => {
                *a as f64 == *b
            }
            (PropertyRef::Str(a), PropertyRef::Str(b)) => a == b,
            (PropertyRef::Array(a), PropertyRef::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            _ => false,
        }
    }

    /// Plain wire form of this value, without any property transform.
    /// Nested objects are serialized in full.
    pub fn to_wire(&self) -> Result<Value> {
        Ok(match self {
            PropertyRef::Bool(b) => Value::Bool(*b),
            PropertyRef::Int(i) => Value::Int(*i),
            PropertyRef::Float(f) => Value::Float(*f),
            PropertyRef::Str(s) => Value::String(s.to_string()),
            PropertyRef::Object(obj) => Value::Object(codec::serialize(*obj, None)?),
            PropertyRef::Array(items) => Value::Array(
                items
                    .iter()
                    .map(PropertyRef::to_wire)
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyRef::Int(i) => Some(*i as f64),
            PropertyRef::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyRef::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A typed model that can be converted to and from wire objects
pub trait IpsoObject: fmt::Debug + Send + Sync {
    /// The static property table of the concrete type
    fn metadata(&self) -> &'static PropertyTable;

    /// Read a property by name. `None` when the property is unset or unknown.
    fn get(&self, name: &str) -> Option<PropertyRef<'_>>;

    /// Write a property by name. Returns false if the name is unknown or the
    /// value has the wrong kind; the model is left untouched in that case.
    fn set(&mut self, name: &str, value: PropertyValue) -> bool;

    /// A fresh default instance of the same concrete type
    fn new_instance(&self) -> Box<dyn IpsoObject>;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Names of the properties currently set, in declaration order
    fn property_names(&self) -> Vec<&'static str> {
        self.metadata()
            .names()
            .filter(|name| self.get(name).is_some())
            .collect()
    }
}

/// Codec operations available on every sized model
pub trait IpsoObjectExt: IpsoObject + Sized {
    /// Read this instance's properties from a wire object
    fn parse(&mut self, obj: &WireObject) -> &mut Self {
        codec::parse(self, obj);
        self
    }

    /// Consuming variant of [`IpsoObjectExt::parse`]
    fn parsed(mut self, obj: &WireObject) -> Self {
        codec::parse(&mut self, obj);
        self
    }

    /// Serialize every set property
    fn serialize(&self) -> Result<WireObject> {
        codec::serialize(self, None)
    }

    /// Serialize, leaving out non-required properties equal to `reference`
    fn serialize_against(&self, reference: &Self) -> Result<WireObject> {
        codec::serialize(self, Some(reference))
    }

    /// Overwrite the properties this instance already has set
    fn merge<I, S>(&mut self, partial: I) -> usize
    where
        I: IntoIterator<Item = (S, PropertyValue)>,
        S: AsRef<str>,
    {
        codec::merge(self, partial)
    }

    /// Deep copy through a wire round trip
    fn duplicate(&self) -> Result<Self>
    where
        Self: Default,
    {
        codec::duplicate(self)
    }
}

impl<T: IpsoObject + Sized> IpsoObjectExt for T {}
