//! Object codec
//!
//! Converts typed models to and from wire objects using each type's
//! property table:
//! - `parse` reads wire keys (or property names) into a model, skipping
//!   keys it does not know so newer gateways don't break older code
//! - `serialize` writes set properties out, optionally diffed against a
//!   reference so that only meaningful values are transmitted
//! - `merge` overwrites existing properties from a partial update
//! - `duplicate` deep-copies by a full serialize/parse round trip
//!
//! Raw payloads are JSON maps; see [`encode`] and [`decode`].

use crate::object::{IpsoObject, PropertyRef, PropertyValue};
use crate::registry::{DeserializeFn, PropertyTable, SerializeFn};
use crate::types::{Value, WireObject};
use crate::{Error, Result};
use bytes::Bytes;
use tracing::{debug, warn};

// ============================================================================
// PAYLOADS
// ============================================================================

/// Encode a wire object into a payload
pub fn encode(obj: &WireObject) -> Result<Bytes> {
    serde_json::to_vec(obj)
        .map(Bytes::from)
        .map_err(|e| Error::EncodeError(e.to_string()))
}

/// Decode a payload into a wire object
pub fn decode(bytes: &[u8]) -> Result<WireObject> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| Error::DecodeError(e.to_string()))?;
    match value {
        Value::Object(obj) => Ok(obj),
        _ => Err(Error::NotAnObject),
    }
}

// ============================================================================
// PARSE
// ============================================================================

/// Read a model's properties from a wire object
pub fn parse(model: &mut dyn IpsoObject, obj: &WireObject) {
    let table = model.metadata();

    for (key, raw) in obj {
        // key might be a wire key or a property name
        let Some(descriptor) = table
            .descriptor_by_key(key)
            .or_else(|| table.descriptor(key))
        else {
            warn!("{}: found unknown property with key {}", table.type_name(), key);
            continue;
        };

        let Some(value) = parse_value(table, key, raw, descriptor.deserializer()) else {
            continue;
        };

        if !model.set(descriptor.name(), value) {
            warn!(
                "{}: ignoring value of unexpected kind for {}",
                table.type_name(),
                descriptor.name()
            );
        }
    }
}

fn parse_value(
    table: &PropertyTable,
    key: &str,
    raw: &Value,
    deserializer: Option<DeserializeFn>,
) -> Option<PropertyValue> {
    match raw {
        Value::Array(items) => {
            let parsed = items
                .iter()
                .filter_map(|item| {
                    let value = parse_value(table, key, item, deserializer);
                    if value.is_none() {
                        warn!("{}: dropping unreadable item in {}", table.type_name(), key);
                    }
                    value
                })
                .collect();
            Some(PropertyValue::Array(parsed))
        }
        Value::Object(_) => match deserializer {
            Some(deserialize) => deserialize(raw),
            None => {
                warn!("{}: could not find deserializer for key {}", table.type_name(), key);
                None
            }
        },
        Value::Null => {
            debug!("{}: skipping null value for key {}", table.type_name(), key);
            None
        }
        _ => match deserializer {
            Some(deserialize) => deserialize(raw),
            None => PropertyValue::from_wire(raw),
        },
    }
}

// ============================================================================
// SERIALIZE
// ============================================================================

/// Serialize every set property of a model.
///
/// With a reference object, non-required properties equal to the reference
/// value are left out, and nested objects that end up carrying nothing but
/// required properties are dropped entirely. Array properties must have the
/// same length as their reference array.
pub fn serialize(model: &dyn IpsoObject, reference: Option<&dyn IpsoObject>) -> Result<WireObject> {
    let table = model.metadata();
    let mut ret = WireObject::new();

    for name in model.property_names() {
        let Some(descriptor) = table.descriptor(name) else {
            continue;
        };
        let Some(value) = model.get(name) else {
            continue;
        };
        let ref_value = reference.and_then(|r| r.get(name));
        let required = descriptor.is_required();
        let serializer = descriptor.serializer();

        let wire = match value {
            PropertyRef::Array(items) => {
                let refs: Vec<Option<PropertyRef<'_>>> = match ref_value {
                    Some(PropertyRef::Array(refs)) if refs.len() == items.len() => {
                        refs.into_iter().map(Some).collect()
                    }
                    Some(PropertyRef::Array(refs)) => {
                        return Err(Error::ArrayLengthMismatch {
                            property: name.to_string(),
                            expected: refs.len(),
                            actual: items.len(),
                        });
                    }
                    Some(_) => {
                        return Err(Error::ReferenceNotArray {
                            property: name.to_string(),
                        });
                    }
                    None => vec![None; items.len()],
                };

                let mut serialized = Vec::with_capacity(items.len());
                for (item, item_ref) in items.into_iter().zip(refs) {
                    if let Some(v) = serialize_value(required, item, item_ref, serializer)? {
                        serialized.push(v);
                    }
                }
                if serialized.is_empty() {
                    None
                } else {
                    Some(Value::Array(serialized))
                }
            }
            value => serialize_value(required, value, ref_value, serializer)?,
        };

        if let Some(wire) = wire {
            ret.insert(descriptor.key().to_string(), wire);
        }
    }

    Ok(ret)
}

fn serialize_value(
    required: bool,
    value: PropertyRef<'_>,
    reference: Option<PropertyRef<'_>>,
    transform: Option<SerializeFn>,
) -> Result<Option<Value>> {
    let wire = match value {
        PropertyRef::Object(nested) => {
            let nested_ref = match reference {
                Some(PropertyRef::Object(r)) => Some(r),
                _ => None,
            };
            let serialized = serialize(nested, nested_ref)?;
            if is_serialized_object_empty(nested.metadata(), &serialized) {
                return Ok(None);
            }
            Value::Object(serialized)
        }
        value => {
            if let Some(reference) = &reference {
                if !required && value.same_as(reference) {
                    return Ok(None);
                }
            }
            value.to_wire()?
        }
    };

    Ok(Some(match transform {
        Some(transform) => transform(wire),
        None => wire,
    }))
}

/// A serialized object is empty if it holds no non-required property
fn is_serialized_object_empty(table: &PropertyTable, obj: &WireObject) -> bool {
    obj.keys().all(|key| {
        table
            .name_for(key)
            .map(|name| table.is_required(name))
            .unwrap_or(false)
    })
}

// ============================================================================
// MERGE / DUPLICATE
// ============================================================================

/// Overwrite the properties `model` already has set with values from `partial`.
/// Names the model doesn't have set are ignored. Returns the number of
/// properties written.
pub fn merge<I, S>(model: &mut dyn IpsoObject, partial: I) -> usize
where
    I: IntoIterator<Item = (S, PropertyValue)>,
    S: AsRef<str>,
{
    let mut merged = 0;
    for (name, value) in partial {
        let name = name.as_ref();
        if model.get(name).is_none() {
            debug!("{}: not merging unset property {}", model.metadata().type_name(), name);
            continue;
        }
        if model.set(name, value) {
            merged += 1;
        }
    }
    merged
}

/// Deep-copy a model by serializing it and parsing the result into a fresh
/// instance, so the copy obeys the same rules as any wire round trip
pub fn duplicate<T: IpsoObject + Default>(model: &T) -> Result<T> {
    let serialized = serialize(model, None)?;
    let mut fresh = T::default();
    parse(&mut fresh, &serialized);
    Ok(fresh)
}

/// Type-erased [`duplicate`]
pub fn duplicate_boxed(model: &dyn IpsoObject) -> Result<Box<dyn IpsoObject>> {
    let serialized = serialize(model, None)?;
    let mut fresh = model.new_instance();
    parse(fresh.as_mut(), &serialized);
    Ok(fresh)
}
