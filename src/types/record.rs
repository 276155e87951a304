use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    error::DatabaseError,
    value::{Value, TAG_BOOLEAN, TAG_INTEGER, TAG_NULL, TAG_REAL, TAG_TEXT, TAG_TIMESTAMP},
};

/// A schemaless row: an ordered sequence of (field name, value) pairs.
/// Rows of the same table may carry different fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn from_fields(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Replace the value of an existing field, or append a new field.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let position = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(position).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Encode to the tagged binary slot payload: u16 LE field count, then per
    /// field a u8 name length, the name bytes, a u8 type tag and the
    /// type-specific payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DatabaseError> {
        if self.fields.len() > u16::MAX as usize {
            return Err(DatabaseError::SerializationError {
                details: format!("record has too many fields: {}", self.fields.len()),
            });
        }

        let mut buffer = Vec::new();
        buffer.extend_from_slice(&(self.fields.len() as u16).to_le_bytes());

        for (name, value) in &self.fields {
            let name_bytes = name.as_bytes();
            if name_bytes.len() > u8::MAX as usize {
                return Err(DatabaseError::SerializationError {
                    details: format!("field name '{}' exceeds 255 bytes", name),
                });
            }
            buffer.push(name_bytes.len() as u8);
            buffer.extend_from_slice(name_bytes);
            buffer.push(value.type_tag());

            match value {
                Value::Null => {}
                Value::Boolean(b) => buffer.push(if *b { 1 } else { 0 }),
                Value::Integer(i) => buffer.extend_from_slice(&i.to_le_bytes()),
                Value::Real(r) => buffer.extend_from_slice(&r.to_le_bytes()),
                Value::Text(s) => {
                    buffer.extend_from_slice(&(s.len() as u32).to_le_bytes());
                    buffer.extend_from_slice(s.as_bytes());
                }
                Value::Timestamp(ts) => {
                    let encoded = ts.to_rfc3339();
                    buffer.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
                    buffer.extend_from_slice(encoded.as_bytes());
                }
            }
        }

        Ok(buffer)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatabaseError> {
        let mut cursor = 0;

        let field_count = read_u16(bytes, &mut cursor)? as usize;
        let mut fields = Vec::with_capacity(field_count);

        for _ in 0..field_count {
            let name_len = read_u8(bytes, &mut cursor)? as usize;
            let name_bytes = read_slice(bytes, &mut cursor, name_len)?;
            let name = String::from_utf8(name_bytes.to_vec()).map_err(|_| {
                DatabaseError::SerializationError {
                    details: "field name is not valid UTF-8".to_string(),
                }
            })?;

            let tag = read_u8(bytes, &mut cursor)?;
            let value = match tag {
                TAG_NULL => Value::Null,
                TAG_BOOLEAN => Value::Boolean(read_u8(bytes, &mut cursor)? != 0),
                TAG_INTEGER => Value::Integer(i64::from_le_bytes(read_array(bytes, &mut cursor)?)),
                TAG_REAL => Value::Real(f64::from_le_bytes(read_array(bytes, &mut cursor)?)),
                TAG_TEXT => Value::Text(read_string(bytes, &mut cursor)?),
                TAG_TIMESTAMP => {
                    let encoded = read_string(bytes, &mut cursor)?;
                    let ts = DateTime::parse_from_rfc3339(&encoded).map_err(|e| {
                        DatabaseError::SerializationError {
                            details: format!("invalid timestamp '{}': {}", encoded, e),
                        }
                    })?;
                    Value::Timestamp(ts.with_timezone(&Utc))
                }
                _ => {
                    return Err(DatabaseError::SerializationError {
                        details: format!("unknown type tag: {}", tag),
                    });
                }
            };

            fields.push((name, value));
        }

        Ok(Self { fields })
    }
}

/// Value equality, insensitive to field order.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8, DatabaseError> {
    let slice = read_slice(bytes, cursor, 1)?;
    Ok(slice[0])
}

fn read_u16(bytes: &[u8], cursor: &mut usize) -> Result<u16, DatabaseError> {
    let slice = read_slice(bytes, cursor, 2)?;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, DatabaseError> {
    let slice = read_slice(bytes, cursor, 4)?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn read_array<const N: usize>(bytes: &[u8], cursor: &mut usize) -> Result<[u8; N], DatabaseError> {
    let slice = read_slice(bytes, cursor, N)?;
    let mut array = [0u8; N];
    array.copy_from_slice(slice);
    Ok(array)
}

fn read_string(bytes: &[u8], cursor: &mut usize) -> Result<String, DatabaseError> {
    let len = read_u32(bytes, cursor)? as usize;
    let slice = read_slice(bytes, cursor, len)?;
    String::from_utf8(slice.to_vec()).map_err(|_| DatabaseError::SerializationError {
        details: "string payload is not valid UTF-8".to_string(),
    })
}

fn read_slice<'a>(
    bytes: &'a [u8],
    cursor: &mut usize,
    len: usize,
) -> Result<&'a [u8], DatabaseError> {
    let end = cursor
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| DatabaseError::SerializationError {
            details: "record payload truncated".to_string(),
        })?;
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}
