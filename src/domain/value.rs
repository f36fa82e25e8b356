//! Dynamic property values stored inside node instances.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared kind of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    String,
    Int,
    Bool,
    List,
}

/// Dynamically-typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Value::String(_) => PropertyKind::String,
            Value::Int(_) => PropertyKind::Int,
            Value::Bool(_) => PropertyKind::Bool,
            Value::List(_) => PropertyKind::List,
        }
    }

    /// Neutral default used when a managed instance is initialized from its schema.
    pub fn default_for(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::String => Value::String(String::new()),
            PropertyKind::Int => Value::Int(0),
            PropertyKind::Bool => Value::Bool(false),
            PropertyKind::List => Value::List(Vec::new()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_each_kind_when_defaulting_then_kind_matches() {
        for kind in [
            PropertyKind::String,
            PropertyKind::Int,
            PropertyKind::Bool,
            PropertyKind::List,
        ] {
            assert_eq!(Value::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn given_list_value_when_displaying_then_elements_are_comma_separated() {
        let value = Value::List(vec![Value::from("a"), Value::from(1i64)]);
        assert_eq!(value.to_string(), "[a, 1]");
    }
}
