//! Structural schemas: declared descriptors compiled into validated schemas.
//!
//! There is no reflection here. A declared type ships an explicit
//! `SchemaDescriptor` (usually via [`ManagedType`]) listing its named, typed,
//! read-only or mutable properties. The descriptor is compiled once into a
//! `StructSchema`, the validated form every projection and view works from.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::value::PropertyKind;

/// Mutability of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// One declared property in a bind-time descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    pub access: Access,
}

/// Bind-time type declaration supplied by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub type_name: String,
    pub properties: Vec<PropertyDescriptor>,
}

impl SchemaDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
        }
    }

    /// Append a property declaration (builder style).
    pub fn property(mut self, name: impl Into<String>, kind: PropertyKind, access: Access) -> Self {
        self.properties.push(PropertyDescriptor {
            name: name.into(),
            kind,
            access,
        });
        self
    }
}

/// Declared types ship an explicit schema descriptor.
pub trait ManagedType {
    const TYPE_NAME: &'static str;

    fn descriptor() -> SchemaDescriptor;
}

/// Validated property entry of a compiled schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySchema {
    pub name: String,
    pub kind: PropertyKind,
    pub access: Access,
}

/// Compiled, cached structural description of a declared type.
///
/// Compilation is pure and deterministic: properties live in a `BTreeMap`, so
/// two compilations of the same descriptor are structurally identical.
#[derive(Debug, PartialEq, Eq)]
pub struct StructSchema {
    type_name: String,
    properties: BTreeMap<String, PropertySchema>,
}

impl StructSchema {
    /// Compile a descriptor, rejecting structurally invalid declarations.
    pub fn compile(descriptor: &SchemaDescriptor) -> Result<Self, DomainError> {
        if descriptor.type_name.is_empty() {
            return Err(DomainError::Schema {
                type_name: String::from("<unnamed>"),
                reason: "empty type name".to_string(),
            });
        }

        let duplicates: Vec<&str> = descriptor
            .properties
            .iter()
            .map(|p| p.name.as_str())
            .duplicates()
            .collect();
        if !duplicates.is_empty() {
            return Err(DomainError::Schema {
                type_name: descriptor.type_name.clone(),
                reason: format!("ambiguous properties: {}", duplicates.iter().join(", ")),
            });
        }

        let properties = descriptor
            .properties
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    PropertySchema {
                        name: p.name.clone(),
                        kind: p.kind,
                        access: p.access,
                    },
                )
            })
            .collect();

        Ok(Self {
            type_name: descriptor.type_name.clone(),
            properties,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.get(name)
    }

    /// Properties in deterministic (name) order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertySchema> {
        self.properties.values()
    }

    pub fn is_writable(&self, name: &str) -> bool {
        matches!(
            self.properties.get(name),
            Some(PropertySchema {
                access: Access::ReadWrite,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar_descriptor() -> SchemaDescriptor {
        SchemaDescriptor::new("JarSpec")
            .property("archive_name", PropertyKind::String, Access::ReadWrite)
            .property("version", PropertyKind::String, Access::ReadWrite)
            .property("kind", PropertyKind::String, Access::ReadOnly)
    }

    #[test]
    fn given_valid_descriptor_when_compiling_then_properties_are_queryable() {
        let schema = StructSchema::compile(&jar_descriptor()).unwrap();

        assert_eq!(schema.type_name(), "JarSpec");
        assert!(schema.is_writable("archive_name"));
        assert!(!schema.is_writable("kind"));
        assert!(schema.property("missing").is_none());
    }

    #[test]
    fn given_duplicate_properties_when_compiling_then_schema_error() {
        let descriptor = SchemaDescriptor::new("Broken")
            .property("x", PropertyKind::Int, Access::ReadWrite)
            .property("x", PropertyKind::String, Access::ReadOnly);

        let err = StructSchema::compile(&descriptor).unwrap_err();
        assert!(matches!(err, DomainError::Schema { .. }));
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn given_same_descriptor_when_compiling_twice_then_schemas_are_equal() {
        let a = StructSchema::compile(&jar_descriptor()).unwrap();
        let b = StructSchema::compile(&jar_descriptor()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn given_empty_type_name_when_compiling_then_schema_error() {
        let descriptor = SchemaDescriptor::new("");
        assert!(matches!(
            StructSchema::compile(&descriptor),
            Err(DomainError::Schema { .. })
        ));
    }
}
