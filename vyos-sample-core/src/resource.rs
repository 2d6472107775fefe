//! Resource - Representing declared resources and their attribute values

use std::collections::HashMap;

/// Attribute name used for a plain `Ref` to a resource
pub const REF_ATTRIBUTE: &str = "Ref";

/// Unique identifier for a resource within a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "ec2_vpc", "ec2_transit_gateway")
    pub resource_type: String,
    /// Logical ID inside the stack (e.g., "VPC1")
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another resource's attribute (logical_id, attribute_name)
    ///
    /// The attribute [`REF_ATTRIBUTE`] stands for the resource's primary identifier.
    ResourceRef(String, String),
    /// Values concatenated with a delimiter once every part is known
    Join { delimiter: String, parts: Vec<Value> },
    /// Value encoded as base64 by the engine (instance user data)
    Base64(Box<Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Primary identifier of another resource
    pub fn reference(logical_id: impl Into<String>) -> Self {
        Value::ResourceRef(logical_id.into(), REF_ATTRIBUTE.to_string())
    }

    /// Named attribute of another resource
    pub fn attr(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::ResourceRef(logical_id.into(), attribute.into())
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<Value>) -> Self {
        Value::Join {
            delimiter: delimiter.into(),
            parts,
        }
    }

    pub fn base64(value: Value) -> Self {
        Value::Base64(Box::new(value))
    }

    /// Build a map value from string keys, e.g. a tag set
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Collect every (logical_id, attribute) pair referenced by a value
pub fn collect_references(value: &Value, refs: &mut Vec<(String, String)>) {
    match value {
        Value::ResourceRef(target, attribute) => {
            refs.push((target.clone(), attribute.clone()));
        }
        Value::List(items) => {
            for item in items {
                collect_references(item, refs);
            }
        }
        Value::Map(map) => {
            for v in map.values() {
                collect_references(v, refs);
            }
        }
        Value::Join { parts, .. } => {
            for part in parts {
                collect_references(part, refs);
            }
        }
        Value::Base64(inner) => collect_references(inner, refs),
        Value::String(_) | Value::Int(_) | Value::Bool(_) => {}
    }
}

/// Attribute name recorded for an explicit ordering dependency
pub const DEPENDS_ON_ATTRIBUTE: &str = "DependsOn";

/// Desired state declared by a stack definition
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
    /// Resources that must exist first although no attribute refers to them
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Adds a `Name` tag, merging with any tags already present
    pub fn with_name_tag(self, name: impl Into<String>) -> Self {
        self.with_tag("Name", name)
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let entry = self
            .attributes
            .entry("tags".to_string())
            .or_insert_with(|| Value::Map(HashMap::new()));
        if let Value::Map(tags) = entry {
            tags.insert(key.into(), Value::String(value.into()));
        }
        self
    }

    pub fn with_dependency(mut self, logical_id: impl Into<String>) -> Self {
        let logical_id = logical_id.into();
        if !self.depends_on.contains(&logical_id) {
            self.depends_on.push(logical_id);
        }
        self
    }

    pub fn logical_id(&self) -> &str {
        &self.id.name
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// All references made by this resource as (attribute_key, logical_id, attribute),
    /// explicit dependencies last
    pub fn references(&self) -> Vec<(String, String, String)> {
        let mut keys: Vec<_> = self.attributes.keys().collect();
        keys.sort();

        let mut out = Vec::new();
        for key in keys {
            let mut refs = Vec::new();
            collect_references(&self.attributes[key], &mut refs);
            for (target, attribute) in refs {
                out.push((key.clone(), target, attribute));
            }
        }
        for target in &self.depends_on {
            out.push((
                "depends_on".to_string(),
                target.clone(),
                DEPENDS_ON_ATTRIBUTE.to_string(),
            ));
        }
        out
    }
}
