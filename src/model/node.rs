//! Value node in the constraint hypergraph.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use super::Value;

/// A value node. The label is the node's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: String,
    pub value: Option<Value>,
    /// Resolved from `is_constant` or the legacy `constant` key.
    pub is_constant: bool,
    pub description: Option<String>,
    pub units: Option<String>,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            is_constant: false,
            description: None,
            units: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn constant(mut self) -> Self {
        self.is_constant = true;
        self
    }

    /// Legacy alias of `is_constant`.
    pub fn is_legacy_constant(&self) -> bool {
        self.is_constant
    }
}

/// Canonical form writes both the current and the legacy constant key.
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Node", 6)?;
        st.serialize_field("label", &self.label)?;
        if let Some(value) = &self.value {
            st.serialize_field("value", value)?;
        }
        st.serialize_field("is_constant", &self.is_constant)?;
        st.serialize_field("constant", &self.is_constant)?;
        if let Some(description) = &self.description {
            st.serialize_field("description", description)?;
        }
        if let Some(units) = &self.units {
            st.serialize_field("units", units)?;
        }
        st.end()
    }
}
