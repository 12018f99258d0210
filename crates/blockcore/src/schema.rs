use crate::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a port carries one value or a homogeneous ordered list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    List,
}

/// Declared property of a block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub value_type: ValueType,
    /// Raw default text, coerced like any supplied value when used
    pub default_value: Option<String>,
}

/// Declared input or output of a block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    pub value_type: ValueType,
    pub cardinality: Cardinality,
}

/// Static description of a block type, shared by every instance of it.
///
/// Schemas are plain data: a block type declares its schema once through
/// the builder methods below instead of being inspected at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSchema {
    pub type_name: String,
    pub family: String,
    pub module: String,
    pub description: String,
    /// Run the block in a separate worker process when one is configured
    pub external: bool,
    pub properties: BTreeMap<String, PropertySpec>,
    pub inputs: BTreeMap<String, PortSpec>,
    pub outputs: BTreeMap<String, PortSpec>,
}

impl BlockSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            family: "general".to_string(),
            module: String::new(),
            description: String::new(),
            external: false,
            properties: BTreeMap::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        value_type: ValueType,
        default_value: Option<&str>,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            PropertySpec {
                name,
                value_type,
                default_value: default_value.map(str::to_string),
            },
        );
        self
    }

    pub fn input(
        mut self,
        name: impl Into<String>,
        value_type: ValueType,
        cardinality: Cardinality,
    ) -> Self {
        let name = name.into();
        self.inputs.insert(
            name.clone(),
            PortSpec {
                name,
                value_type,
                cardinality,
            },
        );
        self
    }

    pub fn output(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        self.outputs.insert(
            name.clone(),
            PortSpec {
                name,
                value_type,
                cardinality: Cardinality::Single,
            },
        );
        self
    }

    pub fn input_port(&self, name: &str) -> Option<&PortSpec> {
        self.inputs.get(name)
    }

    pub fn output_port(&self, name: &str) -> Option<&PortSpec> {
        self.outputs.get(name)
    }
}
