//! Block catalog served to the workflow designer front end

use crate::{BlockSchema, Cardinality};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Property,
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogField {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
    pub role: FieldRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attrs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    pub family: String,
    pub module: String,
    pub description: String,
    pub fields: Vec<CatalogField>,
}

impl From<&BlockSchema> for CatalogEntry {
    fn from(schema: &BlockSchema) -> Self {
        let properties = schema.properties.values().map(|p| CatalogField {
            name: p.name.clone(),
            value_type: p.value_type.to_string(),
            default_value: Some(p.default_value.clone().unwrap_or_default()),
            cardinality: None,
            role: FieldRole::Property,
            attrs: Some("editable".to_string()),
        });

        let ports = |role: FieldRole| {
            move |p: &crate::PortSpec| CatalogField {
                name: p.name.clone(),
                value_type: p.value_type.to_string(),
                default_value: None,
                cardinality: Some(p.cardinality),
                role,
                attrs: None,
            }
        };

        let fields = properties
            .chain(schema.inputs.values().map(ports(FieldRole::Input)))
            .chain(schema.outputs.values().map(ports(FieldRole::Output)))
            .collect();

        Self {
            name: schema.type_name.clone(),
            family: schema.family.clone(),
            module: schema.module.clone(),
            description: schema.description.clone(),
            fields,
        }
    }
}
