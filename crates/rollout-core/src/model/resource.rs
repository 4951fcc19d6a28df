use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Referencia tipada a otro recurso del mismo documento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self { resource_type: resource_type.into(), name: name.into() }
    }
}

/// Recurso declarado en el estado deseado. `properties` es el árbol libre que
/// se envía tal cual al proveedor; `depends_on` son dependencias explícitas que
/// se suman a las descubiertas en `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Value>,
    #[serde(default)]
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ResourceRef>,
}

impl ResourceDeclaration {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>, properties: Value) -> Self {
        Self { resource_type: resource_type.into(),
               name: name.into(),
               location: None,
               sku: None,
               properties,
               tags: None,
               depends_on: Vec::new() }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_sku(mut self, sku: Value) -> Self {
        self.sku = Some(sku);
        self
    }

    pub fn with_tags(mut self, tags: Value) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn depends_on(mut self, dependency: ResourceRef) -> Self {
        self.depends_on.push(dependency);
        self
    }
}
