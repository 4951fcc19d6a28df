use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::constants::{TEMPLATE_CONTENT_VERSION, TEMPLATE_SCHEMA};
use crate::errors::GraphError;
use crate::model::ResourceDeclaration;

/// Nodo del grafo: la declaración original más lo calculado al compilar.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub api_version: &'static str,
    /// Ids de otros nodos del mismo grafo, ordenados.
    pub depends_on: BTreeSet<String>,
    pub declaration: ResourceDeclaration,
}

impl GraphNode {
    pub fn resource_type(&self) -> &str { &self.declaration.resource_type }

    pub fn name(&self) -> &str { &self.declaration.name }

    /// Forma del recurso dentro del documento de despliegue.
    pub fn to_resource_json(&self) -> Value {
        let d = &self.declaration;
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(d.resource_type.clone()));
        obj.insert("name".into(), Value::String(d.name.clone()));
        obj.insert("apiVersion".into(), Value::String(self.api_version.to_string()));
        if let Some(location) = &d.location {
            obj.insert("location".into(), Value::String(location.clone()));
        }
        if let Some(sku) = &d.sku {
            obj.insert("sku".into(), sku.clone());
        }
        obj.insert("properties".into(), d.properties.clone());
        if let Some(tags) = &d.tags {
            obj.insert("tags".into(), tags.clone());
        }
        if !self.depends_on.is_empty() {
            obj.insert("dependsOn".into(), json!(self.depends_on));
        }
        Value::Object(obj)
    }
}

/// Grafo de despliegue en memoria. Se construye en cada rollout y nunca se
/// persiste; conserva el orden de declaración de los recursos.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeploymentGraph {
    pub(crate) nodes: IndexMap<String, GraphNode>,
}

impl DeploymentGraph {
    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> { self.nodes.values() }

    pub fn node(&self, id: &str) -> Option<&GraphNode> { self.nodes.get(id) }

    pub fn find(&self, resource_type: &str, name: &str) -> Option<&GraphNode> {
        self.nodes
            .values()
            .find(|n| n.resource_type().eq_ignore_ascii_case(resource_type) && n.name() == name)
    }

    /// Orden topológico determinista (Kahn con desempate lexicográfico por
    /// id). Un ciclo devuelve `DependencyCycle`.
    pub fn topological_order(&self) -> Result<Vec<&GraphNode>, GraphError> {
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for node in self.nodes.values() {
            pending.insert(node.id.as_str(), node.depends_on.len());
            for dep in &node.depends_on {
                dependents.entry(dep.as_str()).or_default().push(node.id.as_str());
            }
        }
        let mut ready: BTreeSet<&str> = pending.iter().filter(|(_, n)| **n == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_first() {
            pending.remove(id);
            if let Some(node) = self.nodes.get(id) {
                order.push(node);
            }
            for &dependent in dependents.get(id).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }
        match pending.keys().next() {
            Some(stuck) => Err(GraphError::DependencyCycle((*stuck).to_string())),
            None => Ok(order),
        }
    }

    /// Documento completo para la API de despliegue.
    pub fn to_document(&self) -> Value {
        let resources: Vec<Value> = self.nodes.values().map(GraphNode::to_resource_json).collect();
        json!({
            "$schema": TEMPLATE_SCHEMA,
            "contentVersion": TEMPLATE_CONTENT_VERSION,
            "parameters": {},
            "variables": {},
            "resources": resources,
            "outputs": {},
        })
    }
}
