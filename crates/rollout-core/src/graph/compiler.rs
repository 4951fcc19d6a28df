//! Compilación de declaraciones a [`DeploymentGraph`].
//!
//! Por recurso: estampa la api-version, descubre referencias recorriendo
//! `properties` (cualquier string con forma de resource id, recortado al
//! recurso top-level), agrega la dependencia implícita hijo → padre y las
//! dependencias explícitas. Se descartan autorreferencias y referencias a
//! recursos externos al documento.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::errors::GraphError;
use crate::model::ResourceDeclaration;

use super::api_versions::api_version_for;
use super::document::{DeploymentGraph, GraphNode};
use super::resource_id::{parent_of, top_level_id, ProviderContext};

pub fn compile(ctx: &ProviderContext, resources: Vec<ResourceDeclaration>) -> Result<DeploymentGraph, GraphError> {
    // ids en minúsculas -> id canónico; el proveedor compara ids sin mayúsculas.
    let mut index: HashMap<String, String> = HashMap::with_capacity(resources.len());
    let mut stamped = Vec::with_capacity(resources.len());
    for r in &resources {
        let api_version = api_version_for(&r.resource_type)?;
        let id = ctx.resource_id(&r.resource_type, &r.name)?;
        if index.insert(id.to_lowercase(), id.clone()).is_some() {
            return Err(GraphError::DuplicateResource(id));
        }
        stamped.push((id, api_version));
    }

    let mut nodes = IndexMap::with_capacity(resources.len());
    for (declaration, (id, api_version)) in resources.into_iter().zip(stamped) {
        let mut candidates = BTreeSet::new();
        collect_references(&declaration.properties, &mut candidates);
        if let Some((parent_type, parent_name)) = parent_of(&declaration.resource_type, &declaration.name) {
            if let Ok(parent_id) = ctx.resource_id(&parent_type, &parent_name) {
                candidates.insert(parent_id);
            }
        }

        let mut depends_on = BTreeSet::new();
        for candidate in candidates {
            match index.get(&candidate.to_lowercase()) {
                Some(known) if !known.eq_ignore_ascii_case(&id) => {
                    depends_on.insert(known.clone());
                }
                Some(_) => {}
                None => debug!("{id}: ignoring external reference {candidate}"),
            }
        }
        for explicit in &declaration.depends_on {
            let dependency = ctx.resource_id(&explicit.resource_type, &explicit.name)?;
            match index.get(&dependency.to_lowercase()) {
                Some(known) if !known.eq_ignore_ascii_case(&id) => {
                    depends_on.insert(known.clone());
                }
                Some(_) => {}
                None => return Err(GraphError::UnknownDependency { resource: id, dependency }),
            }
        }

        nodes.insert(id.clone(), GraphNode { id, api_version, depends_on, declaration });
    }

    let graph = DeploymentGraph { nodes };
    graph.topological_order()?;
    Ok(graph)
}

/// Recorre el árbol y guarda cada string con forma de resource id.
fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            if let Some(id) = top_level_id(s) {
                out.insert(id);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_references(v, out)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
