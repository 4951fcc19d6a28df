//! Resource ids completos del proveedor:
//! `/subscriptions/{s}/resourceGroups/{g}/providers/{ns}/{type}/{name}[/{child type}/{child name}...]`.

use serde::{Deserialize, Serialize};

use crate::errors::GraphError;

/// Segmentos de un id top-level, contando el vacío inicial.
const TOP_LEVEL_SEGMENTS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderContext {
    pub subscription_id: String,
    pub resource_group: String,
}

impl ProviderContext {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self { subscription_id: subscription_id.into(), resource_group: resource_group.into() }
    }

    /// Id de un recurso a partir de su tipo y nombre. Para tipos hijos
    /// (`ns/parent/child`) el nombre debe tener un segmento por nivel
    /// (`parent/child`).
    pub fn resource_id(&self, resource_type: &str, name: &str) -> Result<String, GraphError> {
        let malformed = || GraphError::MalformedName { resource_type: resource_type.to_string(), name: name.to_string() };
        let type_segments: Vec<&str> = resource_type.split('/').collect();
        let name_segments: Vec<&str> = name.split('/').collect();
        if type_segments.len() < 2
           || type_segments.len() - 1 != name_segments.len()
           || type_segments.iter().chain(name_segments.iter()).any(|s| s.is_empty())
        {
            return Err(malformed());
        }
        let mut id = format!("/subscriptions/{}/resourceGroups/{}/providers/{}",
                             self.subscription_id, self.resource_group, type_segments[0]);
        for (t, n) in type_segments[1..].iter().zip(name_segments) {
            id.push('/');
            id.push_str(t);
            id.push('/');
            id.push_str(n);
        }
        Ok(id)
    }
}

/// Si `candidate` tiene forma de resource id, devuelve el id del recurso
/// top-level (sin sufijos de sub-recurso). Cualquier otra cadena devuelve
/// `None`.
pub fn top_level_id(candidate: &str) -> Option<String> {
    let parts: Vec<&str> = candidate.split('/').take(TOP_LEVEL_SEGMENTS).collect();
    if parts.len() != TOP_LEVEL_SEGMENTS || !parts[0].is_empty() {
        return None;
    }
    if !parts[1].eq_ignore_ascii_case("subscriptions")
       || !parts[3].eq_ignore_ascii_case("resourceGroups")
       || !parts[5].eq_ignore_ascii_case("providers")
    {
        return None;
    }
    if parts[1..].iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts.join("/"))
}

/// Tipo y nombre del padre de un recurso hijo.
pub fn parent_of(resource_type: &str, name: &str) -> Option<(String, String)> {
    if resource_type.matches('/').count() < 2 {
        return None;
    }
    let (parent_type, _) = resource_type.rsplit_once('/')?;
    let (parent_name, _) = name.rsplit_once('/')?;
    Some((parent_type.to_string(), parent_name.to_string()))
}
