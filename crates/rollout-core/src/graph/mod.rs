//! Compilador del grafo de despliegue.
pub mod api_versions;
pub mod compiler;
pub mod document;
pub mod resource_id;
pub mod scale_set;

pub use api_versions::api_version_for;
pub use compiler::compile;
pub use document::{DeploymentGraph, GraphNode};
pub use resource_id::{parent_of, top_level_id, ProviderContext};
pub use scale_set::{render_scale_set, RenderOptions};

use crate::errors::GraphError;
use crate::model::DesiredState;

/// Grafo completo de un estado deseado: los recursos de infraestructura
/// declarados más un scale set por pool.
pub fn compile_desired_state(desired: &DesiredState, options: &RenderOptions<'_>) -> Result<DeploymentGraph, GraphError> {
    let mut resources = desired.resources.clone();
    resources.extend(desired.pools_in_update_order().into_iter().map(|pool| render_scale_set(desired, pool, options)));
    compile(&desired.provider_context(), resources)
}
