//! Tabla estática tipo de recurso → api-version.

use crate::errors::GraphError;

const API_VERSIONS: &[(&str, &str)] = &[("Microsoft.Network/networkSecurityGroups", "2016-03-30"),
                                        ("Microsoft.Network/virtualNetworks", "2016-03-30"),
                                        ("Microsoft.Network/virtualNetworks/subnets", "2016-03-30"),
                                        ("Microsoft.Network/loadBalancers", "2017-10-01"),
                                        ("Microsoft.Network/publicIPAddresses", "2017-10-01"),
                                        ("Microsoft.Compute/virtualMachineScaleSets", "2017-12-01"),
                                        ("Microsoft.Storage/storageAccounts", "2015-06-15")];

/// Un tipo desconocido es un error de configuración fatal.
pub fn api_version_for(resource_type: &str) -> Result<&'static str, GraphError> {
    API_VERSIONS.iter()
                .find(|(t, _)| t.eq_ignore_ascii_case(resource_type))
                .map(|(_, v)| *v)
                .ok_or_else(|| GraphError::UnknownResourceType(resource_type.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_resolve() {
        assert_eq!(api_version_for("Microsoft.Compute/virtualMachineScaleSets").unwrap(), "2017-12-01");
        assert_eq!(api_version_for("microsoft.network/loadbalancers").unwrap(), "2017-10-01");
    }

    #[test]
    fn unknown_type_is_fatal() {
        assert_eq!(api_version_for("Microsoft.Web/sites"),
                   Err(GraphError::UnknownResourceType("Microsoft.Web/sites".into())));
    }
}
