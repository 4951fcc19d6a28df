//! Render de un [`ScaleGroupDescriptor`] a la declaración del scale set.

use serde_json::{json, Map, Value};

use crate::constants::{ROLE_TAG, SCALE_SET_TYPE};
use crate::model::{DesiredState, ResourceDeclaration, ScaleGroupDescriptor};
use crate::names;

/// Variaciones del render que no forman parte del estado deseado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions<'a> {
    /// Backup de etcd con el que arranca el control-plane. Sólo modifica el
    /// custom data renderizado, no el descriptor, así que el fingerprint no
    /// cambia.
    pub restore_backup: Option<&'a str>,
}

pub fn render_scale_set(desired: &DesiredState, pool: &ScaleGroupDescriptor, options: &RenderOptions<'_>)
                        -> ResourceDeclaration {
    let mut custom_data = pool.startup_payload.clone();
    if let (true, Some(backup)) = (pool.role.is_control_plane(), options.restore_backup) {
        custom_data.push_str(&format!("\nRESTORE_FROM_BACKUP={backup}\n"));
    }

    let backend_pools: Vec<Value> =
        pool.network.load_balancer_backend_pools.iter().map(|id| json!({ "id": id })).collect();
    let properties = json!({
        "upgradePolicy": { "mode": "Manual" },
        "overprovision": false,
        "virtualMachineProfile": {
            "osProfile": {
                "computerNamePrefix": names::computer_name_prefix(&pool.name),
                "adminUsername": "cloud-user",
                "customData": custom_data,
            },
            "storageProfile": {
                "imageReference": {
                    "publisher": pool.image.publisher,
                    "offer": pool.image.offer,
                    "sku": pool.image.sku,
                    "version": pool.image.version,
                },
                "osDisk": { "createOption": "FromImage", "managedDisk": { "storageAccountType": "Premium_LRS" } },
            },
            "networkProfile": {
                "networkInterfaceConfigurations": [{
                    "name": "nic",
                    "properties": {
                        "primary": true,
                        "ipConfigurations": [{
                            "name": "ipconfig",
                            "properties": {
                                "subnet": { "id": pool.network.subnet_id },
                                "loadBalancerBackendAddressPools": backend_pools,
                            },
                        }],
                    },
                }],
            },
        },
    });

    let mut tags: Map<String, Value> = pool.tags.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
    tags.insert(ROLE_TAG.to_string(), Value::String(pool.role.as_str().to_string()));

    ResourceDeclaration::new(SCALE_SET_TYPE, pool.scale_set_name(), properties)
        .with_location(desired.location.clone())
        .with_sku(json!({ "name": pool.vm_size, "tier": "Standard", "capacity": pool.count }))
        .with_tags(Value::Object(tags))
}
