//! Fingerprint de un scale group.
//!
//! El descriptor se serializa a JSON, se eliminan los campos que no deben
//! provocar churn (`count`, `tags`), se envuelve junto a
//! [`FINGERPRINT_VERSION`] y se hashea la forma canónica con SHA-256.

use serde::Serialize;
use serde_json::{json, Value};

use crate::constants::FINGERPRINT_VERSION;
use crate::model::{Fingerprint, ScaleGroupDescriptor};

use super::canonical_json::to_canonical_json;
use super::hash::sha256;

/// Campos del descriptor que se ignoran al calcular el fingerprint.
pub const VOLATILE_FIELDS: [&str; 2] = ["count", "tags"];

/// Insumos del fingerprint antes de canonicalizar.
#[derive(Serialize)]
struct ScaleGroupFingerprintInput<'a> {
    fingerprint_version: &'a str,
    descriptor: Value,
}

/// Función pura: descriptores que sólo difieren en `count` o `tags` producen
/// el mismo fingerprint.
pub fn fingerprint(descriptor: &ScaleGroupDescriptor) -> Fingerprint {
    let mut value = json!(descriptor);
    if let Value::Object(map) = &mut value {
        for field in VOLATILE_FIELDS {
            map.remove(field);
        }
    }
    let input = ScaleGroupFingerprintInput { fingerprint_version: FINGERPRINT_VERSION, descriptor: value };
    let canonical = to_canonical_json(&json!(input));
    Fingerprint::from_bytes(sha256(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageReference, NetworkAttachment, PoolRole};

    fn descriptor() -> ScaleGroupDescriptor {
        ScaleGroupDescriptor { name: "compute".into(),
                               role: PoolRole::Compute,
                               count: 3,
                               vm_size: "Standard_D4s_v3".into(),
                               image: ImageReference { publisher: "redhat".into(),
                                                       offer: "osa".into(),
                                                       sku: "osa_311".into(),
                                                       version: "311.43.20181121".into() },
                               startup_payload: "#!/bin/bash\nstart-node".into(),
                               network: NetworkAttachment { subnet_id: "/subscriptions/s/resourceGroups/g/providers/Microsoft.Network/virtualNetworks/vnet/subnets/default".into(),
                                                            load_balancer_backend_pools: vec![] },
                               tags: Default::default() }
    }

    #[test]
    fn count_and_tags_do_not_change_fingerprint() {
        let a = descriptor();
        let mut b = descriptor();
        b.count = 17;
        b.tags.insert("scaled-at".into(), "2024-01-01".into());
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn size_image_and_payload_change_fingerprint() {
        let base = fingerprint(&descriptor());
        let mut sized = descriptor();
        sized.vm_size = "Standard_D8s_v3".into();
        let mut imaged = descriptor();
        imaged.image.version = "311.44.20190101".into();
        let mut payload = descriptor();
        payload.startup_payload.push_str(" --verbose");
        assert_ne!(base, fingerprint(&sized));
        assert_ne!(base, fingerprint(&imaged));
        assert_ne!(base, fingerprint(&payload));
    }
}
