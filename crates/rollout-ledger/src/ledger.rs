use std::collections::BTreeMap;

use rollout_core::Fingerprint;

/// Último fingerprint aplicado por instancia (`ss-<pool>_<id>`) y por scale
/// set. Vacío al inicializar el cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloutLedger {
    pub(crate) instance_hashes: BTreeMap<String, Fingerprint>,
    pub(crate) scaleset_hashes: BTreeMap<String, Fingerprint>,
}

impl RolloutLedger {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.instance_hashes.is_empty() && self.scaleset_hashes.is_empty() }

    pub fn instance(&self, name: &str) -> Option<&Fingerprint> { self.instance_hashes.get(name) }

    /// `true` si la instancia ya tiene aplicado `desired`.
    pub fn is_current(&self, name: &str, desired: &Fingerprint) -> bool { self.instance(name) == Some(desired) }

    pub fn record_instance(&mut self, name: impl Into<String>, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.instance_hashes.insert(name.into(), fingerprint)
    }

    pub fn remove_instance(&mut self, name: &str) -> Option<Fingerprint> { self.instance_hashes.remove(name) }

    pub fn instances(&self) -> impl Iterator<Item = (&str, &Fingerprint)> {
        self.instance_hashes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn scale_set(&self, name: &str) -> Option<&Fingerprint> { self.scaleset_hashes.get(name) }

    pub fn record_scale_set(&mut self, name: impl Into<String>, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.scaleset_hashes.insert(name.into(), fingerprint)
    }

    pub fn remove_scale_set(&mut self, name: &str) -> Option<Fingerprint> { self.scaleset_hashes.remove(name) }

    pub fn scale_sets(&self) -> impl Iterator<Item = (&str, &Fingerprint)> {
        self.scaleset_hashes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Quita las entradas de instancia de un scale set. Devuelve cuántas.
    pub fn clear_scale_set_instances(&mut self, scale_set: &str) -> usize {
        let prefix = format!("{scale_set}_");
        let before = self.instance_hashes.len();
        self.instance_hashes.retain(|name, _| !name.starts_with(&prefix));
        before - self.instance_hashes.len()
    }

    /// Conserva sólo las instancias para las que `keep` devuelve `true`.
    /// Devuelve los nombres quitados.
    pub fn retain_instances(&mut self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let removed: Vec<String> = self.instance_hashes.keys().filter(|k| !keep(k.as_str())).cloned().collect();
        for name in &removed {
            self.instance_hashes.remove(name);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(b: u8) -> Fingerprint { Fingerprint::from_bytes([b; 32]) }

    #[test]
    fn clear_scale_set_instances_only_touches_that_set() {
        let mut l = RolloutLedger::new();
        l.record_instance("ss-master_0", fp(1));
        l.record_instance("ss-master_1", fp(1));
        l.record_instance("ss-master-old_0", fp(1));
        l.record_instance("ss-compute_0", fp(2));
        assert_eq!(l.clear_scale_set_instances("ss-master"), 2);
        let left: Vec<&str> = l.instances().map(|(n, _)| n).collect();
        assert_eq!(left, vec!["ss-compute_0", "ss-master-old_0"]);
    }

    #[test]
    fn is_current_requires_exact_match() {
        let mut l = RolloutLedger::new();
        assert!(!l.is_current("ss-infra_0", &fp(1)));
        l.record_instance("ss-infra_0", fp(1));
        assert!(l.is_current("ss-infra_0", &fp(1)));
        assert!(!l.is_current("ss-infra_0", &fp(2)));
    }
}
