//! Formato persistido del ledger.
//!
//! ```json
//! {"instanceHashes":[{"instanceName":"ss-master_0","hash":"<hex>"}],
//!  "scalesetHashes":[{"scalesetName":"ss-compute","hash":"<hex>"}]}
//! ```
//!
//! Arrays de pares ordenados por nombre; los arrays vacíos se omiten. Campos
//! extra dentro de un par se ignoran.

use serde::{Deserialize, Serialize};

use rollout_core::Fingerprint;

use crate::error::LedgerError;
use crate::ledger::RolloutLedger;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    instance_hashes: Vec<InstanceHash>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    scaleset_hashes: Vec<ScalesetHash>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceHash {
    instance_name: String,
    hash: Fingerprint,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScalesetHash {
    scaleset_name: String,
    hash: Fingerprint,
}

pub fn encode(ledger: &RolloutLedger) -> Result<Vec<u8>, LedgerError> {
    // BTreeMap itera en orden, así que los arrays salen ordenados.
    let doc = LedgerDocument { instance_hashes: ledger.instance_hashes
                                                      .iter()
                                                      .map(|(k, v)| InstanceHash { instance_name: k.clone(), hash: *v })
                                                      .collect(),
                               scaleset_hashes: ledger.scaleset_hashes
                                                      .iter()
                                                      .map(|(k, v)| ScalesetHash { scaleset_name: k.clone(), hash: *v })
                                                      .collect() };
    serde_json::to_vec(&doc).map_err(|e| LedgerError::Encode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<RolloutLedger, LedgerError> {
    let doc: LedgerDocument = serde_json::from_slice(bytes).map_err(|e| LedgerError::Corrupt(e.to_string()))?;
    let mut ledger = RolloutLedger::new();
    for pair in doc.instance_hashes {
        if ledger.instance_hashes.insert(pair.instance_name.clone(), pair.hash).is_some() {
            return Err(LedgerError::Corrupt(format!("duplicate instance {}", pair.instance_name)));
        }
    }
    for pair in doc.scaleset_hashes {
        if ledger.scaleset_hashes.insert(pair.scaleset_name.clone(), pair.hash).is_some() {
            return Err(LedgerError::Corrupt(format!("duplicate scale set {}", pair.scaleset_name)));
        }
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(b: u8) -> Fingerprint { Fingerprint::from_bytes([b; 32]) }

    #[test]
    fn empty_ledger_encodes_to_empty_object() {
        assert_eq!(encode(&RolloutLedger::new()).unwrap(), b"{}");
        assert_eq!(decode(b"{}").unwrap(), RolloutLedger::new());
    }

    #[test]
    fn pairs_are_sorted_by_name() {
        let mut l = RolloutLedger::new();
        l.record_instance("ss-master_2", fp(2));
        l.record_instance("ss-master_0", fp(0));
        l.record_scale_set("ss-compute", fp(9));
        let text = String::from_utf8(encode(&l).unwrap()).unwrap();
        let first = text.find("ss-master_0").unwrap();
        let second = text.find("ss-master_2").unwrap();
        assert!(first < second);
        assert!(text.starts_with(r#"{"instanceHashes":[{"instanceName":"ss-master_0","hash":""#));
        assert!(text.contains(r#""scalesetHashes":[{"scalesetName":"ss-compute""#));
    }

    #[test]
    fn corruption_is_reported_not_defaulted() {
        let hash = fp(1).to_hex();
        let dup = format!(r#"{{"instanceHashes":[{{"instanceName":"a","hash":"{hash}"}},{{"instanceName":"a","hash":"{hash}"}}]}}"#);
        for bad in [b"not json".to_vec(),
                    br#"{"instanceHashes":[{"instanceName":"a","hash":"xyz"}]}"#.to_vec(),
                    br#"{"instanceHashes":[{"hash":"00"}]}"#.to_vec(),
                    dup.into_bytes()]
        {
            assert!(matches!(decode(&bad), Err(LedgerError::Corrupt(_))));
        }
    }

    #[test]
    fn unknown_pair_fields_are_ignored() {
        let hash = fp(3).to_hex();
        let text = format!(r#"{{"instanceHashes":[{{"instanceName":"a","hash":"{hash}","appliedAt":"2024"}}]}}"#);
        let l = decode(text.as_bytes()).unwrap();
        assert_eq!(l.instance("a"), Some(&fp(3)));
    }
}
