//! Convenciones de nombres compartidas entre el renderer, los controladores y
//! los adaptadores del proveedor.

const SCALE_SET_PREFIX: &str = "ss-";

/// Nombre del scale set de un pool (`ss-<pool>`).
pub fn scale_set_name(pool: &str) -> String { format!("{SCALE_SET_PREFIX}{pool}") }

/// Pool al que pertenece un scale set, si sigue la convención.
pub fn pool_from_scale_set(scale_set: &str) -> Option<&str> {
    scale_set.strip_prefix(SCALE_SET_PREFIX).filter(|p| !p.is_empty())
}

/// Nombre de la VM de una instancia (`<scale set>_<instance id>`). Es la clave
/// del ledger.
pub fn instance_name(scale_set: &str, instance_id: &str) -> String { format!("{scale_set}_{instance_id}") }

/// Prefijo de computer name que el proveedor completa con el id en base36.
pub fn computer_name_prefix(pool: &str) -> String { format!("{pool}-") }

/// Computer name asignado por el proveedor: prefijo + id en base36 con padding
/// a 6 caracteres.
pub fn computer_name(pool: &str, instance_id: u64) -> String {
    format!("{}{:0>6}", computer_name_prefix(pool), base36(instance_id))
}

pub fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computer_names_are_padded_base36() {
        assert_eq!(computer_name("master", 0), "master-000000");
        assert_eq!(computer_name("compute", 35), "compute-00000z");
        assert_eq!(computer_name("infra", 36), "infra-000010");
    }

    #[test]
    fn scale_set_round_trip() {
        let ss = scale_set_name("infra");
        assert_eq!(ss, "ss-infra");
        assert_eq!(pool_from_scale_set(&ss), Some("infra"));
        assert_eq!(pool_from_scale_set("vmss-other"), None);
        assert_eq!(pool_from_scale_set("ss-"), None);
        assert_eq!(instance_name(&ss, "3"), "ss-infra_3");
    }
}
