//! Normalization of resource quota quantities.
//!
//! Quotas are compared as plain numbers: CPU in whole cores, memory and
//! storage in GB-scaled units, everything else as a count.

use kube_wrench_core::QuantityError;

/// How a quota key's quantities are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// `cpu`, `requests.cpu`, `limits.cpu`.
    Cpu,
    /// Memory and storage keys.
    Memory,
    /// Object counts and anything else.
    Count,
}

impl ResourceKind {
    /// Classify a quota key.
    #[must_use]
    pub fn of(key: &str) -> Self {
        match key {
            "cpu" | "requests.cpu" | "limits.cpu" => Self::Cpu,
            _ => {
                let last = key.rsplit('.').next().unwrap_or(key);
                if matches!(last, "memory" | "storage" | "ephemeral-storage") {
                    Self::Memory
                } else {
                    Self::Count
                }
            }
        }
    }
}

fn parse_number(raw: &str, digits: &str) -> Result<f64, QuantityError> {
    digits
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| QuantityError::InvalidNumber(raw.to_string()))
}

/// Convert a CPU quantity to whole cores, rounding up.
///
/// `500m` is 1 core, `1500m` is 2, `2` is 2 and the empty string is 0.
///
/// # Errors
///
/// Returns an error if the numeric part does not parse.
pub fn cpu_cores(raw: &str) -> Result<f64, QuantityError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    let cores = match raw.strip_suffix('m') {
        Some(millis) => parse_number(raw, millis)? / 1000.0,
        None => parse_number(raw, raw)?,
    };
    Ok(cores.ceil())
}

/// Convert a memory or storage quantity to GB-scaled units.
///
/// `Mi` divides by 1000, `Ki` by 1 000 000, `Gi` is taken as is and `Ti`
/// multiplies by 1000. Bare numbers and the empty string are 0.
///
/// # Errors
///
/// Returns an error for any other unit suffix or a bad numeric part.
pub fn memory_gb(raw: &str) -> Result<f64, QuantityError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }

    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value = parse_number(raw, digits)?;

    match unit {
        "" => Ok(0.0),
        "Ki" => Ok(value / 1_000_000.0),
        "Mi" => Ok(value / 1000.0),
        "Gi" => Ok(value),
        "Ti" => Ok(value * 1000.0),
        other => Err(QuantityError::UnsupportedUnit(other.to_string())),
    }
}

/// Parse a count quantity. The empty string is 0.
///
/// # Errors
///
/// Returns an error if the value is not a plain number.
pub fn count(raw: &str) -> Result<f64, QuantityError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    parse_number(raw, raw)
}

/// Normalize a quantity according to its quota key.
///
/// # Errors
///
/// Returns an error if the quantity cannot be normalized.
pub fn normalize(key: &str, raw: &str) -> Result<f64, QuantityError> {
    match ResourceKind::of(key) {
        ResourceKind::Cpu => cpu_cores(raw),
        ResourceKind::Memory => memory_gb(raw),
        ResourceKind::Count => count(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::float_cmp)]
    #[test]
    fn cpu_rounds_up_to_whole_cores() {
        assert_eq!(cpu_cores("500m").unwrap(), 1.0);
        assert_eq!(cpu_cores("1500m").unwrap(), 2.0);
        assert_eq!(cpu_cores("2").unwrap(), 2.0);
        assert_eq!(cpu_cores("0.5").unwrap(), 1.0);
        assert_eq!(cpu_cores("").unwrap(), 0.0);
        assert_eq!(cpu_cores("0").unwrap(), 0.0);
    }

    #[test]
    fn cpu_rejects_garbage() {
        assert!(matches!(
            cpu_cores("lots"),
            Err(QuantityError::InvalidNumber(_))
        ));
    }

    #[test]
    fn non_finite_numbers_are_invalid() {
        for raw in ["NaN", "inf", "infinity", "-inf"] {
            assert_eq!(count(raw), Err(QuantityError::InvalidNumber(raw.to_string())));
            assert!(matches!(cpu_cores(raw), Err(QuantityError::InvalidNumber(_))));
        }
    }

    #[test]
    fn memory_units() {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(memory_gb("512Mi").unwrap(), 0.512));
        assert!(close(memory_gb("1048576Ki").unwrap(), 1.048_576));
        assert!(close(memory_gb("2Gi").unwrap(), 2.0));
        assert!(close(memory_gb("1Ti").unwrap(), 1000.0));
        assert!(close(memory_gb("").unwrap(), 0.0));
        assert!(close(memory_gb("1073741824").unwrap(), 0.0));
    }

    #[test]
    fn memory_rejects_other_units() {
        assert_eq!(
            memory_gb("1G"),
            Err(QuantityError::UnsupportedUnit("G".to_string()))
        );
        assert_eq!(
            memory_gb("500M"),
            Err(QuantityError::UnsupportedUnit("M".to_string()))
        );
    }

    #[test]
    fn classifies_keys() {
        assert_eq!(ResourceKind::of("limits.cpu"), ResourceKind::Cpu);
        assert_eq!(ResourceKind::of("requests.memory"), ResourceKind::Memory);
        assert_eq!(ResourceKind::of("requests.storage"), ResourceKind::Memory);
        assert_eq!(
            ResourceKind::of("gold.storageclass.storage.k8s.io/requests.storage"),
            ResourceKind::Memory
        );
        assert_eq!(ResourceKind::of("pods"), ResourceKind::Count);
        assert_eq!(ResourceKind::of("count/deployments.apps"), ResourceKind::Count);
    }
}
