use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::Domain;

/// Structured result of a completed classification job.
///
/// The backend payload is loosely typed and its field set varies by domain,
/// so the result is a variant keyed by [`Domain`]. The variant is always
/// chosen from the domain the *user* selected, never from anything the
/// server echoes back, to avoid acting on stale state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "lowercase")]
pub enum ClassificationResult {
    Plant {
        disease_detected: bool,
        disease_name: String,
        confidence: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        severity: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        affected_area: Option<f64>,
        #[serde(default)]
        recommendations: Vec<String>,
    },
    Livestock {
        disease_detected: bool,
        disease_name: String,
        confidence: f64,
        #[serde(default)]
        recommendations: Vec<String>,
    },
    Fish {
        disease_detected: bool,
        disease_name: String,
        confidence: f64,
        #[serde(default)]
        recommendations: Vec<String>,
    },
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

impl ClassificationResult {
    /// Fold the server's dynamic `classification` payload into the variant
    /// for `domain`. Missing fields degrade to neutral defaults rather than
    /// failing the whole exchange.
    pub fn from_wire(domain: Domain, value: &Value) -> Self {
        let disease_detected = value
            .get("diseaseDetected")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let disease_name = str_field(value, "diseaseName").unwrap_or_default();
        let confidence = value
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let recommendations = value
            .get("recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        match domain {
            Domain::Plant => ClassificationResult::Plant {
                disease_detected,
                disease_name,
                confidence,
                severity: str_field(value, "severity"),
                affected_area: value.get("affectedArea").and_then(Value::as_f64),
                recommendations,
            },
            Domain::Livestock => ClassificationResult::Livestock {
                disease_detected,
                disease_name,
                confidence,
                recommendations,
            },
            Domain::Fish => ClassificationResult::Fish {
                disease_detected,
                disease_name,
                confidence,
                recommendations,
            },
        }
    }

    pub fn disease_name(&self) -> &str {
        match self {
            ClassificationResult::Plant { disease_name, .. }
            | ClassificationResult::Livestock { disease_name, .. }
            | ClassificationResult::Fish { disease_name, .. } => disease_name,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            ClassificationResult::Plant { confidence, .. }
            | ClassificationResult::Livestock { confidence, .. }
            | ClassificationResult::Fish { confidence, .. } => *confidence,
        }
    }
}
