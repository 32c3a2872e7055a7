//! Data types and associated functions and methods

use crate::error::EvaluationError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;
use validator::Validate;

/// Which axes are averaged away to produce the reported shape.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReductionMode {
    /// Reduce over `time`, keep a `lat` x `lon` field
    Spatial,
    /// Reduce over `lat` and `lon`, keep a `time` series
    Temporal,
    /// Reduce over all axes, keep a scalar
    Overall,
}

impl ReductionMode {
    /// Parse a mode string, case-insensitively.
    pub fn parse(mode: &str) -> Result<Self, EvaluationError> {
        match mode.to_ascii_lowercase().as_str() {
            "spatial" => Ok(Self::Spatial),
            "temporal" => Ok(Self::Temporal),
            "overall" => Ok(Self::Overall),
            _ => Err(EvaluationError::UnknownMode {
                mode: mode.to_string(),
            }),
        }
    }

    /// The dimension names averaged away by this mode.
    pub fn reduced_dims(self) -> &'static [&'static str] {
        match self {
            Self::Spatial => &["time"],
            Self::Temporal => &["lat", "lon"],
            Self::Overall => &["time", "lat", "lon"],
        }
    }
}

/// Parameters of an evaluation request.
///
/// Assembled from multipart form fields rather than deserialised directly; the
/// uploaded payloads travel separately as files.
#[derive(Clone, Debug, PartialEq, Validate)]
pub struct EvaluateParams {
    /// Requested metric identifiers, matching [MetricRegistry](crate::metric::MetricRegistry) keys
    #[validate(length(min = 1, message = "metrics must not be empty"))]
    pub metrics: Vec<String>,
    /// Variable to compare. Defaults to the first declared data variable.
    pub variable: Option<String>,
    /// Reduction mode
    pub mode: ReductionMode,
}

/// Reduced values of one successfully computed metric.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricValue {
    /// NaN-excluding mean of the reduced values, rounded to 4 decimal places
    pub summary: f64,
    /// Dimension names kept by the reduction
    pub dims: Vec<String>,
    /// Shape of the reduced values. Empty for a scalar.
    pub shape: Vec<usize>,
    /// Reduced values, flattened in row-major order
    pub values: Vec<f64>,
    /// URL path of the rendered artifact, when one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

/// Outcome of one requested metric.
///
/// Every requested identifier appears in the response with one of these
/// markers, so callers can tell "not computed" apart from "zero error".
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricOutcome {
    /// The metric was computed
    Ok(MetricValue),
    /// The metric is not present in the registry
    NotImplemented,
    /// The metric failed to compute; other metrics are unaffected
    Error { message: String },
}

/// Aligned coordinate vectors keying the reduced fields and series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Coords {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub time: Vec<f64>,
}

/// Response to an evaluation request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluateResponse {
    /// The mode the reduction ran in
    pub mode: ReductionMode,
    /// The variable that was compared
    pub variable: String,
    /// Outcome per requested metric identifier
    pub results: BTreeMap<String, MetricOutcome>,
    /// Coordinates of the aligned grid
    pub coords: Coords,
}

/// Response to a variable discovery request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariablesResponse {
    /// Data variable names in payload declaration order
    pub variables: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_tokens, Token};

    #[test]
    fn mode_serde_round_trip() {
        assert_tokens(
            &ReductionMode::Spatial,
            &[Token::UnitVariant {
                name: "ReductionMode",
                variant: "spatial",
            }],
        );
        assert_tokens(
            &ReductionMode::Overall,
            &[Token::UnitVariant {
                name: "ReductionMode",
                variant: "overall",
            }],
        );
    }

    #[test]
    fn mode_parse_case_insensitive() {
        assert_eq!(ReductionMode::Spatial, ReductionMode::parse("Spatial").unwrap());
        assert_eq!(ReductionMode::Temporal, ReductionMode::parse("TEMPORAL").unwrap());
        assert_eq!(ReductionMode::Overall, ReductionMode::parse("overall").unwrap());
    }

    #[test]
    fn mode_parse_unknown() {
        match ReductionMode::parse("diagonal").unwrap_err() {
            EvaluationError::UnknownMode { mode } => assert_eq!("diagonal", mode),
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn mode_display() {
        assert_eq!("temporal", ReductionMode::Temporal.to_string());
    }

    #[test]
    fn params_empty_metrics_invalid() {
        let params = EvaluateParams {
            metrics: vec![],
            variable: None,
            mode: ReductionMode::Overall,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn params_valid() {
        let params = EvaluateParams {
            metrics: vec!["Mean Absolute Error (MAE)".to_string()],
            variable: Some("temp".to_string()),
            mode: ReductionMode::Spatial,
        };
        params.validate().unwrap();
    }

    #[test]
    fn outcome_serialises_tagged() {
        let outcome = MetricOutcome::NotImplemented;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(serde_json::json!({"status": "not_implemented"}), json);

        let outcome = MetricOutcome::Error {
            message: "boom".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            serde_json::json!({"status": "error", "message": "boom"}),
            json
        );
    }

    #[test]
    fn metric_value_nan_serialises_as_null() {
        let value = MetricValue {
            summary: 1.5,
            dims: vec!["time".to_string()],
            shape: vec![2],
            values: vec![f64::NAN, 1.5],
            artifact: None,
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(serde_json::Value::Null, json["values"][0]);
        assert_eq!(serde_json::json!(1.5), json["values"][1]);
        // artifact is omitted entirely when absent
        assert!(json.get("artifact").is_none());
    }
}
