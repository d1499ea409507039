//! JSON bodies exchanged over the REST API.
//!
use std::{collections::BTreeMap, fmt};

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

/// Severity of a disease class.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    None,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::None => "NONE",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::High => "🔴",
            Severity::Medium => "🟠",
            Severity::None => "✅",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing one disease class.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DiseaseDetails {
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub description: String,
    pub causes: String,
    pub treatment: Vec<String>,
    pub prevention: String,
}

/// Score of a single class, in percent.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassScore {
    pub name: String,
    pub percent: f32,
}

/// All class scores, most likely first.
///
/// Serialized as a JSON object whose keys keep the ranking order, so that
/// clients reading the body top-down see the best match first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedPredictions(pub Vec<ClassScore>);

impl RankedPredictions {
    pub fn iter(&self) -> impl Iterator<Item = &ClassScore> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Restore descending order, e.g. after a round trip through a map type that sorts keys.
    pub fn sort_descending(&mut self) {
        self.0.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    }
}

impl Serialize for RankedPredictions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for score in self.0.iter() {
            map.serialize_entry(&score.name, &score.percent)?;
        }
        map.end()
    }
}

struct RankedVisitor;

impl<'de> Visitor<'de> for RankedVisitor {
    type Value = RankedPredictions;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of class names to percentages")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut scores = Vec::with_capacity(access.size_hint().unwrap_or(8));
        while let Some((name, percent)) = access.next_entry::<String, f32>()? {
            scores.push(ClassScore { name, percent });
        }
        Ok(RankedPredictions(scores))
    }
}

impl<'de> Deserialize<'de> for RankedPredictions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RankedVisitor)
    }
}

/// Body of a successful `POST /predict`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub predicted_disease: String,
    /// Confidence of the top class in percent, rounded to two decimals.
    pub confidence: f32,
    pub icon: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub causes: String,
    pub treatment: Vec<String>,
    pub prevention: String,
    pub all_predictions: RankedPredictions,
    pub model_version: String,
    pub model_accuracy: String,
}

/// Model availability as reported by `GET /health`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    ModelLoading,
    ModelFailed,
}

/// Body of `GET /health`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub model_loaded: bool,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /info/:disease`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DiseaseInfoResponse {
    pub disease: String,
    #[serde(flatten)]
    pub details: DiseaseDetails,
}

/// Body of `GET /diseases`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DiseaseListResponse {
    pub count: usize,
    pub diseases: Vec<String>,
    pub details: BTreeMap<String, DiseaseDetails>,
}

/// Body of `GET /`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ApiIndex {
    pub project: String,
    pub version: String,
    pub accuracy: String,
    pub endpoints: BTreeMap<String, String>,
    pub usage: BTreeMap<String, String>,
    pub supported_diseases: Vec<String>,
}

/// Body of every error response.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::Error;

    fn scores() -> RankedPredictions {
        RankedPredictions(vec![
            ClassScore {
                name: "Sooty Mould".into(),
                percent: 90.0,
            },
            ClassScore {
                name: "Anthracnose".into(),
                percent: 7.5,
            },
            ClassScore {
                name: "Healthy".into(),
                percent: 2.5,
            },
        ])
    }

    #[test]
    fn test_ranked_predictions_keep_order_in_json() -> Result<(), Error> {
        let json = serde_json::to_string(&scores())?;
        assert_eq!(
            json,
            r#"{"Sooty Mould":90.0,"Anthracnose":7.5,"Healthy":2.5}"#
        );

        let parsed: RankedPredictions = serde_json::from_str(&json)?;
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.0[0].name, "Sooty Mould");

        Ok(())
    }

    #[test]
    fn test_sort_descending_after_key_sorted_map() -> Result<(), Error> {
        let value: serde_json::Value = serde_json::to_value(scores())?;
        let mut parsed: RankedPredictions = serde_json::from_value(value)?;
        parsed.sort_descending();
        let names: Vec<_> = parsed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sooty Mould", "Anthracnose", "Healthy"]);

        Ok(())
    }

    #[test]
    fn test_wire_names() -> Result<(), Error> {
        let health = HealthResponse {
            status: HealthStatus::ModelLoading,
            model_loaded: false,
            timestamp: "unknown".into(),
            error: None,
        };
        let json = serde_json::to_value(&health)?;
        assert_eq!(json["status"], "model_loading");
        assert!(json.get("error").is_none());

        let info = DiseaseInfoResponse {
            disease: "Die Back".into(),
            details: DiseaseDetails {
                icon: "🔴".into(),
                kind: "Physiological Disease".into(),
                severity: Severity::High,
                description: "d".into(),
                causes: "c".into(),
                treatment: vec!["t".into()],
                prevention: "p".into(),
            },
        };
        let json = serde_json::to_value(&info)?;
        assert_eq!(json["disease"], "Die Back");
        assert_eq!(json["type"], "Physiological Disease");
        assert_eq!(json["severity"], "HIGH");

        Ok(())
    }
}
