use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Classifier-derived buying-intent label.
///
/// Anything the classifier returns that is not a recognized label degrades to
/// `None` during deserialization, so a misbehaving classifier can never break
/// the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentLabel {
    Buy,
    #[serde(other)]
    None,
}

/// Result of one intent classification call. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    #[serde(default = "default_label")]
    pub label: IntentLabel,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub quantity: Option<u32>,
}

fn default_label() -> IntentLabel {
    IntentLabel::None
}

impl IntentResult {
    /// Safe default used whenever the classifier fails, times out, or returns
    /// a malformed payload.
    pub fn none() -> Self {
        Self {
            label: IntentLabel::None,
            confidence: 0.0,
            quantity: None,
        }
    }

    /// Ordered quantity, defaulting to a single unit when the classifier
    /// omitted it or returned zero.
    pub fn quantity_or_default(&self) -> u32 {
        match self.quantity {
            Some(q) if q >= 1 => q,
            _ => 1,
        }
    }
}

/// Result of one visual-match call. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualMatch {
    #[serde(default)]
    pub item_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub confidence: f64,
}

impl VisualMatch {
    pub fn none() -> Self {
        Self {
            item_id: None,
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_label_degrades_to_none() {
        let result: IntentResult =
            serde_json::from_str(r#"{"label":"greeting","confidence":0.9}"#).unwrap();
        assert_eq!(result.label, IntentLabel::None);
    }

    #[test]
    fn test_buy_label_parses() {
        let result: IntentResult =
            serde_json::from_str(r#"{"label":"buy","confidence":0.9,"quantity":2}"#).unwrap();
        assert_eq!(result.label, IntentLabel::Buy);
        assert_eq!(result.quantity_or_default(), 2);
    }

    #[test]
    fn test_missing_fields_default() {
        let result: IntentResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result.label, IntentLabel::None);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.quantity_or_default(), 1);
    }

    #[test]
    fn test_zero_quantity_defaults_to_one() {
        let result: IntentResult =
            serde_json::from_str(r#"{"label":"buy","confidence":0.8,"quantity":0}"#).unwrap();
        assert_eq!(result.quantity_or_default(), 1);
    }
}
