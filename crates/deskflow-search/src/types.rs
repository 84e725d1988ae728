use serde::{Deserialize, Serialize};

/// A knowledge document returned by the index.
///
/// Produced fresh per search call and never mutated afterwards. Missing
/// scores are treated as zero when the capability layer applies thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub reranker_score: Option<f32>,
}

impl RetrievedDocument {
    pub fn relevance(&self) -> f32 {
        self.score.unwrap_or(0.0)
    }

    pub fn reranker(&self) -> f32 {
        self.reranker_score.unwrap_or(0.0)
    }
}

/// Marker character delimiting the fill-in fields inside a template's
/// `detailed_description`. The assistant replaces the delimited fields with
/// user-supplied facts without touching the surrounding scaffolding.
pub const FIELD_MARKER: char = '#';

/// A ticket template returned by the template index.
///
/// Read-only reference data: the category tiers, priority, urgency and
/// assignment routing come straight from the index and are never rewritten
/// on this side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketTemplate {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category_tier_1: Option<String>,
    #[serde(default)]
    pub category_tier_2: Option<String>,
    #[serde(default)]
    pub category_tier_3: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Long-form description containing `#`-delimited fields to fill.
    #[serde(default)]
    pub detailed_description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub assigned_group: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub reranker_score: Option<f32>,
}

impl TicketTemplate {
    pub fn relevance(&self) -> f32 {
        self.score.unwrap_or(0.0)
    }

    pub fn reranker(&self) -> f32 {
        self.reranker_score.unwrap_or(0.0)
    }

    /// Names of the fill-in fields in `detailed_description`, in order of
    /// appearance. A field is the text between a pair of marker characters.
    pub fn placeholder_fields(&self) -> Vec<String> {
        let Some(text) = self.detailed_description.as_deref() else {
            return Vec::new();
        };
        let mut fields = Vec::new();
        let mut segments = text.split(FIELD_MARKER);
        // Text before the first marker is scaffolding; after that, every
        // other segment is a field name.
        segments.next();
        while let Some(field) = segments.next() {
            fields.push(field.to_string());
            if segments.next().is_none() {
                break;
            }
        }
        fields
    }
}
