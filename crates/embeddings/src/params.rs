//! Typed embedding request parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Voyage AI embedding models accepted by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum VoyageModel {
    #[serde(rename = "voyage-3.5")]
    Voyage35,
    #[serde(rename = "voyage-3.5-lite")]
    Voyage35Lite,
    #[serde(rename = "voyage-3-large")]
    Voyage3Large,
    #[serde(rename = "voyage-code-3")]
    VoyageCode3,
    #[serde(rename = "voyage-finance-2")]
    VoyageFinance2,
    #[serde(rename = "voyage-law-2")]
    VoyageLaw2,
}

impl VoyageModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Voyage35 => "voyage-3.5",
            Self::Voyage35Lite => "voyage-3.5-lite",
            Self::Voyage3Large => "voyage-3-large",
            Self::VoyageCode3 => "voyage-code-3",
            Self::VoyageFinance2 => "voyage-finance-2",
            Self::VoyageLaw2 => "voyage-law-2",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputDtype {
    #[default]
    Float,
    Int8,
    Uint8,
    Binary,
    Ubinary,
}

/// Whether the raw text is stored content or a search query. The service
/// embeds the two asymmetrically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Document,
    Query,
}

fn default_output_dimension() -> u32 {
    1024
}

/// Parameters of one embedding-generation request.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingParameters {
    /// Embedding model to use.
    pub model: VoyageModel,
    /// Output vector dimensionality (256, 512, 1024, 2048 or 4096).
    #[serde(default = "default_output_dimension")]
    pub output_dimension: u32,
    /// Output element type.
    #[serde(default)]
    pub output_dtype: OutputDtype,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_round_trip() {
        let json = serde_json::to_string(&VoyageModel::Voyage35Lite).expect("serialize");
        assert_eq!(json, "\"voyage-3.5-lite\"");
        let parsed: VoyageModel = serde_json::from_str("\"voyage-code-3\"").expect("parse");
        assert_eq!(parsed, VoyageModel::VoyageCode3);
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let params: EmbeddingParameters =
            serde_json::from_str(r#"{"model":"voyage-3.5-lite"}"#).expect("parse");
        assert_eq!(params.output_dimension, 1024);
        assert_eq!(params.output_dtype, OutputDtype::Float);
    }
}
