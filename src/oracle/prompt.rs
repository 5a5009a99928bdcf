//! Oracle request construction.
//!
//! A request is an ordered list of text and image parts. With reference
//! images the oracle sees the few-shot instruction, each labeled example, and
//! then the query image. Without them it gets the zero-shot instruction and
//! the query image alone.

use serde::Serialize;

use crate::oracle::models::SelectedModel;
use crate::oracle::references::ReferenceSet;

/// Sampling temperature for every classification call.
///
/// Pinned to zero so identical inputs give reproducible answers.
pub const CLASSIFICATION_TEMPERATURE: f32 = 0.0;

/// Instruction used when labeled reference images accompany the query.
pub const FEW_SHOT_PROMPT: &str = r#"You are a gate status classifier. Your task is to determine if a gate is OPEN or CLOSED by comparing the query image against the reference examples provided.

INSTRUCTIONS:
- Compare the query image carefully against the labeled reference images
- CLOSED: The gate is upright and aligned with the fence/wall, bars are vertical
- OPEN: The gate is rotated/swung inward, creating an angle or gap
- If unsure, respond UNKNOWN with low confidence

Respond ONLY with valid JSON (no markdown, no extra text):
{"status": "OPEN", "confidence": 85}
{"status": "CLOSED", "confidence": 95}
{"status": "UNKNOWN", "confidence": 30}"#;

/// Instruction used when no reference images are available.
pub const ZERO_SHOT_PROMPT: &str = r#"You are a gate status classifier analyzing a cropped image of a metal bar gate.

INSTRUCTIONS:
- CLOSED: The gate is upright, vertical bars aligned with the fence/wall
- OPEN: The gate is rotated/swung inward, creating an angle or visible gap
- If unsure, respond UNKNOWN with low confidence

Respond ONLY with valid JSON (no markdown, no extra text):
{"status": "OPEN", "confidence": 85}
{"status": "CLOSED", "confidence": 95}
{"status": "UNKNOWN", "confidence": 30}"#;

/// Text placed between the last reference image and the query image.
pub const QUERY_LEAD_IN: &str = "Now classify this image:";

/// MIME type of camera frames and reference images.
pub const JPEG_MIME: &str = "image/jpeg";

/// One part of a multimodal oracle request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestPart {
    Text { text: String },
    Image {
        mime_type: String,
        #[serde(skip)]
        data: Vec<u8>,
        /// Byte length, kept for logging and serialized views.
        bytes: usize,
    },
}

impl RequestPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn jpeg(data: &[u8]) -> Self {
        Self::Image {
            mime_type: JPEG_MIME.to_string(),
            bytes: data.len(),
            data: data.to_vec(),
        }
    }
}

/// A complete classification request handed to the oracle transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub model: String,
    pub temperature: f32,
    pub parts: Vec<RequestPart>,
}

impl OracleRequest {
    /// Build the classification request for one query image.
    pub fn classification(
        model: &SelectedModel,
        image: &[u8],
        references: &ReferenceSet,
    ) -> Self {
        let mut parts = Vec::with_capacity(2 + references.len() * 2);

        if references.is_empty() {
            parts.push(RequestPart::text(ZERO_SHOT_PROMPT));
        } else {
            parts.push(RequestPart::text(FEW_SHOT_PROMPT));
            for reference in references.iter() {
                parts.push(RequestPart::text(reference.label.as_str()));
                parts.push(RequestPart::jpeg(&reference.data));
            }
            parts.push(RequestPart::text(QUERY_LEAD_IN));
        }

        parts.push(RequestPart::jpeg(image));

        Self {
            model: model.as_str().to_string(),
            temperature: CLASSIFICATION_TEMPERATURE,
            parts,
        }
    }

    /// Number of image parts in the request.
    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, RequestPart::Image { .. }))
            .count()
    }

    /// The query image is always the last part.
    pub fn query_image(&self) -> Option<&[u8]> {
        match self.parts.last() {
            Some(RequestPart::Image { data, .. }) => Some(data.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::references::ReferenceImage;

    fn model() -> SelectedModel {
        SelectedModel::new("gemini-2.5-flash")
    }

    #[test]
    fn test_zero_shot_request() {
        let request = OracleRequest::classification(&model(), b"query", &ReferenceSet::empty());

        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.parts.len(), 2);
        assert_eq!(request.parts[0], RequestPart::text(ZERO_SHOT_PROMPT));
        assert_eq!(request.query_image(), Some(&b"query"[..]));
    }

    #[test]
    fn test_few_shot_request_interleaves_labels() {
        let references = ReferenceSet::from_images(vec![
            ReferenceImage::new("closed_day.jpg", "Example - CLOSED gate (daytime):", b"c".to_vec()),
            ReferenceImage::new("open_day.jpg", "Example - OPEN gate (daytime):", b"o".to_vec()),
        ]);
        let request = OracleRequest::classification(&model(), b"query", &references);

        assert_eq!(request.parts[0], RequestPart::text(FEW_SHOT_PROMPT));
        assert_eq!(
            request.parts[1],
            RequestPart::text("Example - CLOSED gate (daytime):")
        );
        assert_eq!(request.parts[2], RequestPart::jpeg(b"c"));
        assert_eq!(request.parts[5], RequestPart::text(QUERY_LEAD_IN));
        assert_eq!(request.image_count(), 3);
        assert_eq!(request.query_image(), Some(&b"query"[..]));
    }

    #[test]
    fn test_serialized_request_omits_image_bytes() {
        let request = OracleRequest::classification(&model(), b"abcd", &ReferenceSet::empty());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["parts"][1]["type"], "image");
        assert_eq!(json["parts"][1]["bytes"], 4);
        assert!(json["parts"][1].get("data").is_none());
    }
}
