//! The recognition pipeline: image in, deduplicated priced items out.

use std::sync::OnceLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use snapcart_catalog::CatalogStore;

use crate::api::{ContentBlock, VisionModel};
use crate::error::RecognitionError;

/// Instruction prompt for both steps of the round trip.
const SYSTEM_PROMPT: &str = r#"You are a smart cashier vision system for a retail store.

Your task:
1. Carefully examine the photo - it shows products placed on a table or surface
2. Identify ALL visible product names, brands, and types
3. Call the search_products tool ONCE with all product names you identified
4. After receiving search results, return a JSON response

Response format (after the tool call):
{
  "recognized_items": [
    {
      "product_id": 1,
      "name": "Coca-Cola 1L",
      "price": 450.00,
      "quantity": 1,
      "confidence": 0.95
    }
  ],
  "unrecognized": ["item name if not found in the catalog"],
  "total": 450.00
}

Rules:
- If multiple identical items are visible, set quantity > 1
- confidence: 0.0-1.0 based on how clearly you see the product
- Use ONLY product_id, name and price values from the search results
- Always respond with ONLY the JSON object above after the tool call, no prose"#;

/// The single declared tool. The model is required to invoke it.
fn search_tool() -> serde_json::Value {
    serde_json::json!({
        "name": "search_products",
        "description": "Search for products in the store catalog. \
                        Call this once with ALL product names you see in the image.",
        "input_schema": {
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of product names/brands visible in the photo, \
                                    e.g. ['Coca-Cola', 'Lays chips', 'Milka chocolate']"
                }
            },
            "required": ["queries"]
        }
    })
}

/// Schema the model's final answer must conform to. Validated before any
/// field is trusted.
fn response_schema() -> &'static jsonschema::Validator {
    static VALIDATOR: OnceLock<jsonschema::Validator> = OnceLock::new();
    VALIDATOR.get_or_init(|| {
        let schema = serde_json::json!({
            "type": "object",
            "required": ["recognized_items", "unrecognized", "total"],
            "properties": {
                "recognized_items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["product_id", "name", "price", "quantity", "confidence"],
                        "properties": {
                            "product_id": {"type": "integer"},
                            "name": {"type": "string"},
                            "price": {"type": ["number", "string"]},
                            "quantity": {"type": "integer", "minimum": 1},
                            "confidence": {"type": "number", "minimum": 0.0, "maximum": 1.0}
                        }
                    }
                },
                "unrecognized": {"type": "array", "items": {"type": "string"}},
                "total": {"type": ["number", "string"]}
            }
        });
        // Static schema, compilation failure is a programming error.
        jsonschema::validator_for(&schema).expect("response schema compiles")
    })
}

/// One recognized catalog product in the photo. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedItem {
    pub product_id: i64,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub confidence: f64,
}

/// Result of one recognition call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeResult {
    pub recognized_items: Vec<RecognizedItem>,
    /// Names the model saw but the catalog does not carry.
    pub unrecognized: Vec<String>,
    pub total: Decimal,
}

/// Orchestrates the two-step model round trip around one catalog search.
pub struct RecognitionPipeline<V, C> {
    vision: V,
    catalog: C,
}

impl<V: VisionModel, C: CatalogStore> RecognitionPipeline<V, C> {
    pub fn new(vision: V, catalog: C) -> Self {
        RecognitionPipeline { vision, catalog }
    }

    /// Full cycle: image → tool call → catalog search → final summary.
    pub async fn recognize(
        &self,
        image_base64: &str,
        media_type: &str,
    ) -> Result<RecognizeResult, RecognitionError> {
        let tool = search_tool();
        let user_content = vec![
            ContentBlock::base64_image(media_type, image_base64),
            ContentBlock::text(
                "Please identify all products in this photo and search for them in the catalog.",
            ),
        ];

        // Step 1: the model must invoke search_products.
        let turn = self
            .vision
            .request_tool_call(SYSTEM_PROMPT, user_content, &tool)
            .await?;

        let queries = extract_queries(&turn.tool_input)?;

        // Step 2: one search call for the whole list, so dedup is global.
        let products = self.catalog.search(&queries).await?;
        let tool_result_json = serde_json::to_string(&products)
            .map_err(|e| RecognitionError::MalformedOutput(e.to_string()))?;

        // Step 3: the model folds the search results into the final answer.
        let raw = self
            .vision
            .request_summary(SYSTEM_PROMPT, &tool, turn, tool_result_json)
            .await?;

        parse_summary(&raw)
    }
}

/// Extract the `queries` argument from the tool invocation.
fn extract_queries(tool_input: &serde_json::Value) -> Result<Vec<String>, RecognitionError> {
    let raw = tool_input
        .get("queries")
        .and_then(|q| q.as_array())
        .ok_or_else(|| {
            RecognitionError::ProtocolViolation(
                "tool invocation missing 'queries' array".to_string(),
            )
        })?;
    Ok(raw
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect())
}

/// Validate and deserialize the model's final answer.
///
/// The model's `total` is not trusted: it is recomputed as the sum of
/// price × quantity over recognized items, and the recomputed value wins
/// on disagreement.
fn parse_summary(raw: &str) -> Result<RecognizeResult, RecognitionError> {
    let json_str = strip_code_fences(raw.trim());
    let value: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
        RecognitionError::MalformedOutput(format!(
            "final response is not JSON: {} (response was: {})",
            e,
            truncate(raw, 200)
        ))
    })?;

    if let Err(error) = response_schema().validate(&value) {
        return Err(RecognitionError::MalformedOutput(format!(
            "final response violates the response schema: {}",
            error
        )));
    }

    let mut result: RecognizeResult = serde_json::from_value(value)
        .map_err(|e| RecognitionError::MalformedOutput(e.to_string()))?;

    let recomputed: Decimal = result
        .recognized_items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum();
    if recomputed != result.total {
        eprintln!(
            "recognition total mismatch: model said {}, line items sum to {}; using the sum",
            result.total, recomputed
        );
        result.total = recomputed;
    }

    Ok(result)
}

/// Strip markdown code fences (```json ... ```) from the response.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with("```") {
        let after_open = match text.find('\n') {
            Some(nl) => &text[nl + 1..],
            None => return text,
        };
        if let Some(close) = after_open.rfind("```") {
            return after_open[..close].trim();
        }
        return after_open.trim();
    }
    text
}

/// Truncate to at most `max` bytes, backing off to a char boundary so
/// multibyte text (Cyrillic catalog names, for one) cannot split.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ToolCallTurn;
    use async_trait::async_trait;
    use snapcart_catalog::{MemoryCatalog, NewProduct};
    use std::sync::Mutex;

    /// Scripted model: fixed tool input for step 1, fixed text for step 2.
    /// Captures the tool result fed back so tests can inspect it.
    struct ScriptedVision {
        tool_input: serde_json::Value,
        summary: String,
        seen_tool_result: Mutex<Option<String>>,
    }

    impl ScriptedVision {
        fn new(tool_input: serde_json::Value, summary: &str) -> Self {
            ScriptedVision {
                tool_input,
                summary: summary.to_string(),
                seen_tool_result: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl VisionModel for ScriptedVision {
        async fn request_tool_call(
            &self,
            _system: &str,
            user_content: Vec<ContentBlock>,
            _tool: &serde_json::Value,
        ) -> Result<ToolCallTurn, RecognitionError> {
            Ok(ToolCallTurn {
                tool_use_id: "tu_1".to_string(),
                tool_input: self.tool_input.clone(),
                user_content,
                assistant_content: vec![],
            })
        }

        async fn request_summary(
            &self,
            _system: &str,
            _tool: &serde_json::Value,
            _turn: ToolCallTurn,
            tool_result_json: String,
        ) -> Result<String, RecognitionError> {
            *self.seen_tool_result.lock().unwrap() = Some(tool_result_json);
            Ok(self.summary.clone())
        }
    }

    async fn seeded_catalog() -> MemoryCatalog {
        let catalog = MemoryCatalog::new();
        catalog
            .create(NewProduct {
                name: "Sprite 0.5L".to_string(),
                category: Some("Drinks".to_string()),
                description: Some("Sprite soda 500 ml".to_string()),
                price: Decimal::from(320),
                image_url: None,
                barcode: Some("5449000014238".to_string()),
                in_stock: true,
            })
            .await
            .unwrap();
        catalog
    }

    #[tokio::test]
    async fn happy_path_returns_recognized_items() {
        let vision = ScriptedVision::new(
            serde_json::json!({"queries": ["Sprite"]}),
            r#"{"recognized_items": [{"product_id": 1, "name": "Sprite 0.5L",
                "price": 320, "quantity": 1, "confidence": 0.95}],
                "unrecognized": [], "total": 320}"#,
        );
        let pipeline = RecognitionPipeline::new(vision, seeded_catalog().await);

        let result = pipeline.recognize("aW1n", "image/jpeg").await.unwrap();
        assert_eq!(result.recognized_items.len(), 1);
        assert_eq!(result.recognized_items[0].product_id, 1);
        assert_eq!(result.total, Decimal::from(320));

        // The catalog hit was fed back to the model as the tool result.
        let seen = pipeline
            .vision
            .seen_tool_result
            .lock()
            .unwrap()
            .clone()
            .unwrap();
        assert!(seen.contains("Sprite 0.5L"));
    }

    #[tokio::test]
    async fn missing_queries_is_a_protocol_violation() {
        let vision = ScriptedVision::new(
            serde_json::json!({"items": "wrong shape"}),
            r#"{"recognized_items": [], "unrecognized": [], "total": 0}"#,
        );
        let pipeline = RecognitionPipeline::new(vision, seeded_catalog().await);
        let err = pipeline.recognize("aW1n", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, RecognitionError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn non_json_summary_is_malformed_output() {
        let vision = ScriptedVision::new(
            serde_json::json!({"queries": ["Sprite"]}),
            "I see a bottle of Sprite on the table.",
        );
        let pipeline = RecognitionPipeline::new(vision, seeded_catalog().await);
        let err = pipeline.recognize("aW1n", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, RecognitionError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn schema_violation_is_rejected_before_parsing() {
        // confidence out of range
        let vision = ScriptedVision::new(
            serde_json::json!({"queries": ["Sprite"]}),
            r#"{"recognized_items": [{"product_id": 1, "name": "Sprite 0.5L",
                "price": 320, "quantity": 1, "confidence": 1.5}],
                "unrecognized": [], "total": 320}"#,
        );
        let pipeline = RecognitionPipeline::new(vision, seeded_catalog().await);
        let err = pipeline.recognize("aW1n", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, RecognitionError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn model_total_is_recomputed_from_line_items() {
        let vision = ScriptedVision::new(
            serde_json::json!({"queries": ["Sprite"]}),
            r#"{"recognized_items": [{"product_id": 1, "name": "Sprite 0.5L",
                "price": 320, "quantity": 2, "confidence": 0.9}],
                "unrecognized": [], "total": 9999}"#,
        );
        let pipeline = RecognitionPipeline::new(vision, seeded_catalog().await);
        let result = pipeline.recognize("aW1n", "image/jpeg").await.unwrap();
        assert_eq!(result.total, Decimal::from(640));
    }

    #[tokio::test]
    async fn unrecognized_names_pass_through() {
        let vision = ScriptedVision::new(
            serde_json::json!({"queries": ["Sprite", "mystery snack"]}),
            r#"{"recognized_items": [], "unrecognized": ["mystery snack"], "total": 0}"#,
        );
        let pipeline = RecognitionPipeline::new(vision, seeded_catalog().await);
        let result = pipeline.recognize("aW1n", "image/jpeg").await.unwrap();
        assert_eq!(result.unrecognized, vec!["mystery snack".to_string()]);
        assert_eq!(result.total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn fenced_summary_is_accepted() {
        let vision = ScriptedVision::new(
            serde_json::json!({"queries": ["Sprite"]}),
            "```json\n{\"recognized_items\": [], \"unrecognized\": [], \"total\": 0}\n```",
        );
        let pipeline = RecognitionPipeline::new(vision, seeded_catalog().await);
        assert!(pipeline.recognize("aW1n", "image/jpeg").await.is_ok());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let mut reply = "a".repeat(199);
        reply.push_str("йцукен");
        // Byte 200 falls inside 'й'; the cut must back off, not panic.
        let cut = truncate(&reply, 200);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
    }

    #[test]
    fn multibyte_non_json_reply_is_malformed_output_not_a_panic() {
        let mut reply = "a".repeat(199);
        reply.push_str("й вижу бутылку Спрайта на столе");
        let err = parse_summary(&reply).unwrap_err();
        assert!(matches!(err, RecognitionError::MalformedOutput(_)));
    }

    #[test]
    fn strip_code_fences_variants() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn response_schema_compiles() {
        let _ = response_schema();
    }
}
