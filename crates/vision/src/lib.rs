//! Product recognition for the Snapcart backend.
//!
//! One recognition call is a two-step round trip with a vision-language
//! model, with a catalog search sandwiched in between:
//!
//! 1. The image goes to the model with a single declared tool,
//!    `search_products(queries)`, and the tool choice forced. A response
//!    without the tool invocation is a protocol violation, never an empty
//!    result.
//! 2. The extracted queries are searched against the catalog in ONE call,
//!    so cross-query dedup applies globally.
//! 3. The search results go back as the tool result, and the model's final
//!    answer must be a JSON object matching a fixed schema, validated
//!    before any field is trusted.
//!
//! [`VisionModel`] is the seam; [`AnthropicVision`] is the Messages API
//! implementation; [`RecognitionPipeline`] owns the orchestration.

mod api;
mod error;
mod pipeline;

pub use api::{AnthropicVision, ContentBlock, ToolCallTurn, VisionModel};
pub use error::RecognitionError;
pub use pipeline::{RecognitionPipeline, RecognizeResult, RecognizedItem};
