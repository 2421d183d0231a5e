pub mod openai;
pub mod types;

use crate::error::TransformError;
use async_trait::async_trait;
use types::GenerationRequest;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, TransformError>;
}
