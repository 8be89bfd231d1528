use async_trait::async_trait;

use crate::error::Result;

/// Seam to the text-completion provider.
///
/// `json_mode` asks the provider to constrain output to a single JSON object;
/// implementations that cannot honor it still return whatever text the model
/// produced and leave strict parsing to the caller.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, system: &str, user: &str, json_mode: bool) -> Result<String>;
}
