//! Generative model trait used by the answer assembler.

use async_trait::async_trait;

use crate::error::Result;

/// An opaque text generator: a prompt in, plain text out.
///
/// Output is treated as unstructured natural language; callers neither parse
/// nor retry it.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model name used in logs and errors.
    fn name(&self) -> &str;
}
