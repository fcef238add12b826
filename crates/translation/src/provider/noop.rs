use async_trait::async_trait;

use crate::{Result, Translator};

/// Pass-through translator for transcripts already in the target language
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_owned())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
