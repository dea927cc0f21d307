//! Grounded prompt assembly and answer generation.

use std::sync::Arc;

use tracing::{error, info};

use crate::document::{Answer, RetrievalContext};
use crate::error::Result;
use crate::generation::GenerativeModel;

/// Default persona placed at the top of every prompt.
pub const DEFAULT_PERSONA: &str = "You are a friendly and knowledgeable documentation assistant. \
You help users understand the product by answering their questions about its documentation.";

/// Rules constraining the model to the retrieved passages.
pub const GROUNDING_DIRECTIVE: &str = "Answer the user's question using ONLY the information in \
the CONTEXT section below. Rephrase the information in your own words instead of copying it \
verbatim. Do not include raw artifacts such as HTML tags, markup, navigation text or passage \
separators in your answer. When the context states a menu path, UI location or keyboard \
shortcut, write it in **bold**. If the context does not contain the answer, say that the \
question cannot be answered from the documentation.";

/// Builds the grounding prompt and asks the generative model for an answer.
pub struct AnswerAssembler {
    model: Arc<dyn GenerativeModel>,
    persona: String,
}

impl AnswerAssembler {
    /// Create an assembler with [`DEFAULT_PERSONA`].
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model, persona: DEFAULT_PERSONA.to_string() }
    }

    /// Replace the persona instruction.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// The persona instruction in use.
    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Assemble the prompt: persona, grounding rules, context, question.
    ///
    /// An empty context still yields a well-formed prompt with an empty
    /// context section.
    pub fn build_prompt(&self, query: &str, context: &RetrievalContext) -> String {
        format!(
            "{persona}\n\n{directive}\n\nCONTEXT:\n{context}\n\nUSER'S QUESTION:\n{query}\n\nANSWER:\n",
            persona = self.persona.trim(),
            directive = GROUNDING_DIRECTIVE,
            context = context.text,
            query = query.trim(),
        )
    }

    /// Generate an answer for `query` grounded in `context`.
    ///
    /// The model's text is returned verbatim alongside `context.sources`.
    ///
    /// # Errors
    ///
    /// Propagates the model's error; nothing is retried.
    pub async fn answer(&self, query: &str, context: &RetrievalContext) -> Result<Answer> {
        let prompt = self.build_prompt(query, context);
        let text = self.model.generate(&prompt).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "answer generation failed");
            e
        })?;

        info!(model = self.model.name(), sources = context.sources.len(), "answer generated");
        Ok(Answer { text, sources: context.sources.clone() })
    }
}
