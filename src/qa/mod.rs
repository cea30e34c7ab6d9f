// Retrieval QA
// Embed the question, fetch the nearest chunks, stuff them into a prompt and ask the model


use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::database::VectorIndex;
use crate::embeddings::Embedder;
use crate::llm::LanguageModel;
use crate::{BotError, Result};

/// Metadata key holding the chunk text of an indexed record
pub const TEXT_KEY: &str = "text";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

const DEFAULT_TEMPLATE: &str = "Use the following pieces of information to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.

Context: {context}
Question: {question}

Only return the helpful answer below and nothing else.
Helpful answer:
";

/// Prompt with `{context}` and `{question}` slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Fails unless both placeholders are present
    #[inline]
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(BotError::Config(format!(
                    "Prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { template })
    }

    /// Fill every slot in one left-to-right pass; inserted text is never rescanned
    #[inline]
    pub fn format(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        loop {
            let next = [(CONTEXT_PLACEHOLDER, context), (QUESTION_PLACEHOLDER, question)]
                .into_iter()
                .filter_map(|(placeholder, value)| {
                    rest.split_once(placeholder)
                        .map(|(before, after)| (before, after, value))
                })
                .min_by_key(|(before, _, _)| before.len());

            let Some((before, after, value)) = next else {
                out.push_str(rest);
                return out;
            };
            out.push_str(before);
            out.push_str(value);
            rest = after;
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.template
    }
}

/// A retrieved passage that went into the prompt
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub id: String,
    pub score: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QaResponse {
    /// Trimmed model completion
    pub result: String,
    pub source_documents: Vec<SourceDocument>,
}

/// "Stuff" retrieval chain over one embedder, one index and one model
pub struct RetrievalQa {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LanguageModel>,
    prompt: PromptTemplate,
    top_k: usize,
}

impl RetrievalQa {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModel>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            prompt: PromptTemplate::default(),
            top_k,
        }
    }

    #[inline]
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    #[inline]
    pub fn ask(&self, question: &str) -> Result<QaResponse> {
        debug!("Answering question (length: {})", question.len());

        let query_vector = self.embedder.embed(question)?;
        let matches = self.index.query(&query_vector, self.top_k)?;

        let source_documents: Vec<SourceDocument> = matches
            .into_iter()
            .filter_map(|record| {
                let Some(text) = record.metadata_str(TEXT_KEY).map(str::to_string) else {
                    warn!("Match {} has no '{}' metadata, skipping", record.id, TEXT_KEY);
                    return None;
                };
                Some(SourceDocument {
                    id: record.id,
                    score: record.score,
                    text,
                })
            })
            .take(self.top_k)
            .collect();

        let context = source_documents
            .iter()
            .map(|doc| doc.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = self.prompt.format(&context, question);

        let completion = self.llm.generate(&prompt)?;
        info!(
            "Answered from {} passages ({} characters)",
            source_documents.len(),
            completion.trim().len()
        );

        Ok(QaResponse {
            result: completion.trim().to_string(),
            source_documents,
        })
    }
}
