//! Prompt templates for the insight and question routes.
//!
//! Every template carries a single `{input}` placeholder. The caller's text is
//! inserted verbatim; the model's reply is parsed downstream, never the prompt.

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, PLAIN_TEXT_SYSTEM};

const PLACEHOLDER: &str = "{input}";

/// Insight extraction. The model returns `{"Insights": [...]}`, or an empty
/// list when the text holds nothing worth reporting.
pub const INSIGHTS_PROMPT_TEMPLATE: &str = r#"Read the text below and extract the key insights it contains.

Rules:
- Use ONLY information present in the text. Do not add outside knowledge.
- Do not mention OpenAI, ChatGPT, language models, or yourself.
- Each insight has a "summary" of at most 200 characters and a "description" of at most 1500 characters.
- Label insights "Insight 1", "Insight 2", ... in order of importance.
- If the text contains no insight, return {"Insights": []}.
- Do not write a "json" header line before the object.

Return a JSON object with this EXACT shape:
{
  "Insights": [
    {"Insight 1": {"summary": "...", "description": "..."}},
    {"Insight 2": {"summary": "...", "description": "..."}}
  ]
}

TEXT:
{input}"#;

/// Free-form summary, returned to the caller as raw text.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Summarize the following text in a few sentences.
Use only information present in the text and do not mention OpenAI or ChatGPT.

TEXT:
{input}"#;

/// Direct question answering, returned as raw text.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Answer the following question clearly and concisely.
Do not mention OpenAI or ChatGPT.

QUESTION:
{input}"#;

/// Which fixed template a route uses. Chosen by configuration, not per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    Insights,
    Summary,
    Question,
}

impl PromptTemplate {
    pub fn template(self) -> &'static str {
        match self {
            PromptTemplate::Insights => INSIGHTS_PROMPT_TEMPLATE,
            PromptTemplate::Summary => SUMMARY_PROMPT_TEMPLATE,
            PromptTemplate::Question => QUESTION_PROMPT_TEMPLATE,
        }
    }

    pub fn system(self) -> &'static str {
        match self {
            PromptTemplate::Insights => JSON_ONLY_SYSTEM,
            PromptTemplate::Summary | PromptTemplate::Question => PLAIN_TEXT_SYSTEM,
        }
    }

    /// Whether the reply is expected to be the structured insight object.
    pub fn is_structured(self) -> bool {
        matches!(self, PromptTemplate::Insights)
    }

    pub fn compose(self, input: &str) -> String {
        compose(self.template(), input)
    }
}

/// Substitutes `input` into the template's `{input}` placeholder. No escaping.
pub fn compose(template: &str, input: &str) -> String {
    template.replacen(PLACEHOLDER, input, 1)
}
