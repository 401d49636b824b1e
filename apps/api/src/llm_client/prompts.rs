// Shared system prompts. Route-specific templates live in insights::prompts.

/// System prompt for structured output: JSON only, no fences, no header line.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT start your reply with the word json.";

/// System prompt for free-form answers.
pub const PLAIN_TEXT_SYSTEM: &str = "You are a helpful assistant. \
    Answer directly and concisely. \
    Do NOT mention which model or company produced the answer.";
