// Insight request pipeline: validate input → compose prompt → call model →
// transform reply. All model calls go through llm_client.

pub mod handlers;
pub mod input;
pub mod prompts;
pub mod transform;
