// Résumé analysis: extraction, report generation, and the form interactions
// that drive them. All model calls go through llm_client.

pub mod extractor;
pub mod handlers;
pub mod page;
pub mod pipeline;
pub mod prompts;
pub mod report;
