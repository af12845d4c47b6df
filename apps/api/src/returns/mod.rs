// Returns desk: extract case facts from a customer email, decide acceptance against
// the return policy, draft the reply.
// All generation calls go through llm_client::TextGenerator.

pub mod handlers;
pub mod pipeline;
pub mod policy;
pub mod prompts;
pub mod schemas;
