//! These models represent the objects passed between the caller, the orchestrator and the LLM
//!
//! The caller and the provider both speak the OpenAI chat message format, so the internal
//! message model follows that shape closely: a role, optional text, the tool calls an
//! assistant requested, and for tool results the id and name of the call they answer.
pub mod message;
pub mod role;
pub mod tool;
