//! LLM collaborator interface for the tutoring pipeline.
//!
//! The pipeline treats the language model as a black-box capability: given
//! a system instruction and a conversation history, it returns a text
//! completion. The [`LlmProvider`] trait is the seam used by the answer
//! parser, the reference solver and the hint generator; [`CompletionClient`]
//! is the production implementation against an OpenAI-compatible
//! chat-completions endpoint.

pub mod client;

pub use client::{
    Choice, CompletionClient, GenerationRequest, GenerationResponse, LlmProvider, Message,
    ResponseMessage, Usage,
};
