//! Chat assistant for course enrollment.
//!
//! The model is a translator between the student and three tools. It never
//! decides admission itself: every enrollment goes through
//! [`seatwise_core::AdmissionController`], which owns the capacity rules.
//!
//! - `llm` / `gemini`: model contract and the Gemini `generateContent` client
//! - `tools`: `listCourses`, `getMyEnrollments`, `enrollCourse` and the registry
//! - `guardrails`: stops tool use once an enrollment has succeeded
//! - `fallback`: keyword and title matching when the model never calls a tool
//! - `runtime`: the bounded tool loop
//! - `assistant`: the entry point used by the HTTP layer

pub mod assistant;
pub mod fallback;
pub mod gemini;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use assistant::{ChatAssistant, ChatReply};
pub use gemini::GeminiClient;
pub use llm::{LanguageModel, LlmError, Message, ModelTurn, ToolCall, ToolChoice, ToolDeclaration};
pub use runtime::{AbortReason, LoopOutcome, LoopState, ToolOrchestrator};
