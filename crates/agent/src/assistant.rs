use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use seatwise_core::config::LlmConfig;
use seatwise_core::domain::enrollment::StudentId;
use seatwise_core::store::CourseStore;
use seatwise_core::AdmissionController;

use crate::gemini::GeminiClient;
use crate::llm::LanguageModel;
use crate::runtime::ToolOrchestrator;
use crate::tools::ToolContext;

pub const UNAVAILABLE_REPLY: &str =
    "The course assistant is not available right now. You can still enroll from the course list.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub response: String,
}

pub enum ChatAssistant {
    Ready(ToolOrchestrator),
    /// Model client could not be built; every chat gets [`UNAVAILABLE_REPLY`].
    Unavailable { reason: String },
}

impl ChatAssistant {
    pub fn from_config(
        config: &LlmConfig,
        courses: Arc<dyn CourseStore>,
        admission: Arc<AdmissionController>,
    ) -> Self {
        match GeminiClient::from_config(config) {
            Ok(client) => {
                info!(event_name = "agent.assistant.ready", model = %config.model, "chat assistant ready");
                Self::with_model(Arc::new(client), courses, admission)
            }
            Err(error) => {
                warn!(
                    event_name = "agent.assistant.unavailable",
                    error = %error,
                    "chat assistant disabled"
                );
                Self::Unavailable { reason: error.to_string() }
            }
        }
    }

    pub fn with_model(
        model: Arc<dyn LanguageModel>,
        courses: Arc<dyn CourseStore>,
        admission: Arc<AdmissionController>,
    ) -> Self {
        Self::Ready(ToolOrchestrator::new(model, courses, admission))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub async fn chat(&self, student_id: &StudentId, message: &str) -> ChatReply {
        let orchestrator = match self {
            Self::Ready(orchestrator) => orchestrator,
            Self::Unavailable { .. } => return ChatReply { response: UNAVAILABLE_REPLY.to_string() },
        };

        let context = ToolContext {
            student_id: student_id.clone(),
            correlation_id: Uuid::new_v4().to_string(),
        };
        let outcome = orchestrator.run(&context, message).await;
        info!(
            event_name = "agent.chat.completed",
            correlation_id = %context.correlation_id,
            student_id = %student_id,
            state = ?outcome.state,
            tool_rounds = outcome.tool_rounds,
            fallback_used = outcome.fallback_used,
            enrolled_course = ?outcome.enrolled_course.as_ref().map(|id| id.0.as_str()),
            "chat exchange finished"
        );
        ChatReply { response: outcome.reply }
    }
}
