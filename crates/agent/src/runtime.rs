//! Bounded tool loop for one chat exchange.
//!
//! `AwaitingModel -> ExecutingTools -> AwaitingModel ...` until the model
//! answers without tools (`Done`), the step budget runs out, or the model
//! service fails (`Aborted`). Enrollments committed before an abort stay.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use seatwise_core::domain::course::CourseId;
use seatwise_core::store::CourseStore;
use seatwise_core::AdmissionController;

use crate::fallback::{has_enrollment_intent, FallbackMatcher};
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::{LanguageModel, Message, ModelTurn, ToolCall, ToolChoice};
use crate::tools::{ToolContext, ToolEffect, ToolRegistry};

pub const MAX_MODEL_STEPS: usize = 5;

pub const SYSTEM_PROMPT: &str = "You are a course enrollment assistant for students. \
Use listCourses to show the courses the student can still take, getMyEnrollments to show \
what they are already enrolled in, and enrollCourse with a course id to enroll them. \
Only enroll when the student clearly asks for it, and enroll at most one course per request. \
When a tool reports a status other than success, explain it plainly. Keep answers short.";

pub const TOO_MANY_STEPS_REPLY: &str =
    "That request took too many steps to finish. Please try again with a simpler request.";
pub const MODEL_FAULT_REPLY: &str =
    "Sorry, something went wrong while answering. Please try again in a moment.";
pub const EMPTY_REPLY: &str =
    "I am not sure how to help with that. You can ask me to list the courses open to you.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    StepLimit,
    ModelFault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    ExecutingTools,
    Done,
    Aborted(AbortReason),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoopOutcome {
    pub state: LoopState,
    pub reply: String,
    pub tool_rounds: usize,
    pub model_calls: usize,
    pub executed_tools: Vec<String>,
    pub enrolled_course: Option<CourseId>,
    pub fallback_used: bool,
}

pub struct ToolOrchestrator {
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    fallback: FallbackMatcher,
    guardrails: GuardrailPolicy,
}

struct Exchange {
    state: LoopState,
    history: Vec<Message>,
    tool_rounds: usize,
    model_calls: usize,
    executed_tools: Vec<String>,
    enrolled_course: Option<CourseId>,
}

impl Exchange {
    fn finish(self, state: LoopState, reply: String, fallback_used: bool) -> LoopOutcome {
        debug!(from = ?self.state, to = ?state, "tool loop finished");
        LoopOutcome {
            state,
            reply,
            tool_rounds: self.tool_rounds,
            model_calls: self.model_calls,
            executed_tools: self.executed_tools,
            enrolled_course: self.enrolled_course,
            fallback_used,
        }
    }
}

impl ToolOrchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        courses: Arc<dyn CourseStore>,
        admission: Arc<AdmissionController>,
    ) -> Self {
        Self {
            model,
            tools: ToolRegistry::course_tools(courses.clone(), admission.clone()),
            fallback: FallbackMatcher::new(courses, admission),
            guardrails: GuardrailPolicy::default(),
        }
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub async fn run(&self, context: &ToolContext, message: &str) -> LoopOutcome {
        let declarations = self.tools.declarations();
        let mut exchange = Exchange {
            state: LoopState::AwaitingModel,
            history: vec![Message::System(SYSTEM_PROMPT.to_string()), Message::User(message.to_string())],
            tool_rounds: 0,
            model_calls: 0,
            executed_tools: Vec::new(),
            enrolled_course: None,
        };

        for step in 1..=MAX_MODEL_STEPS {
            let tool_choice = self.guardrails.tool_choice(exchange.enrolled_course.is_some());
            exchange.model_calls += 1;

            let turn = match self.model.complete(&exchange.history, &declarations, tool_choice).await {
                Ok(turn) => turn,
                Err(error) => {
                    warn!(
                        event_name = "agent.loop.model_fault",
                        correlation_id = %context.correlation_id,
                        step,
                        error = %error,
                        "language model call failed"
                    );
                    return exchange.finish(
                        LoopState::Aborted(AbortReason::ModelFault),
                        MODEL_FAULT_REPLY.to_string(),
                        false,
                    );
                }
            };

            let ModelTurn { text, tool_calls } = turn;
            let admitted = tool_calls
                .into_iter()
                .filter(|call| self.admit(context, call, tool_choice, exchange.enrolled_course.is_some()))
                .collect::<Vec<ToolCall>>();

            if admitted.is_empty() {
                return self.conclude(context, message, exchange, text).await;
            }

            exchange.state = LoopState::ExecutingTools;
            exchange.history.push(Message::Model { text, tool_calls: admitted.clone() });
            for call in &admitted {
                // Earlier calls in this round may already have enrolled the student.
                if !self.admit(context, call, tool_choice, exchange.enrolled_course.is_some()) {
                    exchange.history.push(Message::ToolResult {
                        name: call.name.clone(),
                        payload: json!({
                            "status": "error",
                            "message": "Not run: an enrollment already succeeded in this conversation.",
                        }),
                    });
                    continue;
                }

                let output = self.tools.execute(context, call).await;
                debug!(
                    event_name = "agent.loop.tool_executed",
                    correlation_id = %context.correlation_id,
                    tool = %call.name,
                    "tool executed"
                );
                if let ToolEffect::Enrolled(course_id) = output.effect {
                    exchange.enrolled_course = Some(course_id);
                }
                exchange.executed_tools.push(call.name.clone());
                exchange.history.push(Message::ToolResult { name: call.name.clone(), payload: output.payload });
            }
            exchange.tool_rounds += 1;
            exchange.state = LoopState::AwaitingModel;
        }

        warn!(
            event_name = "agent.loop.step_limit",
            correlation_id = %context.correlation_id,
            model_calls = exchange.model_calls,
            "tool loop exceeded its step budget"
        );
        exchange.finish(LoopState::Aborted(AbortReason::StepLimit), TOO_MANY_STEPS_REPLY.to_string(), false)
    }

    fn admit(&self, context: &ToolContext, call: &ToolCall, tool_choice: ToolChoice, enrolled: bool) -> bool {
        match self.guardrails.evaluate(call, tool_choice, enrolled) {
            GuardrailDecision::Allow => true,
            GuardrailDecision::Deny { reason_code } => {
                warn!(
                    event_name = "agent.loop.tool_call_suppressed",
                    correlation_id = %context.correlation_id,
                    tool = %call.name,
                    reason_code,
                    "dropping tool call"
                );
                false
            }
        }
    }

    async fn conclude(
        &self,
        context: &ToolContext,
        message: &str,
        mut exchange: Exchange,
        text: Option<String>,
    ) -> LoopOutcome {
        if exchange.enrolled_course.is_none() && has_enrollment_intent(message) {
            let outcome = self.fallback.resolve(&context.student_id, message, &context.correlation_id).await;
            exchange.enrolled_course = outcome.enrolled;
            info!(
                event_name = "agent.loop.fallback",
                correlation_id = %context.correlation_id,
                enrolled = exchange.enrolled_course.is_some(),
                "model answered without tools, fallback matcher ran"
            );
            return exchange.finish(LoopState::Done, outcome.reply, true);
        }

        let reply = text.filter(|text| !text.trim().is_empty()).unwrap_or_else(|| EMPTY_REPLY.to_string());
        info!(
            event_name = "agent.loop.done",
            correlation_id = %context.correlation_id,
            tool_rounds = exchange.tool_rounds,
            model_calls = exchange.model_calls,
            "tool loop completed"
        );
        exchange.finish(LoopState::Done, reply, false)
    }
}
