use crate::llm::{ToolCall, ToolChoice};
use crate::tools::ENROLL_COURSE;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str },
}

/// Tool-use limits for one chat exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    /// Once an enrollment succeeded, no further tool may run in the exchange.
    pub single_enrollment_per_exchange: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { single_enrollment_per_exchange: true }
    }
}

impl GuardrailPolicy {
    pub fn tool_choice(&self, enrolled: bool) -> ToolChoice {
        if enrolled && self.single_enrollment_per_exchange {
            ToolChoice::None
        } else {
            ToolChoice::Auto
        }
    }

    pub fn evaluate(&self, call: &ToolCall, tool_choice: ToolChoice, enrolled: bool) -> GuardrailDecision {
        if tool_choice == ToolChoice::None {
            return GuardrailDecision::Deny { reason_code: "tool_choice_none" };
        }
        if enrolled && self.single_enrollment_per_exchange {
            return GuardrailDecision::Deny {
                reason_code: if call.name == ENROLL_COURSE {
                    "repeat_enrollment_suppressed"
                } else {
                    "tools_closed_after_enrollment"
                },
            };
        }
        GuardrailDecision::Allow
    }
}
