//! Instructions sent to the chat service and fixed user-facing messages
//!
//! Both prompts can be overridden from the widget config:
//!
//! ```toml
//! [prompts]
//! routine_instruction = "You are a skincare expert..."
//! chat_system = "Answer follow-up questions about the routine..."
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// System turn sent with every routine request
    #[serde(default = "default_routine_instruction")]
    pub routine_instruction: String,

    /// First turn of the conversation log
    #[serde(default = "default_chat_system")]
    pub chat_system: String,
}

fn default_routine_instruction() -> String {
    builtin::ROUTINE_INSTRUCTION.to_string()
}

fn default_chat_system() -> String {
    builtin::CHAT_SYSTEM.to_string()
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            routine_instruction: default_routine_instruction(),
            chat_system: default_chat_system(),
        }
    }
}

/// Built-in texts that don't require configuration
pub mod builtin {
    /// Instruction for routine generation
    pub const ROUTINE_INSTRUCTION: &str = r#"You are a beauty and personal care advisor. Build a step-by-step routine using only the products the user selected.

When building the routine:
1. Order the steps the way they should be applied
2. Split morning and evening use when it matters
3. Say briefly what each product does in that step
4. Point out products that should not be combined

Keep it short and practical."#;

    /// Seeds the conversation log for follow-up questions
    pub const CHAT_SYSTEM: &str = "You are a helpful beauty advisor. Answer questions about the user's routine and about skincare, haircare, makeup, fragrance and related topics. Politely decline unrelated questions.";

    /// Shown when a routine is requested with nothing selected
    pub const ADVISORY_EMPTY_SELECTION: &str = "Please select at least one product first.";

    /// Shown when the chat service fails or answers without text
    pub const FALLBACK_REPLY: &str = "Sorry, I couldn't get a response right now. Please try again.";
}
