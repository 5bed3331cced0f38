//! Type definitions for chat primitives
//!

/// The author of a `Message`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// A `System` message instructs the model. When present it is the first
    /// message of the conversation.
    System,

    /// A message authored by the user
    User,
}

/// A `Message` in a chat conversation
#[derive(Debug, Clone)]
pub(crate) struct Message {
    /// The author of the message
    pub role: Role,
    /// The contents of the message
    pub content: String,
}

impl Message {
    pub(crate) fn new(role: Role, content: String) -> Message {
        Message { role, content }
    }
}

/// Builds the messages for a single-turn request. The system prompt is only sent
/// when it has visible content.
pub(crate) fn single_turn(system_prompt: Option<&str>, prompt: String) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);

    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(Message::new(Role::System, system.to_string()));
    }

    messages.push(Message::new(Role::User, prompt));

    messages
}
