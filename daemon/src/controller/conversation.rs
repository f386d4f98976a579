//! Conversation transcript kept alongside the voice session

use serde::{Deserialize, Serialize};

/// Who said a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: u64,
    pub role: Role,
    pub text: String,
}

/// Ordered turns with stable ids
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return a copy of it
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> Turn {
        self.next_id += 1;
        let turn = Turn {
            id: self.next_id,
            role,
            text: text.into(),
        };
        self.turns.push(turn.clone());
        turn
    }

    /// Replace the text of an existing turn
    pub fn update(&mut self, id: u64, text: impl Into<String>) -> Option<Turn> {
        let turn = self.turns.iter_mut().find(|t| t.id == id)?;
        turn.text = text.into();
        Some(turn.clone())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
