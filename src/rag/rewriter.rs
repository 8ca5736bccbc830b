use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_TURNS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Any other role a client sends; ignored when rewriting.
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

/// Folds recent conversation turns into a retrieval query.
///
/// The original query is always kept verbatim at the end of the result; the
/// history is only ever a bracketed prefix.
#[derive(Debug, Clone, Copy)]
pub struct QueryRewriter {
    max_turns: usize,
}

impl Default for QueryRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_TURNS)
    }
}

impl QueryRewriter {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    pub fn rewrite(&self, query: &str, history: &[ConversationTurn]) -> String {
        let start = history.len().saturating_sub(self.max_turns);
        let recent: Vec<String> = history[start..]
            .iter()
            .filter(|turn| turn.role != Role::Other && !turn.content.is_empty())
            .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
            .collect();

        if recent.is_empty() {
            return query.to_string();
        }
        format!("[Follow-up based on: {}] {}", recent.join(" | "), query)
    }
}

pub fn rewrite(query: &str, history: &[ConversationTurn]) -> String {
    QueryRewriter::default().rewrite(query, history)
}
