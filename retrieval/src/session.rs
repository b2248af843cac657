//! Chat sessions and their question/answer history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::RagEngine;
use crate::error::{RagError, Result};

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// The ordered log of answered questions in a session.
///
/// Turns can only be appended, and only by [`Session::ask`] after the
/// engine has produced an answer.
#[derive(Debug, Clone, Default)]
pub struct ChainOfThought {
    turns: Vec<Turn>,
}

impl ChainOfThought {
    fn record(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Renders each turn as `Q: ...\nA: ...\n`, separated by blank lines.
impl fmt::Display for ChainOfThought {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, turn) in self.turns.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "Q: {}\nA: {}", turn.question, turn.answer)?;
        }
        Ok(())
    }
}

/// Whether a session still accepts questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Open,
    Closed,
}

/// A conversation with the engine.
///
/// A session starts `Open`. [`Session::close`] moves it to `Closed` for good;
/// every later `ask` fails with [`RagError::SessionClosed`].
pub struct Session {
    engine: RagEngine,
    history: ChainOfThought,
    state: SessionState,
}

impl Session {
    pub fn new(engine: RagEngine) -> Self {
        Self {
            engine,
            history: ChainOfThought::default(),
            state: SessionState::Open,
        }
    }

    /// Ask a question. The exchange is recorded only if an answer comes back.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        if self.state == SessionState::Closed {
            return Err(RagError::SessionClosed);
        }

        let answer = self.engine.generate(question).await?;

        self.history.record(Turn {
            question: question.to_string(),
            answer: answer.clone(),
            asked_at: Utc::now(),
        });
        debug!("Recorded turn {}", self.history.len());

        Ok(answer)
    }

    /// All answered turns, oldest first.
    pub fn history(&self) -> &[Turn] {
        self.history.turns()
    }

    pub fn chain_of_thought(&self) -> &ChainOfThought {
        &self.history
    }

    /// Stop accepting questions. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Closed;
            info!("Session closed after {} turns", self.history.len());
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn engine(&self) -> &RagEngine {
        &self.engine
    }

    /// Consume the session, keeping its history.
    pub fn into_history(self) -> Vec<Turn> {
        self.history.turns
    }
}
