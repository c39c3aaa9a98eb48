//! Question answering over course materials with tool calling.
//!
//! [`QueryEngine`] lets the model decide whether to consult the course
//! capabilities, runs at most one round of them and returns the final answer
//! with its sources. [`ConversationStore`] keeps the short per-session history
//! that is folded into the system prompt.

mod engine;
mod session;

pub use engine::{Answer, QueryEngine};
pub use session::{ConversationStore, Session};
