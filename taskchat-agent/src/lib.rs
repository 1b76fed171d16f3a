//! # taskchat agent
//!
//! The interactive side of taskchat:
//! 1. Print a banner
//! 2. Read a line from the user
//! 3. Send it to the chat provider as a single user message
//! 4. Print the labelled reply
//! 5. Repeat until `exit` or end of input
//!
//! The provider handle is created by the caller and lent to the loop.

mod chat;

pub use chat::{ChatConfig, ChatLoop, ChatSummary, LoopEnd};
