//! Stateless chat-completion client.
//!
//! This module provides the [`ChatClient`], which keeps a rolling
//! [`ConversationHistory`](crate::ConversationHistory) and sends it with every request, either
//! waiting for the whole reply or streaming it fragment by fragment.
//!
//! # Architecture
//!
//! - [`client`]: request construction, response classification, and history commits
//! - [`commands`]: slash command parsing for interactive front ends

mod client;
mod commands;

pub use client::{CHAT_COMPLETIONS_PATH, ChatClient};
pub use commands::{ChatCommand, help_text, parse_command};
