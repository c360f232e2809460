//! LINE bot relay library: configuration, LINE and Gemini clients, the per-event relay,
//! and the HTTP gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod relay;

#[cfg(test)]
pub(crate) mod testing;
