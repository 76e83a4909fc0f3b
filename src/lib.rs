//! agri-advisor — agricultural advisory chatbot.
//!
//! Linear call chain: classify → dispatch → gather context → prompt →
//! respond. The NLP pipeline, weather service, and policy retrieval are
//! external sidecar services; the local store is a SQLite file populated
//! by one-shot CSV import.

pub mod advisor;
pub mod config;
pub mod intent;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod policy;
pub mod repl;
pub mod session;
pub mod sql_cli;
pub mod store;
pub mod weather;
