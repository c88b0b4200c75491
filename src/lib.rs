//! HTTP service that authenticates users against a SQLite user table and
//! answers free-text questions with retrieval-augmented generation.

pub mod auth;
pub mod core;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod users;
