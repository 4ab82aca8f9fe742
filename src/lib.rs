//! # pdf-qa
//!
//! A local-first question-answering pipeline over PDF documents.
//!
//! PDFs are split into overlapping word windows, embedded, and stored in a
//! vector-indexed chunk table. Questions are embedded the same way, the
//! nearest chunks are pulled back, and a locally hosted LLM (Ollama wire
//! format) answers from that context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌──────────────┐
//! │ Extract  │──▶│  Chunk  │──▶│ Embedding │──▶│ Chunk Store  │
//! │ (PDF)    │   │ windows │   │ provider  │   │ pgvector/... │
//! └──────────┘   └─────────┘   └─────┬─────┘   └──────┬───────┘
//!                                    │ query          │ top-K
//!                                    ▼                ▼
//!                              ┌───────────┐   ┌──────────────┐
//!                              │  Prompt   │◀──│   Retrieve   │
//!                              │  builder  │   └──────────────┘
//!                              └─────┬─────┘
//!                                    ▼
//!                              ┌───────────┐
//!                              │Completion │  /api/generate, /api/chat
//!                              └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pdfqa init                          # create the chunk table
//! pdfqa ingest report.pdf --summary   # chunk, embed, store
//! pdfqa ask "What changed in Q3?" --persona academic
//! pdfqa chat --markdown
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`error`] | Typed pipeline errors |
//! | [`models`] | Pages, chunks, query results |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Word-window chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Chunk storage backends |
//! | [`db`] | Database connections |
//! | [`migrate`] | Schema setup |
//! | [`ingest`] | Write path orchestration |
//! | [`search`] | Nearest-neighbor retrieval |
//! | [`prompt`] | Retrieval-augmented prompt assembly |
//! | [`completion`] | LLM completion client |
//! | [`ask`] | Question answering |
//! | [`summary`] | Document summaries |
//! | [`chat`] | Terminal chat loop |

pub mod ask;
pub mod chat;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod search;
pub mod store;
pub mod summary;
