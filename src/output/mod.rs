//! Candidate table persistence
//!
//! Backends share [`CandidateWriterBackend`]; [`CandidateWriter`] picks one at
//! runtime. Overwrite or append is chosen explicitly through [`WriteMode`],
//! never by looking at whether the artifact already exists.

pub mod checkpoint;
pub mod csv_writer;
pub mod jsonl_writer;
pub mod sqlite_writer;
pub mod writer;
pub mod writer_backend;

pub use checkpoint::Checkpointer;
pub use writer::{BackendType, CandidateWriter};
pub use writer_backend::{CandidateWriterBackend, WriteMode, WriterError};
