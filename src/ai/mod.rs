//! The document-extraction and contextual-chat pipeline.
//!
//! Four stateless stages: `context` gathers a bounded, role-aware bundle of
//! prior medical information; `extractor` turns one document image into
//! structured fields via the vision model; `prompt` renders bundle + history
//! into the chat model's input shape; `responder` calls the chat model and
//! normalizes success and failure into plain text.

pub mod context;
pub mod extractor;
pub mod prompt;
pub mod responder;
