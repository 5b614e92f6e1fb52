pub mod document_writer;
pub mod question_source;
pub mod response_parser;
pub mod revision_notes;

pub use document_writer::{DocumentRenderer, PdfRenderer, RenderedDocument};
pub use question_source::QuestionSource;
pub use revision_notes::RevisionNotesService;
