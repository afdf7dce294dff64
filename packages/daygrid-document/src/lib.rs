//! The positional document model consumed by placement, and the store interface behind it.
//!
//! A document is an ordered list of paragraphs and tables. Every piece of text has an absolute
//! `[start, end)` offset that shifts whenever anything before it changes.

pub mod memory;
pub mod models;
pub mod ops;
pub mod store;

mod error;

pub use error::Error;
pub use models::{DocumentId, Element, Paragraph, Structure, Table, TableCell, TableRow};
pub use ops::{Op, OpBatch};
pub use store::{BoxFuture, DailyIndex, DocumentStore};

pub type Result<T, E = Error> = std::result::Result<T, E>;
