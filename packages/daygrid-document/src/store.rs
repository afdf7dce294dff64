use std::{future::Future, pin::Pin};

use time::Date;

use crate::{DocumentId, Op, Result, Structure};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A remote, offset-addressed document service.
///
/// Every `structure` call returns a snapshot that goes stale on the next mutation, including
/// mutations issued by the same caller. `mutate` applies the whole batch or nothing, evaluating
/// each op against the state left by the previous one.
pub trait DocumentStore
where
	Self: Send + Sync,
{
	fn structure<'a>(&'a self, doc_id: &'a DocumentId) -> BoxFuture<'a, Result<Structure>>;

	fn mutate<'a>(&'a self, doc_id: &'a DocumentId, ops: Vec<Op>) -> BoxFuture<'a, Result<()>>;
}

/// Resolves a calendar day to the document holding that day's entries.
pub trait DailyIndex
where
	Self: Send + Sync,
{
	fn document_for<'a>(&'a self, day: Date) -> BoxFuture<'a, Result<Option<DocumentId>>>;
}
