use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
	InsertText { offset: usize, text: String },
	DeleteRange { start: usize, end: usize },
	/// Inserts an empty row so that it ends up at `row_index`; `row_index == rows.len()` appends.
	InsertTableRow { table_start: usize, row_index: usize },
}
impl Op {
	/// Lowest offset the op touches; everything at or after it shifts once the op is applied.
	pub fn anchor(&self) -> usize {
		match self {
			Self::InsertText { offset, .. } => *offset,
			Self::DeleteRange { start, .. } => *start,
			Self::InsertTableRow { table_start, .. } => *table_start,
		}
	}

	pub fn is_structural(&self) -> bool {
		matches!(self, Self::InsertTableRow { .. })
	}
}

/// Ops computed against one structure read, submitted as one atomic mutation.
///
/// Ops are emitted highest offset first so each one lands before anything it could shift.
/// Ops sharing an offset keep their push order.
#[derive(Clone, Debug, Default)]
pub struct OpBatch {
	ops: Vec<Op>,
}
impl OpBatch {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, op: Op) -> &mut Self {
		self.ops.push(op);

		self
	}

	pub fn insert_text(&mut self, offset: usize, text: impl Into<String>) -> &mut Self {
		self.push(Op::InsertText { offset, text: text.into() })
	}

	pub fn delete_range(&mut self, start: usize, end: usize) -> &mut Self {
		self.push(Op::DeleteRange { start, end })
	}

	pub fn len(&self) -> usize {
		self.ops.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}

	pub fn into_ops(self) -> Vec<Op> {
		let mut ops = self.ops;

		ops.sort_by(|a, b| b.anchor().cmp(&a.anchor()));

		ops
	}
}
