//! In-process reference store, used for offline runs and tests.
//!
//! Offset layout: a paragraph spans its text plus one newline. A table spends one offset on its
//! start marker, one per row, one per cell and one on its end marker; a cell's paragraphs follow
//! its marker. Offsets start at zero.

use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
	BoxFuture, DailyIndex, DocumentId, DocumentStore, Element, Error, Op, Paragraph, Result,
	Structure, Table, TableCell, TableRow,
};

/// Editable document content. A newline inside a cell separates the cell's paragraphs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
	Paragraph(String),
	Table(Vec<Vec<String>>),
}

#[derive(Debug)]
enum Target {
	Paragraph { block: usize, at: usize },
	Cell { block: usize, row: usize, column: usize, at: usize },
	End,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
	documents: Mutex<HashMap<DocumentId, Vec<Block>>>,
	mutations: AtomicUsize,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_document(self, doc_id: DocumentId, blocks: Vec<Block>) -> Self {
		self.insert_document(doc_id, blocks);

		self
	}

	pub fn insert_document(&self, doc_id: DocumentId, blocks: Vec<Block>) {
		let mut documents = self.documents.lock().unwrap_or_else(|err| err.into_inner());

		documents.insert(doc_id, blocks);
	}

	pub fn blocks(&self, doc_id: &DocumentId) -> Option<Vec<Block>> {
		let documents = self.documents.lock().unwrap_or_else(|err| err.into_inner());

		documents.get(doc_id).cloned()
	}

	/// Number of accepted `mutate` batches.
	pub fn mutation_count(&self) -> usize {
		self.mutations.load(Ordering::SeqCst)
	}

	pub fn read_structure(&self, doc_id: &DocumentId) -> Result<Structure> {
		let documents = self.documents.lock().unwrap_or_else(|err| err.into_inner());
		let blocks = documents.get(doc_id).ok_or_else(|| Error::NotFound(doc_id.to_string()))?;

		Ok(layout(blocks))
	}

	pub fn apply(&self, doc_id: &DocumentId, ops: &[Op]) -> Result<()> {
		let mut documents = self.documents.lock().unwrap_or_else(|err| err.into_inner());
		let current = documents.get(doc_id).ok_or_else(|| Error::NotFound(doc_id.to_string()))?;
		let mut draft = current.clone();

		for op in ops {
			apply_op(&mut draft, op)?;
		}

		documents.insert(doc_id.clone(), draft);
		self.mutations.fetch_add(1, Ordering::SeqCst);

		Ok(())
	}
}

impl DocumentStore for MemoryStore {
	fn structure<'a>(&'a self, doc_id: &'a DocumentId) -> BoxFuture<'a, Result<Structure>> {
		Box::pin(async move { self.read_structure(doc_id) })
	}

	fn mutate<'a>(&'a self, doc_id: &'a DocumentId, ops: Vec<Op>) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.apply(doc_id, &ops) })
	}
}

/// Day-to-document map kept in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
	days: Mutex<HashMap<Date, DocumentId>>,
}
impl MemoryIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_day(self, day: Date, doc_id: DocumentId) -> Self {
		self.days.lock().unwrap_or_else(|err| err.into_inner()).insert(day, doc_id);

		self
	}
}

impl DailyIndex for MemoryIndex {
	fn document_for<'a>(&'a self, day: Date) -> BoxFuture<'a, Result<Option<DocumentId>>> {
		Box::pin(async move {
			let days = self.days.lock().unwrap_or_else(|err| err.into_inner());

			Ok(days.get(&day).cloned())
		})
	}
}

pub fn parse_blocks(raw: &str) -> Result<Vec<Block>> {
	Ok(serde_json::from_str(raw)?)
}

pub fn render_blocks(blocks: &[Block]) -> Result<String> {
	Ok(serde_json::to_string_pretty(blocks)?)
}

/// Computes offsets for `blocks`. Elements map one-to-one onto blocks.
pub fn layout(blocks: &[Block]) -> Structure {
	let mut cursor = 0;
	let mut elements = Vec::with_capacity(blocks.len());

	for block in blocks {
		match block {
			Block::Paragraph(text) => {
				let paragraph = paragraph_at(text, cursor);

				cursor = paragraph.end;
				elements.push(Element::Paragraph(paragraph));
			},
			Block::Table(rows) => {
				let start = cursor;
				let mut table_rows = Vec::with_capacity(rows.len());

				cursor += 1;

				for row in rows {
					let row_start = cursor;
					let mut cells = Vec::with_capacity(row.len());

					cursor += 1;

					for cell in row {
						let cell_start = cursor;
						let mut paragraphs = Vec::new();

						cursor += 1;

						for line in cell.split('\n') {
							let paragraph = paragraph_at(line, cursor);

							cursor = paragraph.end;
							paragraphs.push(paragraph);
						}

						cells.push(TableCell { start: cell_start, end: cursor, paragraphs });
					}

					table_rows.push(TableRow { start: row_start, end: cursor, cells });
				}

				cursor += 1;
				elements.push(Element::Table(Table { start, end: cursor, rows: table_rows }));
			},
		}
	}

	Structure { elements }
}

fn paragraph_at(text: &str, start: usize) -> Paragraph {
	Paragraph { text: text.to_string(), start, end: start + char_len(text) + 1 }
}

fn locate(blocks: &[Block], offset: usize) -> Option<Target> {
	let mut cursor = 0;

	for (block, content) in blocks.iter().enumerate() {
		match content {
			Block::Paragraph(text) => {
				let len = char_len(text);

				if (cursor..=cursor + len).contains(&offset) {
					return Some(Target::Paragraph { block, at: offset - cursor });
				}

				cursor += len + 1;
			},
			Block::Table(rows) => {
				cursor += 1;

				for (row, cells) in rows.iter().enumerate() {
					cursor += 1;

					for (column, cell) in cells.iter().enumerate() {
						let len = char_len(cell);

						cursor += 1;

						if (cursor..=cursor + len).contains(&offset) {
							return Some(Target::Cell { block, row, column, at: offset - cursor });
						}

						cursor += len + 1;
					}
				}

				cursor += 1;
			},
		}
	}

	(offset == cursor).then_some(Target::End)
}

fn apply_op(blocks: &mut Vec<Block>, op: &Op) -> Result<()> {
	match op {
		Op::InsertText { offset, text } => insert_text(blocks, *offset, text),
		Op::DeleteRange { start, end } => delete_range(blocks, *start, *end),
		Op::InsertTableRow { table_start, row_index } =>
			insert_table_row(blocks, *table_start, *row_index),
	}
}

fn insert_text(blocks: &mut Vec<Block>, offset: usize, text: &str) -> Result<()> {
	if text.is_empty() {
		return Ok(());
	}

	match locate(blocks, offset) {
		Some(Target::Paragraph { block, at }) => {
			let Some(Block::Paragraph(existing)) = blocks.get(block) else {
				return Err(Error::InvalidOffset(format!("{offset} is not inside a paragraph")));
			};
			let merged = insert_chars(existing, at, text);
			let parts: Vec<Block> =
				merged.split('\n').map(|line| Block::Paragraph(line.to_string())).collect();

			blocks.splice(block..=block, parts);

			Ok(())
		},
		Some(Target::Cell { block, row, column, at }) => {
			let cell = cell_mut(blocks, block, row, column)?;

			*cell = insert_chars(cell, at, text);

			Ok(())
		},
		Some(Target::End) => {
			for line in text.trim_end_matches('\n').split('\n') {
				blocks.push(Block::Paragraph(line.to_string()));
			}

			Ok(())
		},
		None => Err(Error::InvalidOffset(format!("{offset} is not inside any paragraph"))),
	}
}

fn delete_range(blocks: &mut [Block], start: usize, end: usize) -> Result<()> {
	if start >= end {
		return Err(Error::InvalidArgument(format!("empty delete range {start}..{end}")));
	}

	let span = end - start;

	match locate(blocks, start) {
		Some(Target::Paragraph { block, at }) => {
			let Some(Block::Paragraph(text)) = blocks.get_mut(block) else {
				return Err(Error::InvalidOffset(format!("{start} is not inside a paragraph")));
			};

			if at + span > char_len(text) {
				return Err(Error::InvalidOffset(format!(
					"{start}..{end} crosses a paragraph boundary"
				)));
			}

			*text = remove_chars(text, at, at + span);

			Ok(())
		},
		Some(Target::Cell { block, row, column, at }) => {
			let cell = cell_mut(blocks, block, row, column)?;

			if at + span > char_len(cell) {
				return Err(Error::InvalidOffset(format!("{start}..{end} crosses a cell boundary")));
			}

			*cell = remove_chars(cell, at, at + span);

			Ok(())
		},
		_ => Err(Error::InvalidOffset(format!("{start}..{end} is outside the document text"))),
	}
}

fn insert_table_row(blocks: &mut [Block], table_start: usize, row_index: usize) -> Result<()> {
	let structure = layout(blocks);
	let position = structure
		.elements
		.iter()
		.position(|element| matches!(element, Element::Table(table) if table.start == table_start))
		.ok_or_else(|| Error::InvalidOffset(format!("no table starts at {table_start}")))?;
	let Some(Block::Table(rows)) = blocks.get_mut(position) else {
		return Err(Error::InvalidOffset(format!("no table starts at {table_start}")));
	};

	if row_index > rows.len() {
		return Err(Error::InvalidArgument(format!(
			"row index {row_index} exceeds {} rows",
			rows.len()
		)));
	}

	let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);

	rows.insert(row_index, vec![String::new(); columns]);

	Ok(())
}

fn cell_mut(blocks: &mut [Block], block: usize, row: usize, column: usize) -> Result<&mut String> {
	match blocks.get_mut(block) {
		Some(Block::Table(rows)) => rows
			.get_mut(row)
			.and_then(|cells| cells.get_mut(column))
			.ok_or_else(|| Error::InvalidOffset(format!("cell {row}:{column} does not exist"))),
		_ => Err(Error::InvalidOffset(format!("block {block} is not a table"))),
	}
}

fn char_len(text: &str) -> usize {
	text.chars().count()
}

fn insert_chars(text: &str, at: usize, insert: &str) -> String {
	let byte = text.char_indices().nth(at).map(|(index, _)| index).unwrap_or(text.len());
	let mut out = String::with_capacity(text.len() + insert.len());

	out.push_str(&text[..byte]);
	out.push_str(insert);
	out.push_str(&text[byte..]);

	out
}

fn remove_chars(text: &str, from: usize, to: usize) -> String {
	text.chars()
		.enumerate()
		.filter(|(index, _)| *index < from || *index >= to)
		.map(|(_, ch)| ch)
		.collect()
}
