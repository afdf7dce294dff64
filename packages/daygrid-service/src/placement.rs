//! Finding the destination of a write inside a live positional document.
//!
//! Every public method reads a fresh structure first. Offsets are never reused after a
//! structural mutation; the structure is re-read instead.

use serde::Serialize;

use daygrid_document::{
	DocumentId, DocumentStore, Element, Op, OpBatch, Paragraph, Structure, Table, TableRow,
};
use daygrid_domain::{
	SlotRange,
	slot::{format_clock, label_key},
};

use crate::Result;

/// Where a write ended up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum Placement {
	ExistingRow { row: usize, label: String },
	CreatedRow { row: usize, label: String },
	/// Inserted after a top-level paragraph that names the slot.
	Paragraph { after: String },
	/// Inserted at the end of a free-text section.
	Section { heading: String },
	Appended,
}

#[derive(Debug)]
struct Candidate {
	index: usize,
	exact: bool,
	range: SlotRange,
}

pub struct PlacementEngine<'a> {
	store: &'a dyn DocumentStore,
	slot_minutes: u16,
}
impl<'a> PlacementEngine<'a> {
	pub fn new(store: &'a dyn DocumentStore, slot_minutes: u16) -> Self {
		Self { store, slot_minutes }
	}

	/// Writes `content` into the grid row for `slot`, creating the row when none covers it.
	///
	/// Falls back to a paragraph naming the slot, then to the end of the document. Only a
	/// failure of that final append is reported.
	pub async fn place_in_grid(
		&self,
		doc_id: &DocumentId,
		slot: SlotRange,
		content: &str,
	) -> Result<Placement> {
		let structure = self.store.structure(doc_id).await?;
		let Some((ordinal, table)) = find_grid(&structure, self.slot_minutes) else {
			tracing::debug!(label = %slot.label(), "No grid table. Trying paragraphs.");

			return self.place_near_paragraph(doc_id, &structure, slot, content).await;
		};
		let Some(index) = best_row(table, slot, self.slot_minutes) else {
			return self.create_row(doc_id, ordinal, table, slot, content).await;
		};
		let row = &table.rows[index];
		let label = row.cells[0].text();
		let mut batch = OpBatch::new();

		write_second_cell(row, content, &mut batch);

		match self.store.mutate(doc_id, batch.into_ops()).await {
			Ok(()) => {
				tracing::debug!(row = index, label = %label, "Wrote into existing row.");

				Ok(Placement::ExistingRow { row: index, label })
			},
			Err(err) => {
				tracing::warn!(error = %err, label = %label, "Row write rejected. Appending.");

				self.append(doc_id, content).await
			},
		}
	}

	/// Appends `content` as a new paragraph at the end of the document.
	pub async fn append(&self, doc_id: &DocumentId, content: &str) -> Result<Placement> {
		let structure = self.store.structure(doc_id).await?;
		let op = match structure.elements.last() {
			Some(Element::Paragraph(last)) =>
				Op::InsertText { offset: last.text_end(), text: format!("\n{content}") },
			_ => Op::InsertText { offset: structure.end(), text: content.to_string() },
		};

		self.store.mutate(doc_id, vec![op]).await?;

		Ok(Placement::Appended)
	}

	/// Adds `content` as the last paragraph of the first section headed by one of `headings`.
	///
	/// A section runs until a table or a paragraph matching any of `all_headings`. A blank
	/// trailing paragraph is filled instead of adding a new one.
	pub async fn place_under_heading(
		&self,
		doc_id: &DocumentId,
		headings: &[String],
		all_headings: &[String],
		content: &str,
	) -> Result<Placement> {
		let structure = self.store.structure(doc_id).await?;
		let Some((heading, last)) = section_tail(&structure, headings, all_headings) else {
			tracing::debug!(?headings, "Section heading missing. Appending.");

			return self.append(doc_id, content).await;
		};
		let op = if !last.is_heading && last.paragraph.text.trim().is_empty() {
			Op::InsertText { offset: last.paragraph.start, text: content.to_string() }
		} else {
			Op::InsertText { offset: last.paragraph.text_end(), text: format!("\n{content}") }
		};

		match self.store.mutate(doc_id, vec![op]).await {
			Ok(()) => Ok(Placement::Section { heading }),
			Err(err) => {
				tracing::warn!(
					error = %err,
					heading = %heading,
					"Section write rejected. Appending."
				);

				self.append(doc_id, content).await
			},
		}
	}

	async fn create_row(
		&self,
		doc_id: &DocumentId,
		ordinal: usize,
		table: &Table,
		slot: SlotRange,
		content: &str,
	) -> Result<Placement> {
		let row_index = insertion_index(table, slot, self.slot_minutes);
		let label = slot.label();
		let insert = Op::InsertTableRow { table_start: table.start, row_index };

		if let Err(err) = self.store.mutate(doc_id, vec![insert]).await {
			tracing::warn!(error = %err, label = %label, "Row creation rejected. Appending.");

			return self.append(doc_id, content).await;
		}

		let structure = self.store.structure(doc_id).await?;
		let Some(row) = structure
			.table(ordinal)
			.and_then(|table| table.rows.get(row_index))
			.filter(|row| row.cells.len() >= 2)
		else {
			tracing::warn!(label = %label, "Created row is missing after re-read. Appending.");

			return self.append(doc_id, content).await;
		};
		let mut batch = OpBatch::new();

		batch.insert_text(row.cells[0].content_start(), label.as_str());
		write_second_cell(row, content, &mut batch);

		match self.store.mutate(doc_id, batch.into_ops()).await {
			Ok(()) => {
				tracing::debug!(row = row_index, label = %label, "Created row.");

				Ok(Placement::CreatedRow { row: row_index, label })
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					label = %label,
					"Created row write rejected. Appending."
				);

				self.append(doc_id, content).await
			},
		}
	}

	async fn place_near_paragraph(
		&self,
		doc_id: &DocumentId,
		structure: &Structure,
		slot: SlotRange,
		content: &str,
	) -> Result<Placement> {
		let Some(paragraph) = structure
			.paragraphs()
			.find(|paragraph| names_slot(&paragraph.text, slot, self.slot_minutes))
		else {
			return self.append(doc_id, content).await;
		};
		let op = Op::InsertText { offset: paragraph.text_end(), text: format!("\n{content}") };
		let after = paragraph.text.trim().to_string();

		match self.store.mutate(doc_id, vec![op]).await {
			Ok(()) => Ok(Placement::Paragraph { after }),
			Err(err) => {
				tracing::warn!(error = %err, "Paragraph write rejected. Appending.");

				self.append(doc_id, content).await
			},
		}
	}
}

struct SectionTail<'s> {
	paragraph: &'s Paragraph,
	is_heading: bool,
}

/// The first table that has at least two columns and a row label that reads as a time range.
fn find_grid(structure: &Structure, slot_minutes: u16) -> Option<(usize, &Table)> {
	structure.tables().find(|(_, table)| {
		table.columns() >= 2 && table.rows.iter().any(|row| row_range(row, slot_minutes).is_some())
	})
}

fn row_range(row: &TableRow, slot_minutes: u16) -> Option<SlotRange> {
	let label = row.cells.first()?.text();

	SlotRange::parse_label_with_width(label.trim(), slot_minutes)
}

/// Picks the row for `slot`: exact label first, then the narrowest range, then the closest start.
fn best_row(table: &Table, slot: SlotRange, slot_minutes: u16) -> Option<usize> {
	let target_key = label_key(&slot.label());
	let target = slot.start_minute();

	table
		.rows
		.iter()
		.enumerate()
		.filter(|(_, row)| row.cells.len() >= 2)
		.filter_map(|(index, row)| {
			let range = row_range(row, slot_minutes)?;
			let exact = label_key(&row.cells[0].text()) == target_key;

			(exact || range.contains(target)).then_some(Candidate { index, exact, range })
		})
		.min_by_key(|candidate| {
			(
				!candidate.exact,
				candidate.range.width(),
				candidate.range.start_minute().abs_diff(target),
				candidate.index,
			)
		})
		.map(|candidate| candidate.index)
}

/// Row position that keeps starts non-decreasing: just after the last row starting earlier.
fn insertion_index(table: &Table, slot: SlotRange, slot_minutes: u16) -> usize {
	let timed: Vec<(usize, SlotRange)> = table
		.rows
		.iter()
		.enumerate()
		.filter_map(|(index, row)| row_range(row, slot_minutes).map(|range| (index, range)))
		.collect();

	timed
		.iter()
		.filter(|(_, range)| range.start_minute() < slot.start_minute())
		.map(|(index, _)| index + 1)
		.max()
		.or_else(|| timed.first().map(|(index, _)| *index))
		.unwrap_or(table.rows.len())
}

fn write_second_cell(row: &TableRow, content: &str, batch: &mut OpBatch) {
	let Some(cell) = row.cells.get(1) else {
		return;
	};

	if cell.is_blank() {
		batch.insert_text(cell.content_start(), content);
	} else {
		batch.insert_text(cell.content_end(), format!("\n{content}"));
	}
}

fn names_slot(text: &str, slot: SlotRange, slot_minutes: u16) -> bool {
	let key = label_key(text);

	if key.is_empty() {
		return false;
	}
	if key == label_key(&slot.label())
		|| key.starts_with(&label_key(&format_clock(slot.start_minute())))
	{
		return true;
	}

	SlotRange::parse_label_with_width(text.trim(), slot_minutes)
		.is_some_and(|range| range.contains(slot.start_minute()))
}

fn heading_matches(text: &str, headings: &[String]) -> bool {
	let text = text.trim().trim_end_matches(':').trim();

	!text.is_empty() && headings.iter().any(|heading| heading.trim().eq_ignore_ascii_case(text))
}

fn section_tail<'s>(
	structure: &'s Structure,
	headings: &[String],
	all_headings: &[String],
) -> Option<(String, SectionTail<'s>)> {
	let start = structure.elements.iter().position(|element| match element {
		Element::Paragraph(paragraph) => heading_matches(&paragraph.text, headings),
		Element::Table(_) => false,
	})?;
	let Element::Paragraph(heading) = &structure.elements[start] else {
		return None;
	};
	let mut tail = SectionTail { paragraph: heading, is_heading: true };

	for element in &structure.elements[start + 1..] {
		match element {
			Element::Paragraph(paragraph) if !heading_matches(&paragraph.text, all_headings) =>
				tail = SectionTail { paragraph, is_heading: false },
			_ => break,
		}
	}

	Some((heading.text.trim().to_string(), tail))
}
