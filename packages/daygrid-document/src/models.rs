use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);
impl DocumentId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// One paragraph. `text` excludes the terminating newline, `end` includes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Paragraph {
	pub text: String,
	pub start: usize,
	pub end: usize,
}
impl Paragraph {
	/// Offset of the terminating newline; inserting here appends to the paragraph.
	pub fn text_end(&self) -> usize {
		self.end.saturating_sub(1)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableCell {
	pub start: usize,
	pub end: usize,
	pub paragraphs: Vec<Paragraph>,
}
impl TableCell {
	pub fn text(&self) -> String {
		self.paragraphs.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n")
	}

	pub fn is_blank(&self) -> bool {
		self.paragraphs.iter().all(|p| p.text.trim().is_empty())
	}

	/// First writable offset inside the cell.
	pub fn content_start(&self) -> usize {
		self.paragraphs.first().map(|p| p.start).unwrap_or(self.start + 1)
	}

	/// Offset that appends to the cell's last paragraph.
	pub fn content_end(&self) -> usize {
		self.paragraphs.last().map(Paragraph::text_end).unwrap_or(self.start + 1)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableRow {
	pub start: usize,
	pub end: usize,
	pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Table {
	pub start: usize,
	pub end: usize,
	pub rows: Vec<TableRow>,
}
impl Table {
	pub fn columns(&self) -> usize {
		self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
	Paragraph(Paragraph),
	Table(Table),
}

/// A point-in-time read of a document. Stale as soon as anyone mutates the document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Structure {
	pub elements: Vec<Element>,
}
impl Structure {
	/// Tables with their ordinal among tables, in document order.
	pub fn tables(&self) -> impl Iterator<Item = (usize, &Table)> {
		self.elements
			.iter()
			.filter_map(|element| match element {
				Element::Table(table) => Some(table),
				Element::Paragraph(_) => None,
			})
			.enumerate()
	}

	pub fn table(&self, ordinal: usize) -> Option<&Table> {
		self.tables().nth(ordinal).map(|(_, table)| table)
	}

	/// Top-level paragraphs only; text inside table cells is not included.
	pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
		self.elements.iter().filter_map(|element| match element {
			Element::Paragraph(paragraph) => Some(paragraph),
			Element::Table(_) => None,
		})
	}

	/// Every paragraph, including those inside table cells, in document order.
	pub fn all_paragraphs(&self) -> Vec<&Paragraph> {
		let mut out = Vec::new();

		for element in &self.elements {
			match element {
				Element::Paragraph(paragraph) => out.push(paragraph),
				Element::Table(table) =>
					for row in &table.rows {
						for cell in &row.cells {
							out.extend(cell.paragraphs.iter());
						}
					},
			}
		}

		out
	}

	/// Offset just past the last element.
	pub fn end(&self) -> usize {
		self.elements
			.last()
			.map(|element| match element {
				Element::Paragraph(paragraph) => paragraph.end,
				Element::Table(table) => table.end,
			})
			.unwrap_or(0)
	}

	/// The full text, one line per paragraph.
	pub fn plain_text(&self) -> String {
		self.all_paragraphs().iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n")
	}
}
