/* Copyright © 2024-2025 Adam Train <adam@trainrelay.net>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */
use std::fmt::Write;

/// Standard table printer for those reports, such as invoice listings, that
/// report a potentially large number of single-line objects.
pub struct Table {
	column_count: usize,
	rows: Vec<Row>,
	right_align: Vec<bool>, // indicates columns by index
}

pub enum Row {
	Header(Vec<String>),
	Data(Vec<String>),
	Separator,
	PartialSeparator(Vec<bool>), // indicates columns by index
}

impl Table {
	pub fn new(column_count: usize) -> Self {
		Self {
			column_count,
			rows: Vec::new(),
			right_align: vec![false; column_count],
		}
	}

	/// Adds a header row.
	pub fn add_header(&mut self, row: Vec<&str>) {
		self.rows.push(Row::Header(
			row.into_iter().map(|s| s.to_string()).collect(),
		));
	}

	/// Adds a data row.
	pub fn add_row(&mut self, row: Vec<&str>) {
		self.rows
			.push(Row::Data(row.into_iter().map(|s| s.to_string()).collect()));
	}

	/// Adds a full separator row.
	pub fn add_separator(&mut self) {
		self.rows.push(Row::Separator);
	}

	/// Adds a partial separator row for selected columns.
	pub fn add_partial_separator(&mut self, indices: Vec<usize>) {
		let mut cols = vec![false; self.column_count];
		for i in indices {
			cols[i] = true;
		}
		self.rows.push(Row::PartialSeparator(cols));
	}

	/// Specifies columns that should be right-aligned by index.
	pub fn right_align(&mut self, cols: Vec<usize>) {
		for col in cols {
			self.right_align[col] = true;
		}
	}

	/// Lays the table out as text, one line per row. Lines carry no
	/// trailing padding beyond what alignment requires.
	pub fn render(&self) -> String {
		let mut max_widths = vec![0; self.column_count];

		// Calculate maximum column widths for proper spacing
		for row in &self.rows {
			if let Row::Data(data_row) | Row::Header(data_row) = row {
				for (i, value) in data_row.iter().enumerate() {
					max_widths[i] = max_widths[i].max(value.chars().count());
				}
			}
		}

		let mut out = String::new();
		for row in &self.rows {
			let line = match row {
				Row::Header(header_row) => {
					self.centered_row(&max_widths, header_row, " | ")
				},
				Row::Data(data_row) => self.data_row(&max_widths, data_row, "   "),
				Row::Separator => self.separator(&max_widths),
				Row::PartialSeparator(data_sep) => {
					self.partial_separator(&max_widths, data_sep)
				},
			};
			out.push_str(line.trim_end());
			out.push('\n');
		}
		out
	}

	fn data_row(
		&self,
		max_widths: &[usize],
		data_row: &[String],
		separator: &str,
	) -> String {
		let mut line = String::new();
		for (i, value) in data_row.iter().enumerate() {
			// Writing to a String cannot fail
			let _ = if self.right_align[i] {
				write!(line, "{:>width$}", value, width = max_widths[i])
			} else {
				write!(line, "{:<width$}", value, width = max_widths[i])
			};
			if i < data_row.len() - 1 {
				line.push_str(separator);
			}
		}
		line
	}

	fn centered_row(
		&self,
		max_widths: &[usize],
		data_row: &[String],
		separator: &str,
	) -> String {
		let mut line = String::new();
		for (i, value) in data_row.iter().enumerate() {
			line.push_str(&Table::center_align(value, max_widths[i]));
			if i < data_row.len() - 1 {
				line.push_str(separator);
			}
		}
		line
	}

	fn separator(&self, max_widths: &[usize]) -> String {
		let total_width: usize =
			max_widths.iter().sum::<usize>() + (3 * (self.column_count - 1));
		"-".repeat(total_width)
	}

	fn partial_separator(&self, max_widths: &[usize], data_sep: &[bool]) -> String {
		let mut line = String::new();
		for (i, draw) in data_sep.iter().enumerate() {
			let fill = if *draw { "-" } else { " " };
			line.push_str(&fill.repeat(max_widths[i]));
			if i < data_sep.len() - 1 {
				line.push_str("   "); // Spacing between columns
			}
		}
		line
	}

	fn center_align(value: &str, width: usize) -> String {
		let len = value.chars().count();
		if len >= width {
			return value.to_string();
		}
		let total_padding = width - len;
		let left_padding = total_padding / 2;
		let right_padding = total_padding - left_padding;

		format!(
			"{}{}{}",
			" ".repeat(left_padding),
			value,
			" ".repeat(right_padding)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_render_alignment() {
		let mut table = Table::new(2);
		table.add_header(vec!["Invoice", "Due"]);
		table.add_separator();
		table.add_row(vec!["INV-1", "1,000.00"]);
		table.add_row(vec!["INV-22", "5.00"]);
		table.add_partial_separator(vec![1]);
		table.add_row(vec!["", "1,005.00"]);
		table.right_align(vec![1]);

		assert_eq!(
			table.render(),
			concat!(
				"Invoice |   Due\n",
				"------------------\n",
				"INV-1     1,000.00\n",
				"INV-22        5.00\n",
				"          --------\n",
				"          1,005.00\n",
			)
		);
	}
}
