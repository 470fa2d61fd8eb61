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
use crate::currency::rate_table::RateTable;
use crate::reports::table::Table;

pub struct RateReporter<'a> {
	table: &'a RateTable,
}

impl<'a> RateReporter<'a> {
	pub fn new(table: &'a RateTable) -> RateReporter<'a> {
		Self { table }
	}

	pub fn render(&self) -> String {
		let base = self.table.base();
		let mut table = Table::new(3);

		table.add_header(vec!["Currency", &format!("Rate ({})", base), "Places"]);
		table.add_separator();

		for entry in self.table.entries() {
			let code = if entry.code == base {
				format!("{} *", entry.code)
			} else {
				entry.code.clone()
			};

			table.add_row(vec![
				&code,
				&entry.rate.to_string(),
				&entry.minor_units.to_string(),
			]);
		}

		table.right_align(vec![1, 2]);
		table.render()
	}

	pub fn print_all_rates(&self) {
		println!();
		print!("{}", self.render());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::currency::rate_table::RateEntry;
	use crate::util::quant::Quant;

	#[test]
	fn test_render() {
		let rates = RateTable::new(
			"MVR",
			vec![
				RateEntry::new("USD", Quant::from_str("15.42").unwrap(), 2),
				RateEntry::new("JPY", Quant::from_str("0.1031").unwrap(), 0),
			],
		)
		.unwrap();

		let rendered = RateReporter::new(&rates).render();
		let lines: Vec<&str> = rendered.lines().collect();
		assert_eq!(lines.len(), 5);
		assert!(lines[0].starts_with("Currency | Rate (MVR) | Places"));
		assert!(lines[2].starts_with("JPY") && lines[2].contains("0.1031"));
		assert!(lines[3].starts_with("MVR *"));
		assert!(lines[4].starts_with("USD") && lines[4].ends_with("2"));
	}
}
