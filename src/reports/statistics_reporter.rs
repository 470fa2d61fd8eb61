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
use crate::reports::statistics::Statistics;
use crate::reports::table::Table;
use crate::util::amount::Amount;

pub struct StatisticsReporter<'a> {
	stats: &'a Statistics,
}

impl<'a> StatisticsReporter<'a> {
	pub fn new(stats: &'a Statistics) -> Self {
		Self { stats }
	}

	pub fn render(&self) -> String {
		let stats = self.stats;
		let base = &stats.base_currency;

		let mut out = format!(
			"Invoices for {} to {}, in {}\n\n",
			stats.window_start, stats.window_end, base
		);

		let mut totals = Table::new(2);
		totals.add_row(vec![
			"Due",
			&Amount::new(stats.total_due_base, base).to_string(),
		]);
		totals.add_row(vec![
			"Paid",
			&Amount::new(stats.total_paid_base, base).to_string(),
		]);
		totals.add_partial_separator(vec![1]);
		totals.add_row(vec![
			"Outstanding",
			&Amount::new(stats.total_outstanding_base(), base).to_string(),
		]);
		totals.right_align(vec![1]);
		out.push_str(&totals.render());

		let mut counts = Table::new(2);
		counts.add_header(vec!["Status", "Count"]);
		counts.add_separator();
		for (status, count) in &stats.count_by_status {
			counts.add_row(vec![status.as_str(), &count.to_string()]);
		}
		counts.add_separator();
		counts.add_row(vec!["Total", &stats.invoice_count().to_string()]);
		counts.right_align(vec![1]);
		out.push('\n');
		out.push_str(&counts.render());

		if !stats.count_by_currency.is_empty() {
			let mut currencies = Table::new(2);
			currencies.add_header(vec!["Currency", "Count"]);
			currencies.add_separator();
			for (currency, count) in &stats.count_by_currency {
				currencies.add_row(vec![currency, &count.to_string()]);
			}
			currencies.right_align(vec![1]);
			out.push('\n');
			out.push_str(&currencies.render());
		}

		if !stats.errors.is_empty() {
			out.push_str("\nLeft out of totals:\n");
			for error in &stats.errors {
				out.push_str(&format!("  {} ({})\n", error.invoice_id, error.reason));
			}
		}

		out
	}

	pub fn print(&self) {
		println!();
		print!("{}", self.render());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::billing::invoice::InvoiceStatus;
	use crate::billing::period::Period;
	use crate::reports::statistics::AggregationError;
	use crate::util::quant::Quant;
	use std::collections::BTreeMap;

	#[test]
	fn test_render() {
		let june = Period::from_str("2024-06").unwrap();
		let stats = Statistics {
			window_start: june,
			window_end: june,
			base_currency: "MVR".to_string(),
			total_due_base: Quant::from_str("2542.00").unwrap(),
			total_paid_base: Quant::from_str("1000.00").unwrap(),
			count_by_status: BTreeMap::from([
				(InvoiceStatus::Pending, 1),
				(InvoiceStatus::Paid, 1),
			]),
			count_by_currency: BTreeMap::from([
				("MVR".to_string(), 1),
				("USD".to_string(), 1),
			]),
			errors: vec![AggregationError {
				invoice_id: "INV-202406-T-3".to_string(),
				reason: "UNKNOWN_CURRENCY".to_string(),
			}],
		};

		let rendered = StatisticsReporter::new(&stats).render();
		assert!(rendered.starts_with("Invoices for 2024-06 to 2024-06, in MVR\n"));
		assert!(rendered.contains("Due           2,542.00 MVR\n"));
		assert!(rendered.contains("Outstanding   1,542.00 MVR\n"));
		assert!(rendered.contains("PENDING       1\n"));
		assert!(rendered.contains("INV-202406-T-3 (UNKNOWN_CURRENCY)"));
	}
}
