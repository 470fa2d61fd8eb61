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
use crate::billing::invoice::InvoiceStatus;
use crate::lifecycle::response::{GenerationReport, InvoiceSummary};
use crate::reports::table::Table;
use crate::util::amount::Amount;
use crate::util::date::Date;

/// Lists invoices, showing how late each unpaid one is as of a given day.
pub struct InvoiceReporter<'a> {
	invoices: &'a [InvoiceSummary],
	as_of: Date,
}

impl<'a> InvoiceReporter<'a> {
	pub fn new(invoices: &'a [InvoiceSummary], as_of: Date) -> Self {
		Self { invoices, as_of }
	}

	fn late(&self, invoice: &InvoiceSummary) -> String {
		if invoice.status == InvoiceStatus::Paid || invoice.due_date >= self.as_of {
			return String::new();
		}
		invoice.due_date.until(&self.as_of).to_string()
	}

	pub fn render(&self) -> String {
		if self.invoices.is_empty() {
			return "No invoices.\n".to_string();
		}

		let mut table = Table::new(8);
		table.add_header(vec![
			"Invoice", "Period", "Tenant", "Due on", "Due", "Paid", "Status", "Late",
		]);
		table.add_separator();

		for invoice in self.invoices {
			let due = Amount::new(invoice.due_amount, &invoice.currency_code);
			let paid = Amount::new(invoice.amount_paid, &invoice.currency_code);
			table.add_row(vec![
				&invoice.id,
				&invoice.period.to_string(),
				&invoice.tenant_id,
				&invoice.due_date.to_string(),
				&due.to_string(),
				&paid.to_string(),
				invoice.status.as_str(),
				&self.late(invoice),
			]);
		}

		table.right_align(vec![4, 5]);
		table.render()
	}

	pub fn print(&self) {
		println!();
		print!("{}", self.render());
	}
}

/// Human-readable outcome of a billing run.
pub fn render_generation(report: &GenerationReport, as_of: Date) -> String {
	let mut out = format!(
		"{}: {} created, {} skipped, {} failed\n",
		report.period,
		report.created.len(),
		report.skipped.len(),
		report.failed.len()
	);

	if !report.created.is_empty() {
		out.push('\n');
		out.push_str(&InvoiceReporter::new(&report.created, as_of).render());
	}

	if !report.failed.is_empty() {
		let mut table = Table::new(3);
		table.add_header(vec!["Tenancy", "Code", "Reason"]);
		table.add_separator();
		for failure in &report.failed {
			table.add_row(vec![&failure.tenancy_id, &failure.code, &failure.message]);
		}
		out.push('\n');
		out.push_str(&table.render());
	}

	out
}
