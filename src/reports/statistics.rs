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
use crate::billing::invoice::{Invoice, InvoiceStatus};
use crate::billing::period::Period;
use crate::currency::normalizer;
use crate::currency::rate_table::RateTable;
use crate::error::Result;
use crate::util::quant::Quant;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// An invoice left out of the totals, with the error code explaining why.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregationError {
	pub invoice_id: String,
	pub reason: String,
}

/// Invoice figures over a window of billing periods, with money summed in
/// the base currency.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statistics {
	pub window_start: Period,
	pub window_end: Period,
	pub base_currency: String,
	pub total_due_base: Quant,
	pub total_paid_base: Quant,
	pub count_by_status: BTreeMap<InvoiceStatus, usize>,
	pub count_by_currency: BTreeMap<String, usize>,
	pub errors: Vec<AggregationError>,
}

impl Statistics {
	pub fn invoice_count(&self) -> usize {
		self.count_by_status.values().sum()
	}

	pub fn total_outstanding_base(&self) -> Quant {
		self.total_due_base - self.total_paid_base
	}
}

/// Aggregates every invoice whose period falls in `[start, end]`. Every such
/// invoice is counted. An invoice whose currency cannot be converted stays
/// out of the totals and is listed in `errors` instead.
pub fn aggregate<'a>(
	invoices: impl IntoIterator<Item = &'a Invoice>,
	start: &Period,
	end: &Period,
	table: &RateTable,
) -> Result<Statistics> {
	let base = table.base().to_string();
	let places = table.minor_units(&base)?;

	let mut stats = Statistics {
		window_start: *start,
		window_end: *end,
		base_currency: base,
		total_due_base: Quant::zero(),
		total_paid_base: Quant::zero(),
		count_by_status: BTreeMap::new(),
		count_by_currency: BTreeMap::new(),
		errors: Vec::new(),
	};

	for invoice in invoices
		.into_iter()
		.filter(|i| i.period >= *start && i.period <= *end)
	{
		*stats.count_by_status.entry(invoice.status).or_default() += 1;
		*stats
			.count_by_currency
			.entry(invoice.currency_code.clone())
			.or_default() += 1;

		let normalized = normalizer::to_base(
			&invoice.due_amount,
			&invoice.currency_code,
			table,
		)
		.and_then(|due| {
			normalizer::to_base(&invoice.amount_paid, &invoice.currency_code, table)
				.map(|paid| (due, paid))
		});

		match normalized {
			Ok((due, paid)) => {
				stats.total_due_base += due;
				stats.total_paid_base += paid;
			},
			Err(e) => {
				warn!(invoice = %invoice.id, error = %e, "left out of totals");
				stats.errors.push(AggregationError {
					invoice_id: invoice.id.clone(),
					reason: e.code().to_string(),
				});
			},
		}
	}

	stats.total_due_base = stats.total_due_base.rounded(places);
	stats.total_paid_base = stats.total_paid_base.rounded(places);

	debug!(
		invoices = stats.invoice_count(),
		errors = stats.errors.len(),
		"aggregated {} to {}", start, end
	);

	Ok(stats)
}
