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
use crate::billing::tenancy::Tenancy;
use crate::error::{Error, Result};
use crate::util::date::Date;
use crate::util::quant::Quant;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Answers whether a tenancy already has an invoice for a period. The
/// generator needs a consistent snapshot of this for the whole batch.
pub trait InvoiceIndex {
	fn contains(&self, tenancy_id: &str, period: &Period) -> bool;
}

impl InvoiceIndex for HashSet<(String, Period)> {
	fn contains(&self, tenancy_id: &str, period: &Period) -> bool {
		self.contains(&(tenancy_id.to_string(), *period))
	}
}

/// Builds an index from invoices already on record.
pub fn index_of(invoices: &[Invoice]) -> HashSet<(String, Period)> {
	invoices
		.iter()
		.map(|i| (i.tenancy_id.clone(), i.period))
		.collect()
}

/// A tenancy that could not be billed, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct TenancyFailure {
	pub tenancy_id: String,
	pub error: Error,
}

#[derive(Debug, Default)]
pub struct GenerationOutcome {
	/// New invoices, in the order their tenancies were given
	pub created: Vec<Invoice>,
	/// Tenancies already invoiced for the period
	pub skipped: Vec<String>,
	pub failed: Vec<TenancyFailure>,
}

/// Produces each period's rent invoices.
#[derive(Clone, Debug)]
pub struct InvoiceGenerator {
	/// Day of the month rent falls due; clamped to short months
	due_day: u8,
}

impl InvoiceGenerator {
	pub fn new(due_day: u8) -> Result<Self> {
		if !(1..=31).contains(&due_day) {
			return Err(Error::InvariantViolation(format!(
				"due day must be between 1 and 31, got {}",
				due_day
			)));
		}
		Ok(Self { due_day })
	}

	/// The configured due day of the period, except in the lease's first
	/// month when the lease starts after that day: then rent is due on the
	/// lease-start date itself.
	pub fn due_date(&self, tenancy: &Tenancy, period: &Period) -> Date {
		let regular = period.day(self.due_day);

		if Period::of(&tenancy.lease_start) == *period
			&& tenancy.lease_start > regular
		{
			tenancy.lease_start
		} else {
			regular
		}
	}

	/// Creates one invoice per active tenancy for `period`. Tenancies that
	/// already have an invoice in `existing`, or that appear twice in the
	/// input, are skipped, so running this again for the same period adds
	/// nothing. A tenancy that cannot be billed is reported in `failed` and
	/// does not stop the rest of the batch.
	pub fn generate_monthly_invoices(
		&self,
		tenancies: &[Tenancy],
		period: &Period,
		existing: &impl InvoiceIndex,
		now: DateTime<Utc>,
	) -> GenerationOutcome {
		let mut outcome = GenerationOutcome::default();
		let mut seen: HashSet<&str> = HashSet::new();

		for tenancy in tenancies {
			if !tenancy.active {
				debug!(tenancy = %tenancy.id, "inactive, not billed");
				continue;
			}
			if Period::of(&tenancy.lease_start) > *period {
				debug!(
					tenancy = %tenancy.id,
					lease_start = %tenancy.lease_start,
					"lease starts after {}, not billed", period
				);
				continue;
			}

			if existing.contains(&tenancy.id, period)
				|| !seen.insert(tenancy.id.as_str())
			{
				debug!(tenancy = %tenancy.id, %period, "already invoiced");
				outcome.skipped.push(tenancy.id.clone());
				continue;
			}

			match self.build_invoice(tenancy, period, now) {
				Ok(invoice) => {
					debug!(invoice = %invoice.id, due = %invoice.due(), "invoice created");
					outcome.created.push(invoice);
				},
				Err(error) => {
					warn!(tenancy = %tenancy.id, %error, "tenancy not billed");
					outcome.failed.push(TenancyFailure {
						tenancy_id: tenancy.id.clone(),
						error,
					});
				},
			}
		}

		info!(
			%period,
			created = outcome.created.len(),
			skipped = outcome.skipped.len(),
			failed = outcome.failed.len(),
			"monthly invoice generation finished"
		);

		outcome
	}

	fn build_invoice(
		&self,
		tenancy: &Tenancy,
		period: &Period,
		now: DateTime<Utc>,
	) -> Result<Invoice> {
		let rent = tenancy.rent.ok_or_else(|| Error::IncompleteTenancy {
			tenancy_id: tenancy.id.clone(),
			field: "rent",
		})?;

		let currency = tenancy
			.currency
			.as_deref()
			.map(str::trim)
			.filter(|c| !c.is_empty())
			.ok_or_else(|| Error::IncompleteTenancy {
				tenancy_id: tenancy.id.clone(),
				field: "currency",
			})?;

		if !rent.is_positive() {
			return Err(Error::InvalidAmount(format!(
				"rent for tenancy {} must be positive, got {}",
				tenancy.id, rent
			)));
		}

		Ok(Invoice {
			id: Invoice::id_for(&tenancy.id, period),
			tenancy_id: tenancy.id.clone(),
			rental_unit_id: tenancy.rental_unit_id.clone(),
			tenant_id: tenancy.tenant_id.clone(),
			period: *period,
			due_amount: rent,
			currency_code: currency.to_string(),
			amount_paid: Quant::new(0, rent.render_precision()),
			status: InvoiceStatus::Pending,
			due_date: self.due_date(tenancy, period),
			created_at: now,
			paid_at: None,
			version: 0,
		})
	}
}
