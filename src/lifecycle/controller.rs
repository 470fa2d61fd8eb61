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
use crate::billing::generator::{index_of, InvoiceGenerator, TenancyFailure};
use crate::billing::invoice::Invoice;
use crate::billing::payment_ledger::{PaymentLedger, Posting};
use crate::billing::period::Period;
use crate::currency::rate_table::RateTable;
use crate::error::Error;
use crate::lifecycle::response::{
	BoundaryError, FailureSummary, GenerationReport, InvoiceSummary,
};
use crate::reports::statistics::{self, Statistics};
use crate::storage::{InvoiceStore, RateSource, TenancySource};
use crate::util::date::Date;
use crate::util::quant::Quant;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

type Response<T> = Result<T, BoundaryError>;

/// Entry point for everything outside the core. Loads what each operation
/// needs through the collaborators, runs the billing components, saves the
/// results and commits the store once per mutating call.
pub struct InvoiceController<S, T, R>
where
	S: InvoiceStore,
	T: TenancySource,
	R: RateSource,
{
	store: S,
	tenancies: T,
	rates: R,
	generator: InvoiceGenerator,
	ledger: PaymentLedger,
}

impl<S, T, R> InvoiceController<S, T, R>
where
	S: InvoiceStore,
	T: TenancySource,
	R: RateSource,
{
	pub fn new(
		store: S,
		tenancies: T,
		rates: R,
		generator: InvoiceGenerator,
		ledger: PaymentLedger,
	) -> Self {
		Self {
			store,
			tenancies,
			rates,
			generator,
			ledger,
		}
	}

	pub fn rate_table(&self) -> Response<RateTable> {
		Ok(self.rates.rate_table()?)
	}

	/// Invoices every billable tenancy for `period`. Tenancies that cannot
	/// be billed are reported, not fatal; only a storage failure aborts.
	pub fn generate_monthly(
		&mut self,
		period: &Period,
		now: DateTime<Utc>,
	) -> Response<GenerationReport> {
		let tenancies = self.tenancies.active_tenancies(&period.last_day())?;
		let existing = index_of(&self.store.scan(period, period)?);

		let outcome = self.generator.generate_monthly_invoices(
			&tenancies, period, &existing, now,
		);

		let mut created = Vec::with_capacity(outcome.created.len());
		let mut skipped = outcome.skipped;
		let mut failed: Vec<FailureSummary> =
			outcome.failed.iter().map(FailureSummary::from).collect();

		for invoice in outcome.created {
			if self.store.find_by_period(&invoice.tenancy_id, period)?.is_some() {
				skipped.push(invoice.tenancy_id);
				continue;
			}

			match self.store.insert(invoice.clone()) {
				Ok(()) => created.push(InvoiceSummary::from(&invoice)),
				// Someone else billed this tenancy since we looked
				Err(Error::DuplicateInvoice { .. }) => {
					skipped.push(invoice.tenancy_id);
				},
				Err(e) if !e.is_fatal() => {
					failed.push(FailureSummary::from(&TenancyFailure {
						tenancy_id: invoice.tenancy_id,
						error: e,
					}));
				},
				Err(e) => return Err(e.into()),
			}
		}

		self.store.commit()?;

		info!(
			%period,
			created = created.len(),
			skipped = skipped.len(),
			failed = failed.len(),
			"generated invoices"
		);

		Ok(GenerationReport {
			period: *period,
			created,
			skipped,
			failed,
		})
	}

	/// Applies a payment. With `convert` set, a payment in another currency
	/// is converted at the current rates; without it, it is rejected.
	pub fn record_payment(
		&mut self,
		invoice_id: &str,
		amount: Quant,
		currency: &str,
		timestamp: DateTime<Utc>,
		convert: bool,
	) -> Response<InvoiceSummary> {
		let invoice = self.load(invoice_id)?;

		let table = if convert && currency != invoice.currency_code {
			Some(self.rates.rate_table()?)
		} else {
			None
		};

		let posting = Posting {
			invoice_id: invoice.id.clone(),
			amount,
			currency: currency.to_string(),
			timestamp,
		};

		let updated = self.ledger.apply_payment(&invoice, &posting, table.as_ref())?;
		let saved = self.store.update(updated)?;
		self.store.commit()?;

		info!(
			invoice = %saved.id,
			paid = %saved.paid(),
			status = %saved.status,
			"recorded payment of {} {}", amount, currency
		);
		Ok(InvoiceSummary::from(&saved))
	}

	pub fn mark_paid(
		&mut self,
		invoice_id: &str,
		at: DateTime<Utc>,
	) -> Response<InvoiceSummary> {
		let invoice = self.load(invoice_id)?;

		let updated = self.ledger.mark_paid(&invoice, at);
		if updated == invoice {
			debug!(invoice = %invoice.id, "already paid");
			return Ok(InvoiceSummary::from(&invoice));
		}

		let saved = self.store.update(updated)?;
		self.store.commit()?;

		info!(invoice = %saved.id, "marked paid");
		Ok(InvoiceSummary::from(&saved))
	}

	/// Moves every open invoice whose due date has passed to overdue and
	/// returns the ones that changed. Safe to run as often as wanted.
	pub fn recheck_overdue(
		&mut self,
		now: DateTime<Utc>,
	) -> Response<Vec<InvoiceSummary>> {
		let today = Date::from_naive(now.date_naive());
		let candidates = self.store.scan(&Period::min(), &Period::of(&today))?;

		let mut changed = Vec::new();
		for invoice in candidates {
			let rechecked = self.ledger.recheck_overdue(&invoice, now);
			if rechecked.status != invoice.status {
				let saved = self.store.update(rechecked)?;
				debug!(
					invoice = %saved.id,
					days_late = saved.due_date.until(&today).total_days(),
					"now overdue by {}", saved.due_date.until(&today)
				);
				changed.push(InvoiceSummary::from(&saved));
			}
		}

		self.store.commit()?;

		info!(overdue = changed.len(), "rechecked invoices as of {}", today);
		Ok(changed)
	}

	pub fn get_statistics(
		&self,
		start: &Period,
		end: &Period,
	) -> Response<Statistics> {
		let table = self.rates.rate_table()?;
		let invoices = self.store.scan(start, end)?;
		Ok(statistics::aggregate(&invoices, start, end, &table)?)
	}

	pub fn get_invoice(&self, invoice_id: &str) -> Response<InvoiceSummary> {
		Ok(InvoiceSummary::from(&self.load(invoice_id)?))
	}

	pub fn list_invoices(
		&self,
		start: &Period,
		end: &Period,
	) -> Response<Vec<InvoiceSummary>> {
		Ok(self
			.store
			.scan(start, end)?
			.iter()
			.map(InvoiceSummary::from)
			.collect())
	}

	fn load(&self, invoice_id: &str) -> Result<Invoice, Error> {
		self.store
			.get(invoice_id)?
			.ok_or_else(|| Error::NotFound(invoice_id.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::billing::invoice::InvoiceStatus;
	use crate::billing::tenancy::Tenancy;
	use crate::currency::rate_table::RateEntry;
	use crate::storage::json_store::JsonInvoiceStore;
	use std::collections::BTreeMap;

	type Controller = InvoiceController<JsonInvoiceStore, Vec<Tenancy>, RateTable>;

	fn at(timestamp: &str) -> DateTime<Utc> {
		DateTime::parse_from_rfc3339(timestamp)
			.unwrap()
			.with_timezone(&Utc)
	}

	fn q(s: &str) -> Quant {
		Quant::from_str(s).unwrap()
	}

	fn tenancy(id: &str, rent: Option<&str>, currency: &str) -> Tenancy {
		Tenancy {
			id: id.to_string(),
			rental_unit_id: format!("U-{}", id),
			tenant_id: format!("P-{}", id),
			rent: rent.map(q),
			currency: Some(currency.to_string()),
			lease_start: Date::from_str("2024-01-01").unwrap(),
			active: true,
		}
	}

	fn rates() -> RateTable {
		RateTable::new(
			"MVR",
			vec![
				RateEntry::new("MVR", Quant::from_i128(1), 2),
				RateEntry::new("USD", q("15.42"), 2),
			],
		)
		.unwrap()
	}

	fn tenancies() -> Vec<Tenancy> {
		vec![
			tenancy("T-1", Some("1000"), "MVR"),
			tenancy("T-2", Some("100"), "USD"),
			tenancy("T-3", None, "MVR"),
		]
	}

	fn controller() -> Controller {
		InvoiceController::new(
			JsonInvoiceStore::in_memory(),
			tenancies(),
			rates(),
			InvoiceGenerator::new(1).unwrap(),
			PaymentLedger::default(),
		)
	}

	/// A store whose scans come from an empty snapshot, as when another
	/// writer billed the period after we looked.
	struct BlindScan(JsonInvoiceStore);

	impl InvoiceStore for BlindScan {
		fn get(&self, id: &str) -> crate::error::Result<Option<Invoice>> {
			self.0.get(id)
		}

		fn find_by_period(
			&self,
			tenancy_id: &str,
			period: &Period,
		) -> crate::error::Result<Option<Invoice>> {
			self.0.find_by_period(tenancy_id, period)
		}

		fn insert(&mut self, invoice: Invoice) -> crate::error::Result<()> {
			self.0.insert(invoice)
		}

		fn update(&mut self, invoice: Invoice) -> crate::error::Result<Invoice> {
			self.0.update(invoice)
		}

		fn scan(&self, _: &Period, _: &Period) -> crate::error::Result<Vec<Invoice>> {
			Ok(Vec::new())
		}

		fn commit(&mut self) -> crate::error::Result<()> {
			self.0.commit()
		}
	}

	fn june() -> Period {
		Period::from_str("2024-06").unwrap()
	}

	#[test]
	fn test_generate_monthly() {
		let mut c = controller();
		let report = c.generate_monthly(&june(), at("2024-05-25T00:00:00Z")).unwrap();

		let ids: Vec<&str> = report.created.iter().map(|i| i.id.as_str()).collect();
		assert_eq!(ids, vec!["INV-202406-T-1", "INV-202406-T-2"]);
		assert!(report.skipped.is_empty());
		assert_eq!(report.failed.len(), 1);
		assert_eq!(report.failed[0].tenancy_id, "T-3");
		assert_eq!(report.failed[0].code, "INCOMPLETE_TENANCY");

		let again = c.generate_monthly(&june(), at("2024-05-26T00:00:00Z")).unwrap();
		assert!(again.created.is_empty());
		assert_eq!(again.skipped, vec!["T-1", "T-2"]);
		assert_eq!(c.list_invoices(&june(), &june()).unwrap().len(), 2);
	}

	#[test]
	fn test_payment_flow() {
		let mut c = controller();
		c.generate_monthly(&june(), at("2024-05-25T00:00:00Z")).unwrap();

		let partial = c
			.record_payment("INV-202406-T-1", q("400"), "MVR", at("2024-05-30T00:00:00Z"), false)
			.unwrap();
		assert_eq!(partial.status, InvoiceStatus::PartiallyPaid);
		assert_eq!(partial.outstanding, q("600"));

		let over = c
			.record_payment("INV-202406-T-1", q("601"), "MVR", at("2024-05-30T00:00:00Z"), false)
			.unwrap_err();
		assert_eq!((over.status, over.code.as_str()), (422, "OVERPAYMENT"));

		let full = c
			.record_payment("INV-202406-T-1", q("600"), "MVR", at("2024-05-31T00:00:00Z"), false)
			.unwrap();
		assert_eq!(full.status, InvoiceStatus::Paid);
		assert_eq!(full.amount_paid, q("1000"));
		assert_eq!(full.paid_at, Some(at("2024-05-31T00:00:00Z")));
	}

	#[test]
	fn test_converted_payment_requires_flag() {
		let mut c = controller();
		c.generate_monthly(&june(), at("2024-05-25T00:00:00Z")).unwrap();

		let mismatch = c
			.record_payment("INV-202406-T-1", q("10"), "USD", at("2024-05-30T00:00:00Z"), false)
			.unwrap_err();
		assert_eq!((mismatch.status, mismatch.code.as_str()), (422, "CURRENCY_MISMATCH"));

		let converted = c
			.record_payment("INV-202406-T-1", q("10"), "USD", at("2024-05-30T00:00:00Z"), true)
			.unwrap();
		assert_eq!(converted.amount_paid, q("154.20"));
	}

	#[test]
	fn test_unknown_invoice() {
		let mut c = controller();
		let err = c
			.record_payment("INV-202406-T-9", q("10"), "MVR", at("2024-05-30T00:00:00Z"), false)
			.unwrap_err();
		assert_eq!((err.status, err.code.as_str()), (404, "NOT_FOUND"));

		let err = c.mark_paid("INV-202406-T-9", at("2024-05-30T00:00:00Z")).unwrap_err();
		assert_eq!(err.status, 404);
		assert_eq!(c.get_invoice("INV-202406-T-9").unwrap_err().status, 404);
	}

	#[test]
	fn test_mark_paid_is_noop_when_paid() {
		let mut c = controller();
		c.generate_monthly(&june(), at("2024-05-25T00:00:00Z")).unwrap();

		let paid = c.mark_paid("INV-202406-T-2", at("2024-06-03T00:00:00Z")).unwrap();
		assert_eq!(paid.status, InvoiceStatus::Paid);
		assert_eq!(paid.amount_paid, q("100"));

		let again = c.mark_paid("INV-202406-T-2", at("2024-07-01T00:00:00Z")).unwrap();
		assert_eq!(again, paid);
	}

	#[test]
	fn test_recheck_overdue() {
		let mut c = controller();
		c.generate_monthly(&june(), at("2024-05-25T00:00:00Z")).unwrap();
		c.mark_paid("INV-202406-T-2", at("2024-05-30T00:00:00Z")).unwrap();
		let partial = c
			.record_payment("INV-202406-T-1", q("400"), "MVR", at("2024-05-30T00:00:00Z"), false)
			.unwrap();
		assert_eq!(partial.status, InvoiceStatus::PartiallyPaid);

		let changed = c.recheck_overdue(at("2024-06-15T00:00:00Z")).unwrap();
		let ids: Vec<&str> = changed.iter().map(|i| i.id.as_str()).collect();
		assert_eq!(ids, vec!["INV-202406-T-1"]);
		assert_eq!(changed[0].status, InvoiceStatus::Overdue);
		assert_eq!(changed[0].amount_paid, q("400"));
		assert_eq!(changed[0].outstanding, q("600"));

		assert!(c.recheck_overdue(at("2024-06-16T00:00:00Z")).unwrap().is_empty());
	}

	#[test]
	fn test_statistics() {
		let mut c = controller();
		c.generate_monthly(&june(), at("2024-05-25T00:00:00Z")).unwrap();
		c.mark_paid("INV-202406-T-1", at("2024-05-30T00:00:00Z")).unwrap();

		let stats = c.get_statistics(&june(), &june()).unwrap();
		assert_eq!(stats.total_due_base, q("2542"));
		assert_eq!(stats.total_paid_base, q("1000"));
		assert_eq!(
			stats.count_by_status,
			BTreeMap::from([(InvoiceStatus::Paid, 1), (InvoiceStatus::Pending, 1)])
		);
	}

	#[test]
	fn test_generate_skips_invoices_missed_by_scan() {
		let mut first = controller();
		first.generate_monthly(&june(), at("2024-05-25T00:00:00Z")).unwrap();

		let mut c = InvoiceController::new(
			BlindScan(first.store),
			tenancies(),
			rates(),
			InvoiceGenerator::new(1).unwrap(),
			PaymentLedger::default(),
		);

		let report = c.generate_monthly(&june(), at("2024-05-26T00:00:00Z")).unwrap();
		assert!(report.created.is_empty());
		assert_eq!(report.skipped, vec!["T-1", "T-2"]);
		assert_eq!(report.failed.len(), 1);
	}
}
