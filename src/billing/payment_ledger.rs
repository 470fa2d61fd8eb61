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
use crate::currency::normalizer;
use crate::currency::rate_table::RateTable;
use crate::error::{Error, Result};
use crate::util::date::Date;
use crate::util::quant::Quant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A payment received against an invoice. Postings are events: the ledger
/// folds them into the invoice and does not keep them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Posting {
	pub invoice_id: String,
	pub amount: Quant,
	pub currency: String,
	pub timestamp: DateTime<Utc>,
}

/// Applies payments and status changes to invoices. Every operation takes
/// the invoice by reference and hands back an updated copy, so on failure
/// the caller still holds the invoice exactly as it was.
#[derive(Clone, Debug, Default)]
pub struct PaymentLedger {
	/// How far above the due amount the paid total may go
	tolerance: Quant,
}

impl PaymentLedger {
	pub fn new(tolerance: Quant) -> Result<Self> {
		if tolerance.is_negative() {
			return Err(Error::InvariantViolation(format!(
				"overpayment tolerance cannot be negative, got {}",
				tolerance
			)));
		}
		Ok(Self { tolerance })
	}

	/// Adds a posting to the invoice's paid total and recomputes its status.
	/// A posting in another currency is only accepted when a rate table is
	/// given, in which case it is converted into the invoice currency first.
	pub fn apply_payment(
		&self,
		invoice: &Invoice,
		posting: &Posting,
		conversion: Option<&RateTable>,
	) -> Result<Invoice> {
		if posting.invoice_id != invoice.id {
			return Err(Error::InvariantViolation(format!(
				"posting for {} applied to invoice {}",
				posting.invoice_id, invoice.id
			)));
		}

		if !posting.amount.is_positive() {
			return Err(Error::InvalidAmount(format!(
				"payment must be positive, got {}",
				posting.amount
			)));
		}

		let amount = if posting.currency == invoice.currency_code {
			posting.amount
		} else {
			let table = conversion.ok_or_else(|| Error::CurrencyMismatch {
				expected: invoice.currency_code.clone(),
				found: posting.currency.clone(),
			})?;

			let converted = normalizer::convert(
				&posting.amount,
				&posting.currency,
				&invoice.currency_code,
				table,
			)?;
			debug!(
				invoice = %invoice.id,
				"converted {} {} to {} {}",
				posting.amount, posting.currency, converted, invoice.currency_code
			);

			if converted.is_zero() {
				return Err(Error::InvalidAmount(format!(
					"{} {} is worth nothing in {}",
					posting.amount, posting.currency, invoice.currency_code
				)));
			}
			converted
		};

		let paid = invoice.amount_paid + amount;
		if paid > invoice.due_amount + self.tolerance {
			return Err(Error::Overpayment {
				due: invoice.due_amount,
				paid: invoice.amount_paid,
				posting: amount,
			});
		}

		let mut updated = invoice.clone();
		updated.amount_paid = paid;

		if invoice.status == InvoiceStatus::Paid {
			// Settled invoices keep their original settlement time
		} else if updated.is_settled() {
			updated.status = InvoiceStatus::Paid;
			updated.paid_at = Some(posting.timestamp);
		} else if invoice.status == InvoiceStatus::Overdue {
			updated.status = InvoiceStatus::Overdue;
		} else {
			updated.status = InvoiceStatus::PartiallyPaid;
		}

		debug!(
			invoice = %invoice.id,
			paid = %updated.paid(),
			status = %updated.status,
			"payment applied"
		);

		Ok(updated)
	}

	/// Settles the invoice in full regardless of what was received.
	pub fn mark_paid(&self, invoice: &Invoice, at: DateTime<Utc>) -> Invoice {
		if invoice.status == InvoiceStatus::Paid {
			return invoice.clone();
		}

		let mut updated = invoice.clone();
		updated.amount_paid = invoice.due_amount;
		updated.status = InvoiceStatus::Paid;
		updated.paid_at = Some(at);
		updated
	}

	/// Flags an open invoice as overdue once `now` is past its due date.
	pub fn recheck_overdue(&self, invoice: &Invoice, now: DateTime<Utc>) -> Invoice {
		let open = matches!(
			invoice.status,
			InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid
		);
		let today = Date::from_naive(now.date_naive());

		let mut updated = invoice.clone();
		if open && today > invoice.due_date && !invoice.is_settled() {
			updated.status = InvoiceStatus::Overdue;
		}
		updated
	}
}
