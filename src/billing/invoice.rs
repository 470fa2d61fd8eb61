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
use crate::billing::period::Period;
use crate::util::amount::Amount;
use crate::util::date::Date;
use crate::util::quant::Quant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
	Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
	/// Nothing paid yet and not past due
	Pending,
	/// Something paid, less than due, not past due
	PartiallyPaid,
	/// Paid in full, or marked paid by hand. Terminal.
	Paid,
	/// Past due and underpaid
	Overdue,
}

impl InvoiceStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			InvoiceStatus::Pending => "PENDING",
			InvoiceStatus::PartiallyPaid => "PARTIALLY_PAID",
			InvoiceStatus::Paid => "PAID",
			InvoiceStatus::Overdue => "OVERDUE",
		}
	}
}

impl fmt::Display for InvoiceStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// One billing period's rent obligation for one tenancy.
///
/// Created by the generator and afterwards changed only by the payment
/// ledger. `created_at` never changes once set; `version` is bumped by the
/// store on every update so stale writers can be caught.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
	pub id: String,
	pub tenancy_id: String,
	pub rental_unit_id: String,
	pub tenant_id: String,
	pub period: Period,
	pub due_amount: Quant,
	pub currency_code: String,
	pub amount_paid: Quant,
	pub status: InvoiceStatus,
	pub due_date: Date,
	pub created_at: DateTime<Utc>,
	pub paid_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub version: u64,
}

impl Invoice {
	/// Invoice ids are derived from what makes an invoice unique, so the
	/// same tenancy and period always produce the same id.
	pub fn id_for(tenancy_id: &str, period: &Period) -> String {
		format!("INV-{}-{}", period.compact(), tenancy_id)
	}

	pub fn due(&self) -> Amount {
		Amount::new(self.due_amount, &self.currency_code)
	}

	pub fn paid(&self) -> Amount {
		Amount::new(self.amount_paid, &self.currency_code)
	}

	/// What is still owed; zero once settled, never negative.
	pub fn outstanding(&self) -> Quant {
		if self.is_settled() {
			Quant::new(0, self.due_amount.render_precision())
		} else {
			self.due_amount - self.amount_paid
		}
	}

	pub fn is_settled(&self) -> bool {
		self.amount_paid >= self.due_amount
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn invoice(due: &str, paid: &str) -> Invoice {
		let period = Period::from_str("2024-06").unwrap();
		Invoice {
			id: Invoice::id_for("T-1", &period),
			tenancy_id: "T-1".to_string(),
			rental_unit_id: "U-101".to_string(),
			tenant_id: "P-1".to_string(),
			period,
			due_amount: Quant::from_str(due).unwrap(),
			currency_code: "MVR".to_string(),
			amount_paid: Quant::from_str(paid).unwrap(),
			status: InvoiceStatus::Pending,
			due_date: period.day(1),
			created_at: DateTime::from_timestamp(1_717_200_000, 0).unwrap(),
			paid_at: None,
			version: 0,
		}
	}

	#[test]
	fn test_id_is_deterministic() {
		let inv = invoice("1000", "0");
		assert_eq!(inv.id, "INV-202406-T-1");
	}

	#[test]
	fn test_outstanding() {
		assert_eq!(invoice("1000", "400").outstanding(), Quant::from_i128(600));
		assert_eq!(invoice("1000", "1000").outstanding(), Quant::zero());
		assert!(invoice("1000", "1000").is_settled());
		assert!(!invoice("1000", "999.99").is_settled());
		assert_eq!(invoice("1000", "400").due().to_string(), "1,000 MVR");
	}

	#[test]
	fn test_json_field_names() {
		let json = serde_json::to_value(invoice("1000", "0")).unwrap();
		assert_eq!(json["status"], "PENDING");
		assert_eq!(json["period"], "2024-06");
		assert_eq!(json["due_amount"], "1000");
		assert_eq!(json["currency_code"], "MVR");
		assert_eq!(json["due_date"], "2024-06-01");
		assert!(json["paid_at"].is_null());

		let back: Invoice = serde_json::from_value(json).unwrap();
		assert_eq!(back, invoice("1000", "0"));
	}
}
