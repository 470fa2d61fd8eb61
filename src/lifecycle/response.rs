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
use crate::billing::generator::TenancyFailure;
use crate::billing::invoice::{Invoice, InvoiceStatus};
use crate::billing::period::Period;
use crate::error::Error;
use crate::util::date::Date;
use crate::util::quant::Quant;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

/// An invoice as handed to callers outside the core.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InvoiceSummary {
	pub id: String,
	pub tenancy_id: String,
	pub rental_unit_id: String,
	pub tenant_id: String,
	pub period: Period,
	pub due_amount: Quant,
	pub currency_code: String,
	pub amount_paid: Quant,
	pub outstanding: Quant,
	pub status: InvoiceStatus,
	pub due_date: Date,
	pub created_at: DateTime<Utc>,
	pub paid_at: Option<DateTime<Utc>>,
}

impl From<&Invoice> for InvoiceSummary {
	fn from(invoice: &Invoice) -> Self {
		Self {
			id: invoice.id.clone(),
			tenancy_id: invoice.tenancy_id.clone(),
			rental_unit_id: invoice.rental_unit_id.clone(),
			tenant_id: invoice.tenant_id.clone(),
			period: invoice.period,
			due_amount: invoice.due_amount,
			currency_code: invoice.currency_code.clone(),
			amount_paid: invoice.amount_paid,
			outstanding: invoice.outstanding(),
			status: invoice.status,
			due_date: invoice.due_date,
			created_at: invoice.created_at,
			paid_at: invoice.paid_at,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailureSummary {
	pub tenancy_id: String,
	pub code: String,
	pub message: String,
}

impl From<&TenancyFailure> for FailureSummary {
	fn from(failure: &TenancyFailure) -> Self {
		Self {
			tenancy_id: failure.tenancy_id.clone(),
			code: failure.error.code().to_string(),
			message: failure.error.to_string(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationReport {
	pub period: Period,
	pub created: Vec<InvoiceSummary>,
	pub skipped: Vec<String>,
	pub failed: Vec<FailureSummary>,
}

/// A core error translated for the outside world: a status number in HTTP
/// terms, a stable code, and a human-readable message.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Serialize)]
#[error("{code} ({status}): {message}")]
pub struct BoundaryError {
	pub status: u16,
	pub code: String,
	pub message: String,
}

impl From<Error> for BoundaryError {
	fn from(err: Error) -> Self {
		if err.is_fatal() {
			error!(code = err.code(), "{}", err);
		}

		Self {
			status: err.status(),
			code: err.code().to_string(),
			message: err.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_boundary_error() {
		let err: BoundaryError = Error::NotFound("INV-202406-T-1".to_string()).into();
		assert_eq!(err.status, 404);
		assert_eq!(err.code, "NOT_FOUND");
		assert_eq!(
			err.to_string(),
			"NOT_FOUND (404): Invoice not found: INV-202406-T-1"
		);

		let fatal: BoundaryError = Error::Storage("disk full".to_string()).into();
		assert_eq!(fatal.status, 500);
	}

	#[test]
	fn test_failure_summary() {
		let failure = TenancyFailure {
			tenancy_id: "T-2".to_string(),
			error: Error::IncompleteTenancy {
				tenancy_id: "T-2".to_string(),
				field: "currency",
			},
		};
		let summary = FailureSummary::from(&failure);
		assert_eq!(summary.code, "INCOMPLETE_TENANCY");
		assert_eq!(summary.message, "Tenancy T-2 cannot be billed: missing currency");
	}
}
