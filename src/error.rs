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
use crate::util::quant::Quant;
use thiserror::Error;

/// Everything the invoicing core can fail with. Collaborator failures
/// (storage, rate sources) are folded into the last two variants so that
/// callers only ever deal with this one type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
	#[error("Unknown currency: {0}")]
	UnknownCurrency(String),

	#[error("Currency mismatch: invoice is in {expected}, posting is in {found}")]
	CurrencyMismatch { expected: String, found: String },

	#[error("Invalid amount: {0}")]
	InvalidAmount(String),

	#[error("Overpayment: due={due}, already paid={paid}, posting={posting}")]
	Overpayment {
		due: Quant,
		paid: Quant,
		posting: Quant,
	},

	#[error("Invoice already exists for tenancy {tenancy_id} in {period}")]
	DuplicateInvoice { tenancy_id: String, period: Period },

	#[error("Invoice not found: {0}")]
	NotFound(String),

	#[error("Tenancy {tenancy_id} cannot be billed: missing {field}")]
	IncompleteTenancy {
		tenancy_id: String,
		field: &'static str,
	},

	#[error("Invoice {id} changed underneath us: expected version {expected}, found {found}")]
	StaleInvoice { id: String, expected: u64, found: u64 },

	#[error("Invariant violation: {0}")]
	InvariantViolation(String),

	#[error("Storage error: {0}")]
	Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	/// Machine-readable error code for the boundary contract.
	pub fn code(&self) -> &'static str {
		match self {
			Error::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
			Error::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
			Error::InvalidAmount(_) => "INVALID_AMOUNT",
			Error::Overpayment { .. } => "OVERPAYMENT",
			Error::DuplicateInvoice { .. } => "DUPLICATE_INVOICE",
			Error::NotFound(_) => "NOT_FOUND",
			Error::IncompleteTenancy { .. } => "INCOMPLETE_TENANCY",
			Error::StaleInvoice { .. } => "STALE_INVOICE",
			Error::InvariantViolation(_) => "INVARIANT_VIOLATION",
			Error::Storage(_) => "STORAGE",
		}
	}

	/// HTTP-equivalent status for the boundary contract.
	pub fn status(&self) -> u16 {
		match self {
			Error::NotFound(_) => 404,
			Error::UnknownCurrency(_)
			| Error::CurrencyMismatch { .. }
			| Error::InvalidAmount(_)
			| Error::Overpayment { .. }
			| Error::IncompleteTenancy { .. } => 422,
			Error::DuplicateInvoice { .. } | Error::StaleInvoice { .. } => 409,
			Error::InvariantViolation(_) | Error::Storage(_) => 500,
		}
	}

	/// Whether this signals an internal inconsistency rather than bad input.
	pub fn is_fatal(&self) -> bool {
		self.status() >= 500
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::Storage(err.to_string())
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Storage(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_mapping() {
		assert_eq!(Error::NotFound("INV-1".into()).status(), 404);
		assert_eq!(Error::UnknownCurrency("XYZ".into()).status(), 422);
		assert_eq!(Error::InvalidAmount("0".into()).status(), 422);
		assert_eq!(
			Error::CurrencyMismatch {
				expected: "MVR".into(),
				found: "USD".into()
			}
			.status(),
			422
		);
		assert_eq!(
			Error::Overpayment {
				due: Quant::from_i128(1000),
				paid: Quant::zero(),
				posting: Quant::from_i128(1200),
			}
			.status(),
			422
		);
		assert!(Error::InvariantViolation("base rate".into()).is_fatal());
		assert!(!Error::NotFound("x".into()).is_fatal());
	}

	#[test]
	fn test_codes_are_screaming_snake() {
		let err = Error::CurrencyMismatch {
			expected: "MVR".into(),
			found: "USD".into(),
		};
		assert_eq!(err.code(), "CURRENCY_MISMATCH");
		assert_eq!(
			err.to_string(),
			"Currency mismatch: invoice is in MVR, posting is in USD"
		);
	}
}
