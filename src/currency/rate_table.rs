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
use crate::error::{Error, Result};
use crate::util::quant::Quant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minor-unit precision assumed for a currency unless the rate source says
/// otherwise.
pub const DEFAULT_MINOR_UNITS: u32 = 2;

/// Rounding beyond this many places is not a currency anyone uses, and risks
/// overflow in the underlying fraction.
const MAX_MINOR_UNITS: u32 = 18;

fn default_minor_units() -> u32 {
	DEFAULT_MINOR_UNITS
}

/// One currency's line in a rate table: how many units of the base currency
/// one unit of this currency is worth, and how many decimal places its
/// amounts are rounded to.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RateEntry {
	pub code: String,
	pub rate: Quant,
	#[serde(default = "default_minor_units")]
	pub minor_units: u32,
}

impl RateEntry {
	pub fn new(code: &str, rate: Quant, minor_units: u32) -> Self {
		Self {
			code: code.to_string(),
			rate,
			minor_units,
		}
	}
}

/// On-disk or over-the-wire form of a rate table, e.g. in TOML:
///
/// ```toml
/// base = "MVR"
///
/// [[currency]]
/// code = "USD"
/// rate = "15.42"
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RateDocument {
	pub base: String,
	#[serde(rename = "currency", default)]
	pub currencies: Vec<RateEntry>,
}

/// A validated snapshot of conversion rates into a single base currency.
/// Read-only once built, so one table can be shared freely between callers.
#[derive(Clone, Debug)]
pub struct RateTable {
	base: String,
	entries: BTreeMap<String, RateEntry>,
}

impl RateTable {
	/// Builds a table, checking that every rate is positive, no currency
	/// appears twice, and the base currency's rate is exactly 1. The base
	/// currency may be omitted from the entries, in which case it is added
	/// with the default precision.
	pub fn new(base: &str, entries: Vec<RateEntry>) -> Result<Self> {
		let base = base.trim().to_string();
		if base.is_empty() {
			return Err(Error::InvariantViolation(
				"rate table has no base currency".to_string(),
			));
		}

		let mut table = BTreeMap::new();
		for entry in entries {
			if entry.code.trim().is_empty()
				|| entry.code.contains(char::is_whitespace)
			{
				return Err(Error::InvariantViolation(format!(
					"invalid currency code '{}'",
					entry.code
				)));
			}
			if !entry.rate.is_positive() {
				return Err(Error::InvariantViolation(format!(
					"rate for {} must be positive, got {}",
					entry.code, entry.rate
				)));
			}
			if entry.minor_units > MAX_MINOR_UNITS {
				return Err(Error::InvariantViolation(format!(
					"{} declares {} minor units; at most {} are supported",
					entry.code, entry.minor_units, MAX_MINOR_UNITS
				)));
			}
			if table.contains_key(&entry.code) {
				return Err(Error::InvariantViolation(format!(
					"currency {} listed twice",
					entry.code
				)));
			}
			table.insert(entry.code.clone(), entry);
		}

		match table.get(&base) {
			Some(entry) if entry.rate != 1 => {
				return Err(Error::InvariantViolation(format!(
					"base currency {} must have rate 1, got {}",
					base, entry.rate
				)));
			},
			Some(_) => {},
			None => {
				table.insert(
					base.clone(),
					RateEntry::new(&base, Quant::from_i128(1), DEFAULT_MINOR_UNITS),
				);
			},
		}

		Ok(Self {
			base,
			entries: table,
		})
	}

	pub fn from_document(document: RateDocument) -> Result<Self> {
		RateTable::new(&document.base, document.currencies)
	}

	pub fn base(&self) -> &str {
		&self.base
	}

	fn entry(&self, code: &str) -> Result<&RateEntry> {
		self.entries
			.get(code)
			.ok_or_else(|| Error::UnknownCurrency(code.to_string()))
	}

	/// Units of base currency per one unit of `code`.
	pub fn rate(&self, code: &str) -> Result<Quant> {
		self.entry(code).map(|e| e.rate)
	}

	pub fn minor_units(&self, code: &str) -> Result<u32> {
		self.entry(code).map(|e| e.minor_units)
	}

	/// All entries, ordered by currency code.
	pub fn entries(&self) -> impl Iterator<Item = &RateEntry> {
		self.entries.values()
	}

	pub fn to_document(&self) -> RateDocument {
		RateDocument {
			base: self.base.clone(),
			currencies: self.entries().cloned().collect(),
		}
	}
}
