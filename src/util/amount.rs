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
use crate::util::quant::Quant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A quant value with a currency.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Amount {
	pub value: Quant,
	pub currency: String,
}

impl Amount {
	pub fn new(value: Quant, currency: &str) -> Self {
		Self {
			value,
			currency: currency.to_string(),
		}
	}

	/// Parses an amount written as "<value> <currency>", e.g. "1000 MVR".
	pub fn from_str(input: &str) -> Result<Self, anyhow::Error> {
		let mut parts = input.split_whitespace();
		match (parts.next(), parts.next(), parts.next()) {
			(Some(value), Some(currency), None) => {
				Ok(Self::new(Quant::from_str(value)?, currency))
			},
			_ => anyhow::bail!("Amount must look like '1000 MVR': {}", input),
		}
	}
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.value, self.currency)
	}
}
