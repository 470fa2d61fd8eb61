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

//! Conversion between currencies through a supplied rate table. Nothing here
//! keeps state: the caller hands in the table on every call and so decides
//! how fresh it is.
//!
//! Arithmetic is exact until the final step. `amount * rate[from] / rate[to]`
//! is carried as a reduced fraction, then rounded half-up once to the target
//! currency's minor units.

use crate::currency::rate_table::RateTable;
use crate::error::{Error, Result};
use crate::util::amount::Amount;
use crate::util::quant::Quant;

/// Converts `amount` of currency `from` into currency `to`.
pub fn convert(
	amount: &Quant,
	from: &str,
	to: &str,
	table: &RateTable,
) -> Result<Quant> {
	if amount.is_negative() {
		return Err(Error::InvalidAmount(format!(
			"cannot convert negative amount {} {}",
			amount, from
		)));
	}

	let from_rate = table.rate(from)?;
	let to_rate = table.rate(to)?;
	let places = table.minor_units(to)?;

	let exact = *amount * from_rate / to_rate;
	Ok(exact.rounded(places))
}

pub fn to_base(amount: &Quant, code: &str, table: &RateTable) -> Result<Quant> {
	convert(amount, code, table.base(), table)
}

pub fn from_base(
	amount_in_base: &Quant,
	code: &str,
	table: &RateTable,
) -> Result<Quant> {
	convert(amount_in_base, table.base(), code, table)
}

/// Same as `convert`, for a value that already carries its currency.
pub fn convert_amount(
	amount: &Amount,
	to: &str,
	table: &RateTable,
) -> Result<Amount> {
	let value = if to == table.base() {
		to_base(&amount.value, &amount.currency, table)?
	} else if amount.currency == table.base() {
		from_base(&amount.value, to, table)?
	} else {
		convert(&amount.value, &amount.currency, to, table)?
	};
	Ok(Amount::new(value, to))
}
