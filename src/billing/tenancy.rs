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
use crate::util::date::Date;
use crate::util::quant::Quant;
use serde::{Deserialize, Serialize};

/// A lease binding a tenant to a rental unit. Owned by whatever manages
/// leases; the invoicing core only reads it. Rent and currency are optional
/// here because upstream records can be incomplete, and such a tenancy must
/// fail on its own without spoiling a billing run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Tenancy {
	pub id: String,
	pub rental_unit_id: String,
	pub tenant_id: String,
	#[serde(default)]
	pub rent: Option<Quant>,
	#[serde(default)]
	pub currency: Option<String>,
	pub lease_start: Date,
	pub active: bool,
}
