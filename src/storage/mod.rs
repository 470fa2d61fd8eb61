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
//! The collaborators the invoicing core talks to, and the file-backed
//! versions of them the command line uses.

use crate::billing::invoice::Invoice;
use crate::billing::period::Period;
use crate::billing::tenancy::Tenancy;
use crate::currency::rate_table::RateTable;
use crate::error::Result;
use crate::util::date::Date;

pub mod filesystem;
pub mod json_store;
pub mod rate_source;
pub mod tenancy_file;

pub trait TenancySource {
	/// Tenancies that are active and whose lease has started by `as_of`.
	fn active_tenancies(&self, as_of: &Date) -> Result<Vec<Tenancy>>;
}

impl<T: TenancySource + ?Sized> TenancySource for Box<T> {
	fn active_tenancies(&self, as_of: &Date) -> Result<Vec<Tenancy>> {
		(**self).active_tenancies(as_of)
	}
}

impl TenancySource for Vec<Tenancy> {
	fn active_tenancies(&self, as_of: &Date) -> Result<Vec<Tenancy>> {
		Ok(self
			.iter()
			.filter(|t| t.active && t.lease_start <= *as_of)
			.cloned()
			.collect())
	}
}

pub trait InvoiceStore {
	fn get(&self, id: &str) -> Result<Option<Invoice>>;

	fn find_by_period(
		&self,
		tenancy_id: &str,
		period: &Period,
	) -> Result<Option<Invoice>>;

	/// Adds a new invoice. Fails with `DuplicateInvoice` if the tenancy
	/// already has one for the period.
	fn insert(&mut self, invoice: Invoice) -> Result<()>;

	/// Replaces the stored invoice with the same id. The caller's version
	/// must match the stored one; the stored copy, with its version bumped,
	/// is returned.
	fn update(&mut self, invoice: Invoice) -> Result<Invoice>;

	/// All invoices with a period in `[start, end]`, ordered by period then id.
	fn scan(&self, start: &Period, end: &Period) -> Result<Vec<Invoice>>;

	/// Makes every change since the last commit durable.
	fn commit(&mut self) -> Result<()>;
}

pub trait RateSource {
	fn rate_table(&self) -> Result<RateTable>;
}

impl<R: RateSource + ?Sized> RateSource for Box<R> {
	fn rate_table(&self) -> Result<RateTable> {
		(**self).rate_table()
	}
}

impl RateSource for RateTable {
	fn rate_table(&self) -> Result<RateTable> {
		Ok(self.clone())
	}
}
