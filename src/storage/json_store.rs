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
use crate::billing::invoice::Invoice;
use crate::billing::period::Period;
use crate::error::{Error, Result};
use crate::storage::filesystem;
use crate::storage::InvoiceStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize, Serialize)]
struct StoreDocument {
	#[serde(default)]
	invoices: Vec<Invoice>,
}

/// Invoices kept in memory and, when given a path, saved to a JSON file on
/// commit. A read-only store accepts changes but never writes them, which
/// is what a dry run wants.
#[derive(Debug, Default)]
pub struct JsonInvoiceStore {
	path: Option<PathBuf>,
	read_only: bool,
	dirty: bool,
	invoices: BTreeMap<String, Invoice>,
	by_period: HashMap<(String, Period), String>, // (tenancy, period) -> id
}

impl JsonInvoiceStore {
	pub fn in_memory() -> Self {
		Self::default()
	}

	/// Loads the store at `path`. A missing file is an empty store and will
	/// be created on the first commit.
	pub fn open(path: &Path) -> Result<Self> {
		let mut store = Self {
			path: Some(path.to_path_buf()),
			..Self::default()
		};

		if !path.exists() {
			debug!(path = %path.display(), "no invoice store yet, starting empty");
			return Ok(store);
		}

		let content = filesystem::read_file(path)
			.map_err(|e| Error::Storage(e.to_string()))?;
		let document: StoreDocument = if content.trim().is_empty() {
			StoreDocument::default()
		} else {
			serde_json::from_str(&content)?
		};

		for invoice in document.invoices {
			store.load(invoice)?;
		}

		if store.is_empty() {
			debug!(path = %path.display(), "invoice store is empty");
		} else {
			debug!(
				path = %path.display(),
				invoices = store.len(),
				"loaded invoice store"
			);
		}
		Ok(store)
	}

	pub fn read_only(mut self) -> Self {
		self.read_only = true;
		self
	}

	pub fn len(&self) -> usize {
		self.invoices.len()
	}

	pub fn is_empty(&self) -> bool {
		self.invoices.is_empty()
	}

	fn load(&mut self, invoice: Invoice) -> Result<()> {
		let key = (invoice.tenancy_id.clone(), invoice.period);
		if self.invoices.contains_key(&invoice.id)
			|| self.by_period.contains_key(&key)
		{
			return Err(Error::InvariantViolation(format!(
				"invoice store holds {} more than once",
				invoice.id
			)));
		}

		self.by_period.insert(key, invoice.id.clone());
		self.invoices.insert(invoice.id.clone(), invoice);
		Ok(())
	}

	fn to_json(&self) -> Result<String> {
		let mut invoices: Vec<Invoice> = self.invoices.values().cloned().collect();
		invoices.sort_by(|a, b| (a.period, &a.id).cmp(&(b.period, &b.id)));

		Ok(serde_json::to_string_pretty(&StoreDocument { invoices })?)
	}
}

impl InvoiceStore for JsonInvoiceStore {
	fn get(&self, id: &str) -> Result<Option<Invoice>> {
		Ok(self.invoices.get(id).cloned())
	}

	fn find_by_period(
		&self,
		tenancy_id: &str,
		period: &Period,
	) -> Result<Option<Invoice>> {
		Ok(self
			.by_period
			.get(&(tenancy_id.to_string(), *period))
			.and_then(|id| self.invoices.get(id))
			.cloned())
	}

	fn insert(&mut self, invoice: Invoice) -> Result<()> {
		let key = (invoice.tenancy_id.clone(), invoice.period);
		if self.invoices.contains_key(&invoice.id)
			|| self.by_period.contains_key(&key)
		{
			return Err(Error::DuplicateInvoice {
				tenancy_id: invoice.tenancy_id,
				period: invoice.period,
			});
		}

		self.by_period.insert(key, invoice.id.clone());
		self.invoices.insert(invoice.id.clone(), invoice);
		self.dirty = true;
		Ok(())
	}

	fn update(&mut self, mut invoice: Invoice) -> Result<Invoice> {
		let stored = self
			.invoices
			.get_mut(&invoice.id)
			.ok_or_else(|| Error::NotFound(invoice.id.clone()))?;

		if stored.version != invoice.version {
			return Err(Error::StaleInvoice {
				id: invoice.id,
				expected: invoice.version,
				found: stored.version,
			});
		}

		if stored.tenancy_id != invoice.tenancy_id
			|| stored.period != invoice.period
			|| stored.created_at != invoice.created_at
		{
			return Err(Error::InvariantViolation(format!(
				"identity of invoice {} cannot change",
				invoice.id
			)));
		}

		invoice.version = stored.version + 1;
		*stored = invoice.clone();
		self.dirty = true;
		Ok(invoice)
	}

	fn scan(&self, start: &Period, end: &Period) -> Result<Vec<Invoice>> {
		let mut found: Vec<Invoice> = self
			.invoices
			.values()
			.filter(|i| i.period >= *start && i.period <= *end)
			.cloned()
			.collect();
		found.sort_by(|a, b| (a.period, &a.id).cmp(&(b.period, &b.id)));
		Ok(found)
	}

	fn commit(&mut self) -> Result<()> {
		if !self.dirty {
			return Ok(());
		}

		let Some(path) = &self.path else {
			self.dirty = false;
			return Ok(());
		};

		if self.read_only {
			info!(path = %path.display(), "dry run, changes not saved");
			return Ok(());
		}

		let json = self.to_json()?;
		filesystem::write_atomic(path, &json)
			.map_err(|e| Error::Storage(e.to_string()))?;
		self.dirty = false;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::billing::invoice::InvoiceStatus;
	use crate::util::date::Date;
	use crate::util::quant::Quant;
	use chrono::{DateTime, Utc};
	use std::env;
	use std::fs;

	fn invoice(tenancy: &str, period: &str) -> Invoice {
		let period = Period::from_str(period).unwrap();
		Invoice {
			id: Invoice::id_for(tenancy, &period),
			tenancy_id: tenancy.to_string(),
			rental_unit_id: "U-1".to_string(),
			tenant_id: "P-1".to_string(),
			period,
			due_amount: Quant::from_i128(1000),
			currency_code: "MVR".to_string(),
			amount_paid: Quant::zero(),
			status: InvoiceStatus::Pending,
			due_date: Date::from_str("2024-06-01").unwrap(),
			created_at: DateTime::<Utc>::default(),
			paid_at: None,
			version: 0,
		}
	}

	fn scratch(name: &str) -> PathBuf {
		env::temp_dir()
			.join(format!("rentr-store-{}-{}.json", std::process::id(), name))
	}

	#[test]
	fn test_insert_and_lookup() {
		let mut store = JsonInvoiceStore::in_memory();
		store.insert(invoice("T-1", "2024-06")).unwrap();

		let june = Period::from_str("2024-06").unwrap();
		assert!(store.get("INV-202406-T-1").unwrap().is_some());
		assert!(store.find_by_period("T-1", &june).unwrap().is_some());
		assert!(store.find_by_period("T-2", &june).unwrap().is_none());
		assert!(store.get("INV-202407-T-1").unwrap().is_none());
	}

	#[test]
	fn test_duplicate_insert_rejected() {
		let mut store = JsonInvoiceStore::in_memory();
		store.insert(invoice("T-1", "2024-06")).unwrap();

		let result = store.insert(invoice("T-1", "2024-06"));
		assert_eq!(
			result,
			Err(Error::DuplicateInvoice {
				tenancy_id: "T-1".to_string(),
				period: Period::from_str("2024-06").unwrap(),
			})
		);
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_update_checks_version() {
		let mut store = JsonInvoiceStore::in_memory();
		store.insert(invoice("T-1", "2024-06")).unwrap();

		let mut first = store.get("INV-202406-T-1").unwrap().unwrap();
		first.amount_paid = Quant::from_i128(400);
		let saved = store.update(first.clone()).unwrap();
		assert_eq!(saved.version, 1);

		// A second writer still holding version 0 loses
		let result = store.update(first);
		assert_eq!(
			result,
			Err(Error::StaleInvoice {
				id: "INV-202406-T-1".to_string(),
				expected: 0,
				found: 1,
			})
		);

		let missing = store.update(invoice("T-9", "2024-06"));
		assert_eq!(missing, Err(Error::NotFound("INV-202406-T-9".to_string())));
	}

	#[test]
	fn test_created_at_is_immutable() {
		let mut store = JsonInvoiceStore::in_memory();
		store.insert(invoice("T-1", "2024-06")).unwrap();

		let mut changed = invoice("T-1", "2024-06");
		changed.created_at = DateTime::parse_from_rfc3339("2024-06-02T00:00:00Z")
			.unwrap()
			.with_timezone(&Utc);
		assert!(matches!(
			store.update(changed),
			Err(Error::InvariantViolation(_))
		));
	}

	#[test]
	fn test_scan_is_ordered_and_inclusive() {
		let mut store = JsonInvoiceStore::in_memory();
		store.insert(invoice("T-2", "2024-06")).unwrap();
		store.insert(invoice("T-1", "2024-07")).unwrap();
		store.insert(invoice("T-1", "2024-06")).unwrap();
		store.insert(invoice("T-1", "2024-08")).unwrap();

		let ids: Vec<String> = store
			.scan(
				&Period::from_str("2024-06").unwrap(),
				&Period::from_str("2024-07").unwrap(),
			)
			.unwrap()
			.into_iter()
			.map(|i| i.id)
			.collect();
		assert_eq!(
			ids,
			vec!["INV-202406-T-1", "INV-202406-T-2", "INV-202407-T-1"]
		);
	}

	#[test]
	fn test_commit_and_reopen() {
		let path = scratch("reopen");
		let _ = fs::remove_file(&path);

		let mut store = JsonInvoiceStore::open(&path).unwrap();
		assert!(store.is_empty());
		store.insert(invoice("T-1", "2024-06")).unwrap();
		store.commit().unwrap();

		let reopened = JsonInvoiceStore::open(&path).unwrap();
		assert_eq!(
			reopened.get("INV-202406-T-1").unwrap(),
			Some(invoice("T-1", "2024-06"))
		);

		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_read_only_store_does_not_write() {
		let path = scratch("dry-run");
		let _ = fs::remove_file(&path);

		let mut store = JsonInvoiceStore::open(&path).unwrap().read_only();
		store.insert(invoice("T-1", "2024-06")).unwrap();
		store.commit().unwrap();

		assert!(!path.exists());
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_duplicate_on_disk_rejected() {
		let path = scratch("corrupt");
		let doc = StoreDocument {
			invoices: vec![invoice("T-1", "2024-06"), invoice("T-1", "2024-06")],
		};
		fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

		assert!(matches!(
			JsonInvoiceStore::open(&path),
			Err(Error::InvariantViolation(_))
		));

		fs::remove_file(&path).unwrap();
	}
}
