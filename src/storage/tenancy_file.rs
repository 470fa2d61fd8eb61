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
use crate::billing::tenancy::Tenancy;
use crate::error::{Error, Result};
use crate::storage::filesystem;
use crate::storage::TenancySource;
use crate::util::date::Date;
use anyhow::anyhow;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TenancyDocument {
	#[serde(rename = "tenancy", default)]
	tenancies: Vec<Tenancy>,
}

/// Tenancies listed in a TOML file, re-read on every call:
///
/// ```toml
/// [[tenancy]]
/// id = "T-1"
/// rental_unit_id = "U-1"
/// tenant_id = "P-1"
/// rent = "1000.00"
/// currency = "MVR"
/// lease_start = "2024-01-01"
/// active = true
/// ```
pub struct TenancyFile {
	path: PathBuf,
}

impl TenancyFile {
	pub fn new(path: &Path) -> Self {
		Self {
			path: path.to_path_buf(),
		}
	}

	pub fn parse(content: &str) -> anyhow::Result<Vec<Tenancy>> {
		let document: TenancyDocument = toml::from_str(content)
			.map_err(|e| anyhow!("failed to parse tenancies: {}", e))?;
		Ok(document.tenancies)
	}

	fn load(&self) -> anyhow::Result<Vec<Tenancy>> {
		let content = filesystem::read_file(&self.path)?;
		TenancyFile::parse(&content)
	}
}

impl TenancySource for TenancyFile {
	fn active_tenancies(&self, as_of: &Date) -> Result<Vec<Tenancy>> {
		let all = self
			.load()
			.map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?;
		let total = all.len();

		let active = all.active_tenancies(as_of)?;
		debug!(
			path = %self.path.display(),
			total,
			active = active.len(),
			"read tenancies as of {}", as_of
		);
		Ok(active)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::util::quant::Quant;

	const TENANCIES: &str = r#"
		[[tenancy]]
		id = "T-1"
		rental_unit_id = "U-1"
		tenant_id = "P-1"
		rent = "1000.00"
		currency = "MVR"
		lease_start = "2024-01-01"
		active = true

		[[tenancy]]
		id = "T-2"
		rental_unit_id = "U-2"
		tenant_id = "P-2"
		rent = 100
		currency = "USD"
		lease_start = "2024-07-10"
		active = true

		[[tenancy]]
		id = "T-3"
		rental_unit_id = "U-3"
		tenant_id = "P-3"
		lease_start = "2023-02-01"
		active = false
	"#;

	#[test]
	fn test_parse() {
		let tenancies = TenancyFile::parse(TENANCIES).unwrap();
		assert_eq!(tenancies.len(), 3);
		assert_eq!(tenancies[0].rent, Some(Quant::from_i128(1000)));
		assert_eq!(tenancies[1].rent, Some(Quant::from_i128(100)));
		assert_eq!(tenancies[2].rent, None);
		assert_eq!(tenancies[2].currency, None);
	}

	#[test]
	fn test_active_as_of() {
		let tenancies = TenancyFile::parse(TENANCIES).unwrap();

		let june = Date::from_str("2024-06-30").unwrap();
		let ids: Vec<String> = tenancies
			.active_tenancies(&june)
			.unwrap()
			.into_iter()
			.map(|t| t.id)
			.collect();
		assert_eq!(ids, vec!["T-1"]);

		let july = Date::from_str("2024-07-31").unwrap();
		assert_eq!(tenancies.active_tenancies(&july).unwrap().len(), 2);
	}

	#[test]
	fn test_unquoted_date_rejected() {
		let result = TenancyFile::parse(
			"[[tenancy]]\nid = \"T\"\nrental_unit_id = \"U\"\ntenant_id = \"P\"\nlease_start = 2024-01-01\nactive = true\n",
		);
		assert!(result.is_err());
	}

	#[test]
	fn test_missing_file() {
		let source = TenancyFile::new(Path::new("/nonexistent/rentr/tenancies.toml"));
		let result = source.active_tenancies(&Date::from_str("2024-06-30").unwrap());
		assert!(matches!(result, Err(Error::Storage(_))));
	}
}
