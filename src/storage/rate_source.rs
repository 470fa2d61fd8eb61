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
use crate::currency::rate_table::{RateDocument, RateTable};
use crate::error::{Error, Result};
use crate::storage::filesystem;
use crate::storage::RateSource;
use anyhow::{anyhow, bail};
use reqwest::Method;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stands in when no rate table is configured, so that only the operations
/// that actually need rates fail.
pub struct NoRates;

impl RateSource for NoRates {
	fn rate_table(&self) -> Result<RateTable> {
		Err(Error::Storage(
			"no rate table configured; pass --rates or set rates.file or rates.url"
				.to_string(),
		))
	}
}

/// A rate table kept in a TOML file. See `RateDocument` for the layout.
pub struct RateFile {
	path: PathBuf,
}

impl RateFile {
	pub fn new(path: &Path) -> Self {
		Self {
			path: path.to_path_buf(),
		}
	}

	pub fn parse(content: &str) -> anyhow::Result<RateDocument> {
		toml::from_str(content).map_err(|e| anyhow!("failed to parse rates: {}", e))
	}
}

impl RateSource for RateFile {
	fn rate_table(&self) -> Result<RateTable> {
		let document = filesystem::read_file(&self.path)
			.and_then(|content| RateFile::parse(&content))
			.map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?;

		debug!(
			path = %self.path.display(),
			currencies = document.currencies.len(),
			"read rate table"
		);
		RateTable::from_document(document)
	}
}

/// A rate table served over HTTP as JSON, in the same shape as the file.
/// Fetched on every call; an unreachable server is an error, never a reason
/// to fall back to stale or built-in rates.
pub struct RateUrl {
	client: reqwest::blocking::Client,
	url: String,
	api_key: Option<String>,
}

impl RateUrl {
	pub fn new(url: &str, api_key: Option<String>) -> Self {
		RateUrl {
			client: reqwest::blocking::Client::new(),
			url: url.to_string(),
			api_key,
		}
	}

	/// Sends a GET and handle the response. Errors on non-2xx response codes.
	fn fetch(&self) -> anyhow::Result<RateDocument> {
		let mut request = self.client.request(Method::GET, &self.url);

		if let Some(api_key) = &self.api_key {
			request = request.header("Authorization", format!("Bearer {}", api_key));
		}

		info!(url = %self.url, "fetching rate table");
		let response = request.send()?;

		if !response.status().is_success() {
			bail!("Request failed with status: {}", response.status());
		}

		Ok(response.json()?)
	}
}

impl RateSource for RateUrl {
	fn rate_table(&self) -> Result<RateTable> {
		let document = self
			.fetch()
			.map_err(|e| Error::Storage(format!("{}: {}", self.url, e)))?;
		RateTable::from_document(document)
	}
}
