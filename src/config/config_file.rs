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
use serde::Deserialize;

pub const DEFAULT_DUE_DAY: u8 = 1;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
	pub billing: Option<Billing>,
	pub data: Option<Data>,
	pub rates: Option<Rates>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Billing {
	/// Day of the month rent falls due (1-31, clamped to short months)
	pub due_day: Option<u8>,

	/// How much a tenant may pay above the invoiced amount
	pub overpayment_tolerance: Option<Quant>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Data {
	/// JSON invoice store
	pub store: Option<String>,

	/// TOML list of tenancies
	pub tenancies: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Rates {
	/// TOML rate table. Takes precedence over `url` when both are set.
	pub file: Option<String>,

	/// Endpoint serving the rate table as JSON
	pub url: Option<String>,
	pub api_key: Option<String>,
	pub api_key_cmd: Option<String>,
}

impl Config {
	pub fn due_day(&self) -> u8 {
		self.billing
			.as_ref()
			.and_then(|b| b.due_day)
			.unwrap_or(DEFAULT_DUE_DAY)
	}

	pub fn overpayment_tolerance(&self) -> Quant {
		self.billing
			.as_ref()
			.and_then(|b| b.overpayment_tolerance)
			.unwrap_or_default()
	}

	pub fn store(&self) -> Option<&str> {
		self.data.as_ref().and_then(|d| d.store.as_deref())
	}

	pub fn tenancies(&self) -> Option<&str> {
		self.data.as_ref().and_then(|d| d.tenancies.as_deref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_config() {
		let config: Config = toml::from_str("").unwrap();
		assert_eq!(config.due_day(), DEFAULT_DUE_DAY);
		assert_eq!(config.overpayment_tolerance(), Quant::zero());
		assert_eq!(config.store(), None);
		assert!(config.rates.is_none());
	}

	#[test]
	fn test_full_config() {
		let config: Config = toml::from_str(
			r#"
			[billing]
			due_day = 5
			overpayment_tolerance = "0.50"

			[data]
			store = "/var/lib/rentr/invoices.json"
			tenancies = "/var/lib/rentr/tenancies.toml"

			[rates]
			url = "https://rates.example.com/mvr"
			api_key_cmd = "pass show rates"
			"#,
		)
		.unwrap();

		assert_eq!(config.due_day(), 5);
		assert_eq!(
			config.overpayment_tolerance(),
			Quant::from_str("0.5").unwrap()
		);
		assert_eq!(config.store(), Some("/var/lib/rentr/invoices.json"));
		assert_eq!(config.tenancies(), Some("/var/lib/rentr/tenancies.toml"));

		let rates = config.rates.unwrap();
		assert_eq!(rates.file, None);
		assert_eq!(rates.api_key_cmd.as_deref(), Some("pass show rates"));
	}

	#[test]
	fn test_float_tolerance_rejected() {
		let result: Result<Config, _> =
			toml::from_str("[billing]\noverpayment_tolerance = 0.5\n");
		assert!(result.is_err());
	}
}
