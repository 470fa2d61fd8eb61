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
use anyhow::{anyhow, bail, Error};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

static PERIOD_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap());

/// One invoicing cycle: a calendar month of a year.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period {
	year: u32,
	month: u8,
}

impl Period {
	pub fn new(year: u32, month: u8) -> Result<Self, Error> {
		if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
			bail!("Invalid billing period: {}-{}", year, month);
		}
		Ok(Self { year, month })
	}

	/// Parses "YYYY-MM".
	pub fn from_str(input: &str) -> Result<Self, Error> {
		let caps = PERIOD_PATTERN
			.captures(input.trim())
			.ok_or_else(|| anyhow!("Billing period must be YYYY-MM: {}", input))?;

		Period::new(caps[1].parse()?, caps[2].parse()?)
	}

	/// The period a date falls into.
	pub fn of(date: &Date) -> Self {
		Self {
			year: date.year(),
			month: date.month(),
		}
	}

	pub fn min() -> Self {
		Self { year: 1, month: 1 }
	}

	pub fn max() -> Self {
		Self {
			year: 9999,
			month: 12,
		}
	}

	/// The given day of this month, clamped to the month's length.
	pub fn day(&self, day: u8) -> Date {
		Date::clamped(self.year, self.month, day)
	}

	pub fn last_day(&self) -> Date {
		self.day(31)
	}

	/// "YYYYMM", used in invoice ids.
	pub fn compact(&self) -> String {
		format!("{:04}{:02}", self.year, self.month)
	}
}

impl fmt::Display for Period {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:04}-{:02}", self.year, self.month)
	}
}

impl Serialize for Period {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Period {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Period::from_str(&raw).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse() {
		let period = Period::from_str("2024-06").unwrap();
		assert_eq!(period, Period::new(2024, 6).unwrap());
		assert_eq!(period.to_string(), "2024-06");
		assert_eq!(period.compact(), "202406");
		assert_eq!(Period::from_str("2024-6").unwrap(), period);
	}

	#[test]
	fn test_parse_every_month() {
		for month in 1..=12u8 {
			let padded = Period::from_str(&format!("2024-{:02}", month)).unwrap();
			let bare = Period::from_str(&format!(" 2024-{} ", month)).unwrap();
			assert_eq!(padded, bare);
			assert_eq!(padded, Period::new(2024, month).unwrap());
		}
	}

	#[test]
	fn test_parse_rejects_bad_input() {
		assert!(Period::from_str("2024-13").is_err());
		assert!(Period::from_str("2024-00").is_err());
		assert!(Period::from_str("2024-06-01").is_err());
		assert!(Period::from_str("June 2024").is_err());
	}

	#[test]
	fn test_ordering_spans_years() {
		let dec = Period::from_str("2023-12").unwrap();
		let jan = Period::from_str("2024-01").unwrap();
		assert!(dec < jan);
		assert!(Period::min() < dec && jan < Period::max());
	}

	#[test]
	fn test_days() {
		let feb = Period::from_str("2024-02").unwrap();
		assert_eq!(feb.day(1).to_string(), "2024-02-01");
		assert_eq!(feb.last_day().to_string(), "2024-02-29");
		assert_eq!(feb.day(30).to_string(), "2024-02-29");
		assert_eq!(Period::of(&feb.day(15)), feb);
	}
}
