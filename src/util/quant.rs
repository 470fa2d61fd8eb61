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
use anyhow::{bail, Error};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Most fractional digits we will ever render when asked for an exact
/// plain-text form, and most we accept when parsing.
const MAX_PLACES: usize = 30;

/// An exact rational number backed by a fraction of u128s. Rent, payments
/// and exchange rates are all held this way, so a chain of conversions never
/// accumulates rounding error; rounding happens only when a caller asks for
/// it, normally at a currency's minor-unit precision.
///
/// Automatically simplifies its underlying fractional representation.
#[derive(Clone, Copy, Debug)]
pub struct Quant {
	numerator: u128,
	denominator: u128,

	/// Is always false if the numerator is zero.
	is_negative: bool,

	/// How many decimal places to render at minimum when printed. Has no
	/// effect on the underlying fraction.
	render_precision: u32,
}

impl Quant {
	pub fn zero() -> Self {
		Self {
			numerator: 0,
			denominator: 1,
			render_precision: 0,
			is_negative: false,
		}
	}

	/// Creates a new Quant with the given numerator and the denominator
	/// set at 10^exp, as though a decimal point were inserted that many
	/// places from the right.
	pub fn new(numerator: i128, exp: u32) -> Self {
		let mut out = Self {
			numerator: numerator.unsigned_abs(),
			denominator: 10u128.pow(exp),
			render_precision: exp,
			is_negative: numerator < 0,
		};
		out.reduce();
		out
	}

	#[cfg(test)]
	pub fn from_frac(numerator: i128, denominator: i128) -> Self {
		if denominator == 0 {
			panic!("Denominator cannot be zero");
		}

		let mut out = Self {
			numerator: numerator.unsigned_abs(),
			denominator: denominator.unsigned_abs(),
			render_precision: 0,
			is_negative: numerator != 0 && (numerator < 0) ^ (denominator < 0),
		};

		out.reduce();
		out
	}

	pub fn from_i128(amount: i128) -> Self {
		Self {
			numerator: amount.unsigned_abs(),
			denominator: 1,
			render_precision: 0,
			is_negative: amount < 0,
		}
	}

	/// Parses a plain decimal string such as "1000", "-0.05" or "15.42".
	/// Exponents, separators and binary floats are not accepted.
	pub fn from_str(input: &str) -> Result<Self, Error> {
		let trimmed = input.trim();
		let is_negative = trimmed.starts_with('-');
		let sanitized = trimmed.strip_prefix('-').unwrap_or(trimmed);

		let parts: Vec<&str> = sanitized.split('.').collect();
		let mut precision = 0u32;

		let (numerator, denominator) = match parts.len() {
			1 => (parts[0].parse::<u128>()?, 1),
			2 => {
				let decimal = parts[1];
				if decimal.len() > MAX_PLACES {
					bail!("Too many decimal places in {}", input);
				}
				let whole = parts[0].parse::<u128>()?;
				precision = decimal.len() as u32;
				let scale = 10u128.pow(precision);
				let fractional = decimal.parse::<u128>()?;
				(whole * scale + fractional, scale)
			},
			_ => bail!("Invalid decimal format"),
		};

		let mut out = Self {
			numerator,
			denominator,
			render_precision: precision,
			is_negative: is_negative && numerator > 0,
		};
		out.reduce();
		Ok(out)
	}

	/// Modifies the underlying fraction to the nearest value with the given
	/// number of decimal places, rounding halves away from zero.
	///
	/// Returns the adjustment that was applied, i.e. rounded - original.
	pub fn round(&mut self, decimal_places: u32) -> Self {
		self.reduce();

		let initial = *self;

		let scale = 10u128.pow(decimal_places);
		let scaled_numerator = self.numerator * scale;
		let quotient = scaled_numerator / self.denominator;
		let remainder = scaled_numerator % self.denominator;

		// half-up: a remainder of at least half the denominator carries
		let rounded_quotient = if remainder * 2 >= self.denominator {
			quotient + 1
		} else {
			quotient
		};

		self.numerator = rounded_quotient;
		self.denominator = scale;
		self.render_precision = decimal_places;
		self.is_negative = self.is_negative && rounded_quotient > 0;

		self.reduce();
		*self - initial
	}

	/// Copying form of `round`.
	pub fn rounded(&self, decimal_places: u32) -> Self {
		let mut out = *self;
		out.round(decimal_places);
		out
	}

	pub fn render_precision(&self) -> u32 {
		self.render_precision
	}

	#[cfg(test)]
	pub fn abs(&self) -> Self {
		Self {
			is_negative: false,
			..*self
		}
	}

	pub fn is_zero(&self) -> bool {
		self.numerator == 0
	}

	pub fn is_negative(&self) -> bool {
		self.is_negative
	}

	/// Whether this number is strictly greater than zero.
	pub fn is_positive(&self) -> bool {
		self.numerator > 0 && !self.is_negative
	}

	/// Exact decimal form without digit grouping, as stored on disk. Falls
	/// back to truncation past MAX_PLACES for non-terminating fractions.
	pub fn to_plain_string(&self) -> String {
		let (integer, fraction) = self.decimal_parts(MAX_PLACES);
		self.assemble(integer.to_string(), fraction)
	}

	/// Reduces the underlying fraction as much as possible while still
	/// representing the same value. Called after every operation that
	/// affects the fraction, to guard against overflow.
	fn reduce(&mut self) {
		let gcd = Self::gcd(self.numerator, self.denominator);
		self.numerator /= gcd;
		self.denominator /= gcd;
	}

	/// Implementation of Euclid's algorithm for greatest common divisor
	fn gcd(mut a: u128, mut b: u128) -> u128 {
		while b != 0 {
			let temp = b;
			b = a % b;
			a = temp;
		}
		a
	}

	fn recip(&self) -> Self {
		Self {
			numerator: self.denominator,
			denominator: self.numerator,
			..*self
		}
	}

	/// Splits the value into its integer part and up to `max_places`
	/// fractional digits, padded to the render precision and otherwise
	/// stripped of trailing zeros. Digits past `max_places` are truncated.
	fn decimal_parts(&self, max_places: usize) -> (u128, String) {
		let integer_part = self.numerator / self.denominator;
		let mut remainder = self.numerator % self.denominator;

		let mut fraction = String::new();
		for _ in 0..max_places {
			if remainder == 0 {
				break;
			}
			remainder *= 10;
			let digit = (remainder / self.denominator) as u8;
			remainder %= self.denominator;
			fraction.push(char::from(b'0' + digit));
		}

		let min_places = self.render_precision as usize;
		while fraction.len() < min_places {
			fraction.push('0');
		}
		while fraction.ends_with('0') && fraction.len() > min_places {
			fraction.pop();
		}

		(integer_part, fraction)
	}

	fn assemble(&self, int_str: String, fraction: String) -> String {
		let formatted = if fraction.is_empty() {
			int_str
		} else {
			format!("{}.{}", int_str, fraction)
		};

		if self.is_negative {
			format!("-{}", formatted)
		} else {
			formatted
		}
	}
}

impl Default for Quant {
	fn default() -> Self {
		Quant::zero()
	}
}

impl fmt::Display for Quant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let places = f.precision().unwrap_or(self.render_precision as usize);
		let (integer, fraction) = self.decimal_parts(places);

		let mut int_str = integer.to_string();
		let mut i = int_str.len() as isize - 3;
		while i > 0 {
			int_str.insert(i as usize, ',');
			i -= 3;
		}

		write!(f, "{}", self.assemble(int_str, fraction))
	}
}

// -----------
// -- SERDE --
// -----------

impl Serialize for Quant {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_plain_string())
	}
}

struct QuantVisitor;

impl Visitor<'_> for QuantVisitor {
	type Value = Quant;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "a decimal string or an integer")
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<Quant, E> {
		Quant::from_str(v).map_err(|e| E::custom(format!("{}: {}", v, e)))
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quant, E> {
		Ok(Quant::from_i128(v as i128))
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quant, E> {
		Ok(Quant::from_i128(v as i128))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quant, E> {
		Err(E::custom(format!(
			"{} is a binary float; write fractional amounts as strings",
			v
		)))
	}
}

impl<'de> Deserialize<'de> for Quant {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_any(QuantVisitor)
	}
}

// -----------------
// -- BOILERPLATE --
// -----------------

impl Add for Quant {
	type Output = Self;

	fn add(self, rhs: Self) -> Self::Output {
		// Special cases for zero
		if self.numerator == 0 {
			return Self {
				render_precision: self.render_precision.max(rhs.render_precision),
				..rhs
			};
		}
		if rhs.numerator == 0 {
			return Self {
				render_precision: self.render_precision.max(rhs.render_precision),
				..self
			};
		}

		let gcd = Self::gcd(self.denominator, rhs.denominator);
		let lcm = self.denominator / gcd * rhs.denominator;

		let term_a = self.numerator * (lcm / self.denominator);
		let term_b = rhs.numerator * (lcm / rhs.denominator);

		let (numerator, result_is_negative) =
			match (self.is_negative, rhs.is_negative) {
				(true, true) => (term_a + term_b, true),
				(false, false) => (term_a + term_b, false),
				(true, false) => {
					if term_a > term_b {
						(term_a - term_b, true)
					} else {
						(term_b - term_a, false)
					}
				},
				(false, true) => {
					if term_a > term_b {
						(term_a - term_b, false)
					} else {
						(term_b - term_a, true)
					}
				},
			};

		let mut out = Self {
			numerator,
			denominator: lcm,
			render_precision: self.render_precision.max(rhs.render_precision),
			is_negative: result_is_negative && numerator > 0,
		};
		out.reduce();
		out
	}
}

impl AddAssign for Quant {
	fn add_assign(&mut self, rhs: Self) {
		*self = *self + rhs;
	}
}

impl Sum for Quant {
	fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
		iter.fold(Quant::zero(), |acc, quant| acc + quant)
	}
}

impl Sub for Quant {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self::Output {
		self + (-rhs)
	}
}

impl SubAssign for Quant {
	fn sub_assign(&mut self, rhs: Self) {
		*self = *self - rhs;
	}
}

impl Mul for Quant {
	type Output = Self;

	fn mul(self, rhs: Self) -> Self::Output {
		// cross-reduce first to keep the products small
		let gcd_self = Self::gcd(self.numerator, rhs.denominator);
		let gcd_rhs = Self::gcd(rhs.numerator, self.denominator);

		let numerator =
			(self.numerator / gcd_self) * (rhs.numerator / gcd_rhs);
		let denominator =
			(self.denominator / gcd_rhs) * (rhs.denominator / gcd_self);

		let mut out = Self {
			numerator,
			denominator,
			is_negative: numerator > 0 && (self.is_negative ^ rhs.is_negative),
			render_precision: self.render_precision.max(rhs.render_precision),
		};
		out.reduce();
		out
	}
}

impl Div for Quant {
	type Output = Self;

	fn div(self, rhs: Self) -> Self::Output {
		if rhs.numerator == 0 {
			panic!("Attempt to divide by zero");
		}

		self * rhs.recip()
	}
}

impl Neg for Quant {
	type Output = Self;

	fn neg(self) -> Self::Output {
		Self {
			is_negative: !self.is_negative && self.numerator > 0,
			..self
		}
	}
}

impl PartialEq for Quant {
	fn eq(&self, other: &Self) -> bool {
		self.numerator * other.denominator == other.numerator * self.denominator
			&& self.is_negative == other.is_negative
	}
}

impl PartialEq<i128> for Quant {
	fn eq(&self, other: &i128) -> bool {
		*self == Quant::from_i128(*other)
	}
}

impl Eq for Quant {}

impl PartialOrd for Quant {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialOrd<i128> for Quant {
	fn partial_cmp(&self, other: &i128) -> Option<Ordering> {
		Some(self.cmp(&Quant::from_i128(*other)))
	}
}

impl Ord for Quant {
	fn cmp(&self, other: &Self) -> Ordering {
		if self.numerator == 0 && other.numerator == 0 {
			return Ordering::Equal;
		}

		match (self.is_negative, other.is_negative) {
			(true, false) => return Ordering::Less,
			(false, true) => return Ordering::Greater,
			_ => {},
		};

		let gcd = Self::gcd(self.denominator, other.denominator);
		let lcm = self.denominator / gcd * other.denominator;

		let left = self.numerator * (lcm / self.denominator);
		let right = other.numerator * (lcm / other.denominator);

		if self.is_negative {
			right.cmp(&left)
		} else {
			left.cmp(&right)
		}
	}
}

impl Hash for Quant {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.numerator.hash(state);
		self.denominator.hash(state);
		self.is_negative.hash(state);
		// `render_precision` intentionally excluded from the hash
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	mod creation {
		use super::*;

		#[test]
		fn test_new_reduces() {
			let quant = Quant::new(-200, 2);
			assert_eq!(quant.numerator, 2);
			assert_eq!(quant.denominator, 1);
			assert_eq!(quant.render_precision, 2);
			assert!(quant.is_negative);
		}

		#[test]
		fn test_zero_is_never_negative() {
			let quant = Quant::from_frac(0, -5);
			assert!(!quant.is_negative);
			assert!(!(-Quant::zero()).is_negative);
			assert_eq!(-Quant::zero(), Quant::zero());
		}

		#[test]
		#[should_panic(expected = "Denominator cannot be zero")]
		fn test_zero_denominator() {
			Quant::from_frac(1, 0);
		}

		#[test]
		fn test_from_str_decimal() {
			let quant = Quant::from_str("15.42").unwrap();
			assert_eq!(quant.numerator, 771);
			assert_eq!(quant.denominator, 50);
			assert_eq!(quant.render_precision, 2);
			assert!(!quant.is_negative);
		}

		#[test]
		fn test_from_str_negative_zero() {
			let quant = Quant::from_str("-0.00").unwrap();
			assert!(quant.is_zero());
			assert!(!quant.is_negative);
		}

		#[test]
		fn test_from_str_rejects_garbage() {
			assert!(Quant::from_str("").is_err());
			assert!(Quant::from_str("12.3.4").is_err());
			assert!(Quant::from_str("abc").is_err());
			assert!(Quant::from_str(".5").is_err());
			assert!(Quant::from_str("1e5").is_err());
		}
	}

	mod math {
		use super::*;

		#[test]
		fn test_add_mixed_signs() {
			let a = Quant::from_frac(5, 6);
			let b = Quant::from_frac(-1, 3);
			assert_eq!(a + b, Quant::from_frac(1, 2));
		}

		#[test]
		fn test_sub_to_zero() {
			let a = Quant::from_str("400").unwrap();
			let b = Quant::from_str("400.00").unwrap();
			let diff = a - b;
			assert!(diff.is_zero());
			assert!(!diff.is_negative);
		}

		#[test]
		fn test_mul_rate() {
			let amount = Quant::from_i128(100);
			let rate = Quant::from_str("15.42").unwrap();
			assert_eq!(amount * rate, Quant::from_i128(1542));
		}

		#[test]
		fn test_div_inexact_result() {
			let a = Quant::from_frac(7, 1);
			let b = Quant::from_frac(3, 1);
			assert_eq!(a / b, Quant::from_frac(7, 3));
		}

		#[test]
		#[should_panic(expected = "Attempt to divide by zero")]
		fn test_div_zero_divisor() {
			let _ = Quant::from_i128(1) / Quant::zero();
		}

		#[test]
		fn test_sum() {
			let total: Quant = ["400", "350.50", "249.50"]
				.iter()
				.map(|s| Quant::from_str(s).unwrap())
				.sum();
			assert_eq!(total, Quant::from_i128(1000));
		}

		#[test]
		fn test_ordering() {
			let small = Quant::from_str("999.99").unwrap();
			let big = Quant::from_i128(1000);
			assert!(small < big);
			assert!(-big < -small);
			assert!(big > 999);
		}
	}

	mod rounding {
		use super::*;

		#[test]
		fn test_half_rounds_up() {
			let mut a = Quant::from_str("0.125").unwrap();
			a.round(2);
			assert_eq!(a, Quant::from_str("0.13").unwrap());

			let mut b = Quant::from_str("0.135").unwrap();
			b.round(2);
			assert_eq!(b, Quant::from_str("0.14").unwrap());
		}

		#[test]
		fn test_half_rounds_away_from_zero_when_negative() {
			let mut a = Quant::from_str("-2.5").unwrap();
			a.round(0);
			assert_eq!(a, Quant::from_i128(-3));
		}

		#[test]
		fn test_below_half_rounds_down() {
			let mut a = Quant::from_str("0.00049").unwrap();
			a.round(3);
			assert_eq!(a.to_string(), "0.000");
		}

		#[test]
		fn test_one_third() {
			let mut fraction = Quant::from_frac(1, 3);
			let adjustment = fraction.round(2);
			assert_eq!(fraction, Quant::new(33, 2));
			assert_eq!(adjustment, Quant::from_frac(-1, 300));
		}

		#[test]
		fn test_rounded_leaves_original() {
			let original = Quant::from_frac(2, 3);
			let rounded = original.rounded(2);
			assert_eq!(rounded, Quant::new(67, 2));
			assert_eq!(original, Quant::from_frac(2, 3));
		}
	}

	mod rendering {
		use super::*;

		#[test]
		fn test_display() {
			let money = Quant::from_str("12345.6789").unwrap();
			assert_eq!(money.to_string(), "12,345.6789");

			let negative_money = Quant::from_str("-1000000.50").unwrap();
			assert_eq!(negative_money.to_string(), "-1,000,000.50");

			let zero_money = Quant::from_str("0.00").unwrap();
			assert_eq!(zero_money.to_string(), "0.00")
		}

		#[test]
		fn test_plain_string() {
			assert_eq!(Quant::from_str("2542.00").unwrap().to_plain_string(), "2542.00");
			assert_eq!(Quant::from_i128(1000).to_plain_string(), "1000");
			assert_eq!(Quant::from_frac(-1, 8).to_plain_string(), "-0.125");
		}

		#[test]
		fn test_serde_as_string() {
			let quant = Quant::from_str("15.42").unwrap();
			let json = serde_json::to_string(&quant).unwrap();
			assert_eq!(json, "\"15.42\"");

			let back: Quant = serde_json::from_str(&json).unwrap();
			assert_eq!(back, quant);

			let from_int: Quant = serde_json::from_str("1000").unwrap();
			assert_eq!(from_int, Quant::from_i128(1000));

			assert!(serde_json::from_str::<Quant>("15.42").is_err());
		}
	}

	mod extremes {
		use super::*;
		use rand::Rng;
		use std::time::{Duration, Instant};

		#[test]
		fn test_large_and_small_mixed_operations() {
			let a = Quant::from_frac(i128::MAX, 1);
			let b = Quant::from_frac(2, 3);
			let result = a * b;
			assert_eq!(
				result.numerator, 340282366920938463463374607431768211454,
				"Reduction should occur prior to multiplication and not overflow"
			);
			assert_eq!(result.denominator, 3);
		}

		#[test]
		fn test_rounding_stress() {
			let duration = Duration::from_millis(500);
			let start_time = Instant::now();

			let mut rng = rand::thread_rng();

			while Instant::now() - start_time < duration {
				let cents: i128 = rng.gen_range(0..10i128.pow(12));
				let rate_millis: i128 = rng.gen_range(1..10i128.pow(6));

				let amount = Quant::new(cents, 2);
				let rate = Quant::new(rate_millis, 3);

				let mut converted = amount * rate;
				let adjustment = converted.round(2);

				assert!(
					adjustment.abs() <= Quant::new(5, 3),
					"rounding moved {} by {}",
					amount * rate,
					adjustment
				);
			}
		}
	}
}
