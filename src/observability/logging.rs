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
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `rentr=debug`.
/// When set it wins over the verbosity flags.
pub const LOG_ENV: &str = "RENTR_LOG";

/// Filter level for the number of `-v` flags given.
pub fn default_level(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn",
		1 => "info",
		_ => "debug",
	}
}

/// Sends log output to stderr so that stdout carries only reports.
pub fn init_logging(verbosity: u8) {
	let filter = EnvFilter::try_from_env(LOG_ENV)
		.unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

	// A subscriber may already be installed, e.g. under test
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.try_init();
}
