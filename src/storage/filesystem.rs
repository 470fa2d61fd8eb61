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
use crate::config::config_file::Config;
use anyhow::{anyhow, bail, Error};
use dirs::home_dir;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Fetches the config from the given path, or default path if none.
/// The boolean argument indicates whether it is necessary to inspect
/// the config for authentication, i.e. for fetching rates over HTTP.
pub fn get_config(
	custom_config_path: Option<&String>,
	expand_auth: bool,
) -> Result<Config, Error> {
	let config_path = match &custom_config_path {
		None => home_dir()
			.ok_or_else(|| anyhow!("Unable to determine home directory"))?
			.join(".config/rentr/config.toml"),
		Some(p) => PathBuf::from(p),
	};

	// create empty config file if it doesn't exist
	if !config_path.exists() && custom_config_path.is_none() {
		if let Some(parent) = config_path.parent() {
			fs::create_dir_all(parent)?;
		}
		File::create(config_path.clone())?;
	}

	let content = read_file(&config_path)?;
	let mut config: Config = toml::from_str(&content)
		.map_err(|e| anyhow!("failed to parse config: {}", e))?;
	debug!(path = %config_path.display(), "loaded config");

	if !expand_auth {
		return Ok(config);
	}

	// Execute api_key_cmd if applicable, and put result in api_key
	if let Some(rates) = &mut config.rates {
		if rates.api_key_cmd.is_some() && rates.api_key.is_some() {
			bail!("Only one of rates.api_key and rates.api_key_cmd may be specified")
		}

		if let Some(api_key_cmd) = &rates.api_key_cmd {
			rates.api_key = Some(run_key_command(api_key_cmd)?);
		}
	}

	Ok(config)
}

fn run_key_command(cmd: &str) -> Result<String, Error> {
	let output = Command::new("sh")
		.arg("-c")
		.arg(cmd)
		.output()
		.map_err(|e| anyhow!("failed to execute api_key_cmd: {}", e))?;

	if !output.status.success() {
		bail!(
			"rates api_key_cmd failed with status {}: {}",
			output.status,
			String::from_utf8_lossy(&output.stderr)
		);
	}

	Ok(String::from_utf8(output.stdout)
		.map_err(|e| anyhow!("failed to parse command output: {}", e))?
		.trim()
		.to_string())
}

pub fn read_file(path: &Path) -> Result<String, Error> {
	fs::read_to_string(path)
		.map_err(|e| anyhow!("unable to read {}: {}", path.display(), e))
}

/// Replaces the file at `path` with `contents` by writing a sibling
/// temporary file and renaming it over the target, so readers see either
/// the old file or the new one and never a partial write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), Error> {
	let file_name = path
		.file_name()
		.ok_or_else(|| anyhow!("not a file path: {}", path.display()))?;

	let mut tmp_name = file_name.to_os_string();
	tmp_name.push(".tmp");
	let tmp_path = path.with_file_name(tmp_name);

	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}

	let mut file = File::create(&tmp_path)?;
	file.write_all(contents.as_bytes())?;
	file.sync_all()?;
	fs::rename(&tmp_path, path)
		.map_err(|e| anyhow!("unable to replace {}: {}", path.display(), e))?;

	debug!(path = %path.display(), bytes = contents.len(), "wrote file");
	Ok(())
}
