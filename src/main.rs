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
use crate::billing::generator::InvoiceGenerator;
use crate::billing::payment_ledger::PaymentLedger;
use crate::billing::period::Period;
use crate::billing::tenancy::Tenancy;
use crate::config::config_file::Config;
use crate::currency::normalizer;
use crate::lifecycle::controller::InvoiceController;
use crate::lifecycle::response::BoundaryError;
use crate::reports::invoice_reporter::{render_generation, InvoiceReporter};
use crate::reports::rate_reporter::RateReporter;
use crate::reports::statistics_reporter::StatisticsReporter;
use crate::storage::json_store::JsonInvoiceStore;
use crate::storage::rate_source::{NoRates, RateFile, RateUrl};
use crate::storage::tenancy_file::TenancyFile;
use crate::storage::{filesystem, RateSource, TenancySource};
use crate::util::amount::Amount;
use crate::util::date::Date;
use crate::util::quant::Quant;
use anyhow::{anyhow, bail, Error};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

mod billing;
mod config;
mod currency;
mod error;
mod lifecycle;
mod observability;
mod reports;
mod storage;
mod util;

type Controller = InvoiceController<
	JsonInvoiceStore,
	Box<dyn TenancySource>,
	Box<dyn RateSource>,
>;

#[derive(Parser)]
#[command(
	name = "rentr",
	version = "0.3.2",
	about = "Rent invoicing and payment reconciliation tool"
)]
struct Cli {
	// ----------------
	// -- POSITIONAL --
	// ----------------
	/// The command to execute
	command: Directive,

	/// Billing period, invoice id or amount, depending on the command
	#[arg(required = false)]
	term: Option<String>,

	// -----------
	// -- FLAGS --
	// -----------
	/// Invoice store (JSON). Without one, invoices live only for this run
	#[arg(short)]
	file: Option<String>,

	/// Custom config file location (default: ~/.config/rentr/config.toml)
	#[arg(long)]
	config: Option<String>,

	/// Tenancy list (TOML)
	#[arg(long)]
	tenancies: Option<String>,

	/// Rate table (TOML); overrides any configured rate file or URL
	#[arg(long)]
	rates: Option<String>,

	/// First billing period to include (YYYY-MM)
	#[arg(short, long)]
	begin: Option<String>,

	/// Last billing period to include (YYYY-MM)
	#[arg(short, long)]
	end: Option<String>,

	/// Payment amount
	#[arg(short, long)]
	amount: Option<String>,

	/// Currency of the payment or amount to convert
	#[arg(short, long)]
	currency: Option<String>,

	/// Target currency for conversion (default: base currency)
	#[arg(long)]
	to: Option<String>,

	/// Convert a payment in another currency into the invoice's currency
	#[arg(long)]
	convert: bool,

	/// Treat this as the current time (YYYY-MM-DD or RFC 3339)
	#[arg(long)]
	now: Option<String>,

	/// Print results as JSON
	#[arg(long)]
	json: bool,

	/// Run without saving any changes to the invoice store
	#[arg(long)]
	dry_run: bool,

	/// Log more; repeat for more detail
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

impl Cli {
	/// Extra validations on top of what clap does
	fn validate(&self) -> Result<(), Error> {
		let needs_term = matches!(
			self.command,
			Directive::Generate
				| Directive::Pay | Directive::MarkPaid
				| Directive::Convert
		);
		if needs_term && self.term.is_none() {
			bail!("{} requires an argument", self.command.name());
		}

		if self.command == Directive::Pay && self.amount.is_none() {
			bail!("No payment amount specified (--amount)");
		}

		if self.convert && self.command != Directive::Pay {
			bail!("--convert only applies to pay");
		}

		Ok(())
	}

	fn term(&self) -> Result<&str, Error> {
		self.term
			.as_deref()
			.ok_or_else(|| anyhow!("{} requires an argument", self.command.name()))
	}
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Debug)]
enum Directive {
	Generate, // bill every active tenancy for a period
	Pay,      // record a payment against an invoice
	MarkPaid, // settle an invoice in full
	Recheck,  // flag open invoices past their due date

	Stats, // totals and counts over a window of periods
	List,  // list invoices

	Rates,   // show the rate table
	Convert, // convert an amount between currencies
}

impl Directive {
	fn name(&self) -> String {
		self.to_possible_value()
			.map(|v| v.get_name().to_string())
			.unwrap_or_default()
	}

	fn needs_rates(&self) -> bool {
		matches!(
			self,
			Directive::Pay | Directive::Stats | Directive::Rates | Directive::Convert
		)
	}
}

fn main() -> Result<(), Error> {
	let args = Cli::parse();
	observability::logging::init_logging(args.verbose);
	args.validate()?;

	let now = parse_now(args.now.as_deref())?;
	debug!(command = %args.command.name(), %now, "starting");

	// Only rate URLs need credentials, so only expand them when rates matter
	let config =
		filesystem::get_config(args.config.as_ref(), args.command.needs_rates())?;

	let mut controller = build_controller(&args, &config)?;

	match args.command {
		Directive::Generate => {
			let period = Period::from_str(args.term()?)?;
			let report = report_error(&args, controller.generate_monthly(&period, now))?;
			output(&args, &report, || {
				print!("{}", render_generation(&report, to_date(now)))
			})?;
		},
		Directive::Pay => {
			let invoice_id = args.term()?;
			let amount = Quant::from_str(args.amount.as_deref().unwrap_or_default())?;
			let currency = match &args.currency {
				Some(c) => c.clone(),
				None => report_error(&args, controller.get_invoice(invoice_id))?.currency_code,
			};

			let summary = controller.record_payment(
				invoice_id,
				amount,
				&currency,
				now,
				args.convert,
			);
			let summary = report_error(&args, summary)?;
			output(&args, &summary, || {
				let invoices = std::slice::from_ref(&summary);
				InvoiceReporter::new(invoices, to_date(now)).print()
			})?;
		},
		Directive::MarkPaid => {
			let summary = controller.mark_paid(args.term()?, now);
			let summary = report_error(&args, summary)?;
			output(&args, &summary, || {
				let invoices = std::slice::from_ref(&summary);
				InvoiceReporter::new(invoices, to_date(now)).print()
			})?;
		},
		Directive::Recheck => {
			let changed = report_error(&args, controller.recheck_overdue(now))?;
			output(&args, &changed, || {
				if changed.is_empty() {
					println!("No invoices became overdue.");
				} else {
					InvoiceReporter::new(&changed, to_date(now)).print();
				}
			})?;
		},
		Directive::Stats => {
			let (begin, end) = get_range(&args, Period::of(&to_date(now)))?;
			let stats = report_error(&args, controller.get_statistics(&begin, &end))?;
			output(&args, &stats, || StatisticsReporter::new(&stats).print())?;
		},
		Directive::List => {
			let (begin, end) = get_range(&args, Period::max())?;
			let begin = if args.begin.is_none() { Period::min() } else { begin };
			let invoices = report_error(&args, controller.list_invoices(&begin, &end))?;
			output(&args, &invoices, || {
				InvoiceReporter::new(&invoices, to_date(now)).print()
			})?;
		},
		Directive::Rates => {
			let table = report_error(&args, controller.rate_table())?;
			output(&args, &table.to_document(), || {
				RateReporter::new(&table).print_all_rates()
			})?;
		},
		Directive::Convert => {
			let table = report_error(&args, controller.rate_table())?;
			let term = args.term()?;
			let from = match &args.currency {
				Some(currency) => Amount::new(Quant::from_str(term)?, currency),
				// "100 USD" carries its own currency
				None if term.trim().contains(' ') => Amount::from_str(term)?,
				None => Amount::new(Quant::from_str(term)?, table.base()),
			};
			let to = args.to.as_deref().unwrap_or(table.base());
			let converted = report_error(
				&args,
				normalizer::convert_amount(&from, to, &table)
					.map_err(BoundaryError::from),
			)?;

			#[derive(Serialize)]
			struct Conversion<'a> {
				from: &'a Amount,
				to: &'a Amount,
			}

			output(
				&args,
				&Conversion {
					from: &from,
					to: &converted,
				},
				|| println!("{} = {}", from, converted),
			)?;
		},
	}

	Ok(())
}

/// Wires the file-backed collaborators named by flags or config into a
/// controller. Flags win over config.
fn build_controller(args: &Cli, config: &Config) -> Result<Controller, Error> {
	let store_path = args.file.as_deref().or(config.store());
	let mut store = match store_path {
		Some(path) => JsonInvoiceStore::open(Path::new(path))?,
		None => {
			if args.command != Directive::Rates && args.command != Directive::Convert {
				warn!("no invoice store given, nothing will be saved");
			}
			JsonInvoiceStore::in_memory()
		},
	};
	if args.dry_run {
		store = store.read_only();
	}

	let tenancies: Box<dyn TenancySource> =
		match args.tenancies.as_deref().or(config.tenancies()) {
			Some(path) => Box::new(TenancyFile::new(Path::new(path))),
			None if args.command == Directive::Generate => {
				bail!("No tenancy file specified (--tenancies or data.tenancies)")
			},
			None => Box::new(Vec::<Tenancy>::new()),
		};

	let rates: Box<dyn RateSource> = match (&args.rates, &config.rates) {
		(Some(path), _) => Box::new(RateFile::new(Path::new(path))),
		(None, Some(rates)) => match (&rates.file, &rates.url) {
			(Some(path), _) => Box::new(RateFile::new(Path::new(path))),
			(None, Some(url)) => Box::new(RateUrl::new(url, rates.api_key.clone())),
			(None, None) => Box::new(NoRates),
		},
		(None, None) => Box::new(NoRates),
	};

	let generator = InvoiceGenerator::new(config.due_day())?;
	let ledger = PaymentLedger::new(config.overpayment_tolerance())?;

	Ok(InvoiceController::new(store, tenancies, rates, generator, ledger))
}

/// Prints `value` as JSON when asked to, otherwise runs the human report.
fn output<T: Serialize>(
	args: &Cli,
	value: &T,
	human: impl FnOnce(),
) -> Result<(), Error> {
	if args.json {
		println!("{}", serde_json::to_string_pretty(value)?);
	} else {
		human();
	}
	Ok(())
}

/// In JSON mode a failed operation still answers on stdout, with the error
/// contract, before the process exits unsuccessfully.
fn report_error<T>(args: &Cli, result: Result<T, BoundaryError>) -> Result<T, Error> {
	match result {
		Ok(value) => Ok(value),
		Err(e) => {
			if args.json {
				#[derive(Serialize)]
				struct ErrorBody<'a> {
					error: &'a BoundaryError,
				}
				println!("{}", serde_json::to_string_pretty(&ErrorBody { error: &e })?);
			}
			Err(e.into())
		},
	}
}

fn get_range(args: &Cli, default: Period) -> Result<(Period, Period), Error> {
	let end = match &args.end {
		Some(e) => Period::from_str(e)?,
		None => default,
	};
	let begin = match &args.begin {
		Some(b) => Period::from_str(b)?,
		None => end,
	};

	if begin > end {
		bail!("Range begins ({}) after it ends ({})", begin, end);
	}

	Ok((begin, end))
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>, Error> {
	let Some(now) = now else {
		return Ok(Utc::now());
	};

	if now.contains('T') {
		return Ok(DateTime::parse_from_rfc3339(now)
			.map_err(|e| anyhow!("invalid --now '{}': {}", now, e))?
			.with_timezone(&Utc));
	}

	let date = Date::from_str(now)?;
	NaiveDate::from_ymd_opt(date.year() as i32, date.month() as u32, date.day() as u32)
		.and_then(|d| d.and_hms_opt(0, 0, 0))
		.map(|d| d.and_utc())
		.ok_or_else(|| anyhow!("invalid --now '{}'", now))
}

fn to_date(now: DateTime<Utc>) -> Date {
	Date::from_naive(now.date_naive())
}
