//! ipcheck - IP address and DNSSEC resolver check
//!
//! Binary entry point for the ipcheck CLI application.

#![warn(clippy::all, warnings)]
#![warn(clippy::pedantic, clippy::nursery)]

use clap::CommandFactory;
use ipcheck::cli::{Cli, Commands, OutputFormat};
use ipcheck::client::state::{Slot, Update};
use ipcheck::client::{ApiClient, Orchestrator, ResultsState, StunGatherer};
use ipcheck::config::{ConfigLoader, Overrides, Settings};
use ipcheck::dns::{
    DnssecAlgorithm, DnssecCondition, DnssecProbeResult, DnssecProber, DnssecSummary, DohClient,
    ReverseDnsClient,
};
use ipcheck::error::{Error, Result};
use ipcheck::geo::GeoClient;
use ipcheck::lookup::{AddressLookup, AddressRecord};
use ipcheck::net;
use ipcheck::tui::App;
use serde::Serialize;
use std::net::IpAddr;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Set up logging based on verbosity level.
///
/// Logs go to stderr so JSON output on stdout stays parseable.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging
/// * `quiet` - Enable error-level only logging
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

/// Serialize as pretty JSON to stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_ip(text: &str) -> Result<IpAddr> {
    text.trim()
        .parse()
        .map_err(|_| Error::invalid_input(format!("Invalid IP address: {text}")))
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// One-line summary of an address record.
fn format_record(record: &AddressRecord) -> String {
    let geo = &record.geo;
    let location: Vec<&str> = [&geo.city, &geo.region, &geo.country]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .collect();
    format!(
        "{:<40} {:<36} {:<28} {}",
        record.ip,
        or_dash(record.hostname.as_deref()),
        if location.is_empty() {
            "-".to_string()
        } else {
            location.join(", ")
        },
        or_dash(geo.org.as_deref())
    )
}

/// Print one record in table format.
fn print_record_table(record: &AddressRecord) {
    let geo = &record.geo;
    println!("IP:        {} ({})", record.ip, record.version);
    println!("Hostname:  {}", or_dash(record.hostname.as_deref()));
    println!("City:      {}", or_dash(geo.city.as_deref()));
    println!("Region:    {}", or_dash(geo.region.as_deref()));
    println!("Country:   {}", or_dash(geo.country.as_deref()));
    println!("Org:       {}", or_dash(geo.org.as_deref()));
    println!("Timezone:  {}", or_dash(geo.timezone.as_deref()));
}

fn format_probe(r: &DnssecProbeResult) -> String {
    let verdict = if r.passed { "PASS" } else { "FAIL" };
    let detail = r.error.as_deref().unwrap_or("");
    format!(
        "{:<12} {:<8} {:<5} {:<40} {}",
        r.algorithm.label(),
        r.condition,
        verdict,
        r.domain,
        detail
    )
}

/// Print DNSSEC results in table format.
fn print_dnssec_table(results: &[DnssecProbeResult]) {
    println!(
        "{:<12} {:<8} {:<5} {:<40} {}",
        "Algorithm", "Test", "Result", "Domain", "Detail"
    );
    println!("{}", "-".repeat(90));
    for r in results {
        println!("{}", format_probe(r));
    }
}

fn print_dnssec_summary(summary: &DnssecSummary) {
    println!("\n=== Summary ===");
    println!("Cells:   {}", summary.total);
    println!("Passed:  {}", summary.passed);
    println!("Failed:  {}", summary.failed);
    println!(
        "Resolver validates DNSSEC: {}",
        if summary.validates { "yes" } else { "no" }
    );
}

/// Look up one address directly against the upstream providers.
async fn run_lookup(settings: &Settings, ip: &str, format: OutputFormat) -> Result<()> {
    let ip = parse_ip(ip)?;
    let http = settings.http_client()?;
    let lookup = AddressLookup::new(
        GeoClient::new(http.clone(), settings.geo.clone()),
        ReverseDnsClient::new(DohClient::new(http, &settings.doh.ptr_url)),
    );

    let record = lookup.lookup(ip).await;
    match format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => print_record_table(&record),
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PtrReport {
    ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expanded: Option<String>,
    ptr_name: String,
    hostname: Option<String>,
}

/// Build the PTR name for an address and resolve it.
async fn run_ptr(settings: &Settings, ip: &str, format: OutputFormat) -> Result<()> {
    let addr = parse_ip(ip)?;
    let text = addr.to_string();
    let expanded = match addr {
        IpAddr::V6(_) => Some(net::expand_ipv6(&text)?),
        IpAddr::V4(_) => None,
    };
    let ptr_name = net::build_ptr_name(&text)?;

    let resolver = ReverseDnsClient::new(DohClient::new(
        settings.http_client()?,
        &settings.doh.ptr_url,
    ));
    let hostname = resolver.lookup(&text).await;

    let report = PtrReport {
        ip: text,
        expanded,
        ptr_name,
        hostname,
    };
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("IP:        {}", report.ip);
            if let Some(expanded) = &report.expanded {
                println!("Expanded:  {expanded}");
            }
            println!("PTR name:  {}", report.ptr_name);
            println!("Hostname:  {}", or_dash(report.hostname.as_deref()));
        }
    }
    Ok(())
}

/// Probe DNSSEC cells directly through the configured resolver.
///
/// # Arguments
///
/// * `algorithm` - Optional algorithm filter
/// * `test` - Optional condition filter
/// * `format` - Output format
async fn run_dnssec(
    settings: &Settings,
    algorithm: Option<&str>,
    test: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let algorithm = algorithm.map(str::parse::<DnssecAlgorithm>).transpose()?;
    let condition = test.map(str::parse::<DnssecCondition>).transpose()?;

    let prober = DnssecProber::new(
        DohClient::new(settings.http_client()?, &settings.doh.dnssec_url),
        settings.dnssec_catalog(),
    );

    let selected = |a: DnssecAlgorithm, c: DnssecCondition| {
        algorithm.map_or(true, |x| x == a) && condition.map_or(true, |x| x == c)
    };
    let interactive = format == OutputFormat::Table;

    if interactive {
        let total = prober.catalog().cells().filter(|(a, c)| selected(*a, *c)).count();
        println!(
            "Probing {} via {} ({total} cells)...\n",
            settings.dnssec_test_zone.as_deref().unwrap_or("public test domains"),
            settings.doh.dnssec_url
        );
    }

    let progress = |idx: usize, total: usize, r: &DnssecProbeResult| {
        print!(
            "\rProbed [{:>2}/{total}] {} {}        ",
            idx + 1,
            r.algorithm.label(),
            r.condition
        );
        let _ = std::io::Write::flush(&mut std::io::stdout());
    };
    let results = prober
        .probe_matching(selected, interactive.then_some(progress))
        .await;

    let summary = DnssecProber::summarize(&results);
    match format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({ "results": results, "summary": summary }))?;
        }
        OutputFormat::Table => {
            println!("\r{}\r", " ".repeat(60));
            print_dnssec_table(&results);
            print_dnssec_summary(&summary);
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    server: &'a str,
    #[serde(flatten)]
    state: &'a ResultsState,
    additional_addresses: Vec<IpAddr>,
    dnssec_summary: DnssecSummary,
}

/// Print one update as a line as soon as it arrives.
fn print_update(update: &Update, state: &ResultsState) {
    match update {
        Update::Address { version, result } => match result {
            Ok(record) => println!("{:<8} {}", version.to_string(), format_record(record)),
            Err(msg) => println!("{:<8} {msg}", version.to_string()),
        },
        Update::WebRtc(Ok(report)) => {
            let list = |ips: &[IpAddr]| {
                ips.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!(
                "{:<8} public: [{}]  private: [{}]  mDNS hidden: {}",
                "WebRTC",
                list(&report.public),
                list(&report.private),
                report.mdns_hidden
            );
        }
        Update::WebRtc(Err(msg)) => println!("{:<8} {msg}", "WebRTC"),
        Update::Dnssec { result, algorithm, condition } => {
            let done = state.dnssec_done();
            let total = state.dnssec.len();
            match result {
                Ok(r) => println!("DNSSEC   [{done:>2}/{total}] {}", format_probe(r)),
                Err(msg) => println!(
                    "DNSSEC   [{done:>2}/{total}] {:<12} {:<8} ERROR {msg}",
                    algorithm.label(),
                    condition
                ),
            }
        }
        Update::Fingerprint(_) | Update::Headers(_) | Update::Finished(_) => {}
    }
}

/// Check this machine against a running service.
async fn run_check(
    settings: &Settings,
    tui: bool,
    no_webrtc: bool,
    format: OutputFormat,
) -> Result<()> {
    let api = ApiClient::new(&settings.server, settings.timeout())?;
    let source = (!no_webrtc).then(|| StunGatherer::new(settings.stun_servers.clone()));
    let orchestrator = Orchestrator::new(api, source, settings.ice_timeout());

    if tui {
        let mut app = App::new(orchestrator, &settings.server);
        return app.run().await;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let run = async {
        orchestrator.run(&tx).await;
        drop(tx);
    };

    let mut state = ResultsState::new();
    let stream = async {
        while let Some(update) = rx.recv().await {
            state.apply(update.clone());
            if format == OutputFormat::Table {
                print_update(&update, &state);
            }
        }
    };
    tokio::join!(run, stream);

    let report = CheckReport {
        server: &settings.server,
        additional_addresses: state.additional_addresses(),
        dnssec_summary: state.dnssec_summary(),
        state: &state,
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if !report.additional_addresses.is_empty() {
                println!(
                    "\nLeaked via WebRTC (not seen by the server): {}",
                    report
                        .additional_addresses
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            if let Slot::Ready(fp) = &state.fingerprint {
                println!(
                    "\nDevice:   {} / {}, {} CPUs, locale {}, UTC{}",
                    fp.os,
                    fp.arch,
                    fp.cpu_count,
                    or_dash(fp.locale.as_deref()),
                    fp.utc_offset
                );
            }
            print_dnssec_summary(&report.dnssec_summary);
        }
    }
    Ok(())
}

/// Write the effective settings to a config file.
fn run_config(settings: &Settings, output: Option<std::path::PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| ConfigLoader::config_dir().join("config.json"));
    ConfigLoader::save(settings, &path)?;
    println!("Settings written to: {}", path.display());
    Ok(())
}

/// Main entry point for the ipcheck CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let (cli, verbose) = ipcheck::cli::parse_verbose();
    let tui_mode = matches!(
        cli.command,
        None | Some(Commands::Check { tui: true, .. })
    );
    // the TUI owns the terminal; only errors may be printed
    setup_logging(verbose && !tui_mode, cli.quiet || tui_mode);

    let overrides = Overrides {
        listen: match &cli.command {
            Some(Commands::Serve { listen }) => listen.clone(),
            _ => None,
        },
        server: match &cli.command {
            Some(Commands::Check { server, .. }) => server.clone(),
            _ => None,
        },
        ipinfo_token: cli.ipinfo_token.clone(),
    };
    let settings = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;

    tracing::debug!("ipcheck starting...");

    match cli.command {
        Some(Commands::Serve { .. }) => {
            ipcheck::server::serve(&settings).await?;
        }

        Some(Commands::Check { tui, no_webrtc, .. }) => {
            run_check(&settings, tui, no_webrtc, cli.format).await?;
        }

        Some(Commands::Lookup { ip }) => {
            run_lookup(&settings, &ip, cli.format).await?;
        }

        Some(Commands::Dnssec { algorithm, test }) => {
            run_dnssec(&settings, algorithm.as_deref(), test.as_deref(), cli.format).await?;
        }

        Some(Commands::Ptr { ip }) => {
            run_ptr(&settings, &ip, cli.format).await?;
        }

        Some(Commands::Config { output }) => {
            run_config(&settings, output)?;
        }

        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "ipcheck", &mut std::io::stdout());
        }

        None => {
            // Default to the interactive check
            run_check(&settings, true, false, cli.format).await?;
        }
    }

    Ok(())
}

