mod echo;
mod prompt;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use owo_colors::OwoColorize;
use ticket_report_core::{ClientConfig, LocationType, OperatorIdentity, ReportBuilder, TrackerClient};
use tracing_subscriber::EnvFilter;

use prompt::Prompter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generate ticket status reports from work item comments
#[derive(Parser, Debug)]
#[command(name = "ticket-report")]
#[command(author = "Ticket Report Contributors")]
#[command(version)]
#[command(about = "Generate ticket status reports from work item comments", long_about = None)]
struct Args {
    /// Work item ID (prompted when omitted)
    #[arg(short, long, value_name = "ID")]
    work_item: Option<u64>,

    /// Client name shown in the report
    #[arg(short, long, value_name = "NAME")]
    client: Option<String>,

    /// Where the work was performed (onsite, offsite)
    #[arg(short, long, value_name = "LOCATION")]
    location: Option<LocationType>,

    /// Word template with placeholders
    #[arg(short, long, env = "REPORT_TEMPLATE", default_value = "template.docx", value_name = "FILE")]
    template: PathBuf,

    /// Directory the report is written to
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    output_dir: PathBuf,

    /// Tracker collection/project URL
    #[arg(long, env = "TFS_ORG_URL", value_name = "URL")]
    org_url: Option<String>,

    /// Personal access token
    #[arg(long, env = "TFS_PAT", hide_env_values = true, value_name = "TOKEN")]
    pat: Option<String>,

    /// Your display name in the tracker
    #[arg(long, env = "REPORT_DISPLAY_NAME", value_name = "NAME")]
    display_name: Option<String>,

    /// Your unique name in the tracker
    #[arg(long, env = "REPORT_UNIQUE_NAME", value_name = "NAME", default_value = "")]
    unique_name: String,

    /// HTTP timeout in seconds
    #[arg(long, env = "REPORT_TIMEOUT", default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

/// One report to generate.
struct Request {
    work_item: u64,
    client: String,
    location: LocationType,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ticket_report=debug,ticket_report_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn required(value: Option<String>, name: &str, env: &str) -> anyhow::Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("Missing {}: pass --{} or set {}", name, name.replace(' ', "-"), env),
    }
}

fn next_request<R: io::BufRead, W: io::Write>(
    args: &Args, prompter: &mut Prompter<R, W>,
) -> anyhow::Result<Request> {
    let work_item = match args.work_item {
        Some(id) => id,
        None => prompter.work_item_id()?,
    };
    let client = match &args.client {
        Some(client) => client.clone(),
        None => prompter.client_name()?,
    };
    let location = match args.location {
        Some(location) => location,
        None => prompter.location()?,
    };
    Ok(Request { work_item, client, location })
}

fn write_report(
    builder: &ReportBuilder<'_>, template: &[u8], request: &Request, output_dir: &Path, verbose: bool,
) -> anyhow::Result<PathBuf> {
    if verbose {
        echo::print_step(1, 2, &format!("Building report for work item {}", request.work_item));
        echo::print_detail("Client", &request.client);
        echo::print_detail("Location", &request.location.to_string());
    }

    let document = builder.build_document(template, request.work_item, &request.client, request.location)?;

    if verbose {
        echo::print_detail("Title", &document.report.work_item.title);
        echo::print_detail("Comment date", &document.report.comment_date);
        echo::print_step(2, 2, "Writing document");
        echo::print_detail("Size", &echo::format_size(document.bytes.len()));
    }

    let path = output_dir.join(document.report.file_name());
    fs::write(&path, &document.bytes).with_context(|| format!("Failed to write to file: {}", path.display()))?;
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "ticket-report", &mut io::stdout());
        return Ok(());
    }

    init_tracing(args.verbose);

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    if !args.template.is_file() {
        bail!("Template not found: {}", args.template.display());
    }
    let template = fs::read(&args.template)
        .with_context(|| format!("Failed to read template: {}", args.template.display()))?;
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory: {}", args.output_dir.display()))?;

    let config = ClientConfig {
        org_url: required(args.org_url.clone(), "org url", "TFS_ORG_URL")?,
        pat: required(args.pat.clone(), "pat", "TFS_PAT")?,
        timeout: args.timeout,
        ..Default::default()
    };
    let identity = OperatorIdentity::new(
        required(args.display_name.clone(), "display name", "REPORT_DISPLAY_NAME")?,
        args.unique_name.clone(),
    );
    let client = TrackerClient::new(config).context("Invalid tracker configuration")?;
    let builder = ReportBuilder::new(&client, &identity);

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stderr());
    let repeat = args.work_item.is_none();

    loop {
        let request = next_request(&args, &mut prompter)?;

        match write_report(&builder, &template, &request, &args.output_dir, args.verbose) {
            Ok(path) => echo::print_success(&format!("Report saved as {}", path.display().bright_white())),
            Err(e) if repeat => echo::print_error(&format!("{:#}", e)),
            Err(e) => return Err(e.context(format!("Failed to create report for work item {}", request.work_item))),
        }

        if !repeat || !prompter.another()? {
            break;
        }
    }

    Ok(())
}
