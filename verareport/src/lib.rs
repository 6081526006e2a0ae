//! Verareport library - detailed report retrieval for Veracode
//!
//! Loads a detailed report either from the XML API or from a saved file,
//! parses it and renders the flaws and custom fields as JSON or a summary.
pub mod cli;
pub mod credentials;
pub mod error;
pub mod output;

use log::{info, warn};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use veracode_detailedreport::{
    AuthMethod, CategoryMap, DetailedReport, DetailedReportApi, DetailedReportParser,
    VeracodeClient, VeracodeConfig, VeracodeRegion,
};

// Re-export commonly used types
pub use error::{ReportError, Result};

/// Exit code when the report contained an `error` element
pub const EXIT_API_ERROR: u8 = 2;

/// How a completed run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Report written without a document-level error
    Success,
    /// Report written, but the document contained an `error` element
    ApiError,
}

impl Outcome {
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::ApiError => ExitCode::from(EXIT_API_ERROR),
        }
    }
}

/// Build the category table: built-in names with optional overrides from a JSON file
pub fn load_categories(path: Option<&Path>) -> Result<CategoryMap> {
    let builtin = CategoryMap::builtin();
    match path {
        Some(path) => {
            let file = fs::File::open(path)?;
            let overrides = CategoryMap::from_json_reader(std::io::BufReader::new(file))?;
            info!(
                "Loaded {} category override(s) from {}",
                overrides.len(),
                path.display()
            );
            Ok(builtin.with_overrides(overrides))
        }
        None => Ok(builtin),
    }
}

/// Client configuration from CLI options and environment lookups
pub fn build_config<F>(args: &cli::Cli, lookup: F) -> Result<VeracodeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let auth = AuthMethod::from(args.auth);
    let api_credentials = credentials::load_credentials(&lookup, auth)?;
    let proxy = credentials::load_proxy(&lookup);

    let mut config = VeracodeConfig::from_credentials(api_credentials)
        .with_region(VeracodeRegion::from(args.region))
        .with_auth_method(auth)
        .with_timeouts(args.connect_timeout, args.request_timeout);

    if args.insecure {
        warn!("TLS certificate validation is disabled");
        config = config.with_certificate_validation_disabled();
    }

    Ok(credentials::apply_proxy(config, proxy))
}

/// Obtain and parse the report selected by `args`
pub async fn load_report<F>(args: &cli::Cli, lookup: F) -> Result<DetailedReport>
where
    F: Fn(&str) -> Option<String>,
{
    let parser = DetailedReportParser::new(load_categories(args.categories.as_deref())?);

    if let Some(input) = &args.input {
        info!("Parsing detailed report from {}", input.display());
        let document = fs::read(input)?;
        return Ok(parser.parse(&document)?);
    }

    let build_id = args.build_id.as_ref().ok_or_else(|| {
        ReportError::InvalidConfig("either --build-id or --input is required".to_string())
    })?;

    info!(
        "Retrieving detailed report for build {build_id} ({} region)",
        args.region.as_str()
    );
    let client = VeracodeClient::new(build_config(args, lookup)?)?;
    let api = DetailedReportApi::with_parser(client, parser);
    Ok(api.get_detailed_report(build_id).await?)
}

/// Run the tool: load the report, write it out and classify the result
pub async fn run<F>(args: &cli::Cli, lookup: F) -> Result<Outcome>
where
    F: Fn(&str) -> Option<String>,
{
    let report = load_report(args, lookup).await?;
    info!(
        "Report contains {} flaw(s) and {} custom field(s)",
        report.flaws.len(),
        report.custom_fields.len()
    );

    output::write_report(&report, args.format, args.output.as_deref())?;

    match report.error() {
        Some(err) => {
            warn!("{err}");
            Ok(Outcome::ApiError)
        }
        None => Ok(Outcome::Success),
    }
}
