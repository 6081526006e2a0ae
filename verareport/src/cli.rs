//! CLI argument parsing for verareport
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use veracode_detailedreport::{AuthMethod, BuildId, VeracodeRegion};

#[derive(Parser, Debug)]
#[command(
    name = "verareport",
    version,
    about = "Veracode detailed report retrieval tool",
    long_about = "Retrieves the detailed report for a Veracode build (or reads a saved report) and prints its flaws and custom fields",
    after_help = "ENVIRONMENT:
  VERACODE_API_ID          API ID (or username with --auth basic)
  VERACODE_API_KEY         API key (or password with --auth basic)
  VERACODE_PROXY_URL       Optional HTTP(S) proxy
  VERACODE_PROXY_USERNAME  Optional proxy username
  VERACODE_PROXY_PASSWORD  Optional proxy password
  RUST_LOG                 Log filter (default: info)

EXIT CODES:
  0  Report retrieved and written
  1  Retrieval, parsing or output failed
  2  Report written, but the document contained an error element

EXAMPLES:
  verareport --build-id 1234567 --format summary
  verareport --input detailedreport.xml --output flaws.json"
)]
pub struct Cli {
    /// Build to retrieve the detailed report for
    #[arg(long, required_unless_present = "input", conflicts_with = "input", value_parser = clap::value_parser!(BuildId))]
    pub build_id: Option<BuildId>,

    /// Parse a detailed report XML file instead of calling the API
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Veracode region (commercial, european, federal)
    #[arg(long, default_value = "commercial", value_parser = clap::value_parser!(Region))]
    pub region: Region,

    /// Authentication scheme (hmac, basic)
    #[arg(long, default_value = "hmac", value_parser = clap::value_parser!(AuthScheme))]
    pub auth: AuthScheme,

    /// JSON file of category ID to name overrides, e.g. {"19": "SQL Injection"}
    #[arg(long)]
    pub categories: Option<PathBuf>,

    /// Output format (json, summary)
    #[arg(short, long, default_value = "json", value_parser = clap::value_parser!(OutputFormat))]
    pub format: OutputFormat,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = veracode_detailedreport::DEFAULT_CONNECT_TIMEOUT, value_parser = validate_timeout)]
    pub connect_timeout: u64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = veracode_detailedreport::DEFAULT_REQUEST_TIMEOUT, value_parser = validate_timeout)]
    pub request_timeout: u64,

    /// Disable TLS certificate validation (development only)
    #[arg(long)]
    pub insecure: bool,
}

/// Veracode regions accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Commercial,
    European,
    Federal,
}

impl Region {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Commercial => "commercial",
            Self::European => "european",
            Self::Federal => "federal",
        }
    }

    #[must_use]
    pub fn valid_values() -> &'static str {
        "commercial, european, federal"
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commercial" => Ok(Self::Commercial),
            "european" => Ok(Self::European),
            "federal" => Ok(Self::Federal),
            _ => Err(format!(
                "Invalid region '{}'. Valid values: {}",
                s,
                Self::valid_values()
            )),
        }
    }
}

impl From<Region> for VeracodeRegion {
    fn from(region: Region) -> Self {
        match region {
            Region::Commercial => VeracodeRegion::Commercial,
            Region::European => VeracodeRegion::European,
            Region::Federal => VeracodeRegion::Federal,
        }
    }
}

/// Authentication schemes accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Hmac,
    Basic,
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hmac" => Ok(Self::Hmac),
            "basic" => Ok(Self::Basic),
            _ => Err(format!("Invalid auth scheme '{s}'. Valid values: hmac, basic")),
        }
    }
}

impl From<AuthScheme> for AuthMethod {
    fn from(scheme: AuthScheme) -> Self {
        match scheme {
            AuthScheme::Hmac => AuthMethod::Hmac,
            AuthScheme::Basic => AuthMethod::Basic,
        }
    }
}

/// How the parsed report is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Summary,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "summary" => Ok(Self::Summary),
            _ => Err(format!("Invalid format '{s}'. Valid values: json, summary")),
        }
    }
}

/// Validate a timeout in seconds (1-3600)
fn validate_timeout(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of seconds"))?;
    if value == 0 {
        return Err("Timeout must be greater than 0".to_string());
    }
    if value > 3600 {
        return Err(format!("Timeout must not exceed 3600 seconds (got {value})"));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_id_defaults() {
        let cli = Cli::try_parse_from(["verareport", "--build-id", "123"]).unwrap();
        assert_eq!(cli.build_id.unwrap().as_str(), "123");
        assert!(cli.input.is_none());
        assert_eq!(cli.region, Region::Commercial);
        assert_eq!(cli.auth, AuthScheme::Hmac);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.connect_timeout, 30);
        assert_eq!(cli.request_timeout, 300);
        assert!(!cli.insecure);
    }

    #[test]
    fn test_source_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["verareport"]).is_err());
        assert!(
            Cli::try_parse_from(["verareport", "--build-id", "1", "--input", "r.xml"]).is_err()
        );
        assert!(Cli::try_parse_from(["verareport", "--input", "r.xml"]).is_ok());
    }

    #[test]
    fn test_invalid_build_id_rejected() {
        assert!(Cli::try_parse_from(["verareport", "--build-id", "12;rm"]).is_err());
    }

    #[test]
    fn test_enum_options() {
        let cli = Cli::try_parse_from([
            "verareport",
            "--build-id",
            "5",
            "--region",
            "European",
            "--auth",
            "BASIC",
            "--format",
            "summary",
        ])
        .unwrap();
        assert_eq!(cli.region, Region::European);
        assert_eq!(VeracodeRegion::from(cli.region), VeracodeRegion::European);
        assert_eq!(AuthMethod::from(cli.auth), AuthMethod::Basic);
        assert_eq!(cli.format, OutputFormat::Summary);

        assert!(Cli::try_parse_from(["verareport", "--build-id", "5", "--region", "us"]).is_err());
        assert!(Cli::try_parse_from(["verareport", "--build-id", "5", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_validate_timeout() {
        assert_eq!(validate_timeout("10"), Ok(10));
        assert!(validate_timeout("0").is_err());
        assert!(validate_timeout("3601").is_err());
        assert!(validate_timeout("soon").is_err());
    }
}
