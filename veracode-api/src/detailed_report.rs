//! Detailed Report API functionality for the Veracode platform.
//!
//! This module retrieves the `detailedreport.do` XML document for a build and
//! turns it into [`Flaw`] records (with their mitigation and annotation
//! history) and [`CustomField`] records.
//!
//! The document is read in a single streaming pass. The root
//! `detailedreport` element carries the report metadata; its policy name is
//! stamped onto every flaw once the pass completes, and each flaw's category
//! name is resolved through the parser's [`CategoryMap`].

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use crate::category::CategoryMap;
use crate::validation::{BuildId, ValidationError};
use crate::{VeracodeClient, VeracodeError};

/// XML API endpoint serving the detailed report
pub const DETAILED_REPORT_ENDPOINT: &str = "/api/5.0/detailedreport.do";

/// Message used when the document's `error` element carries no text
pub const API_ERROR_MESSAGE: &str = "api for GetDetailedReport returned with an error element";

const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Application and policy information from the root `detailedreport` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub app_name: String,
    pub app_id: String,
    pub policy_name: String,
    pub policy_compliance_status: String,
    pub policy_rules_status: String,
    pub grace_period_expired: Option<bool>,
    pub business_unit: String,
}

/// A formal mitigation action recorded against a flaw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mitigation {
    pub action: String,
    pub description: String,
    pub user: String,
    pub date: String,
}

impl Mitigation {
    /// The mitigation date as UTC, if it is in the report's timestamp format
    #[must_use]
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        parse_report_timestamp(&self.date)
    }
}

/// A comment recorded against a flaw, separate from mitigation actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub action: String,
    pub description: String,
    pub user: String,
    pub date: String,
}

impl Annotation {
    /// The annotation date as UTC, if it is in the report's timestamp format
    #[must_use]
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        parse_report_timestamp(&self.date)
    }
}

/// A finding from a Veracode test (static, dynamic or manual)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flaw {
    pub issue_id: Option<u64>,
    /// CWE name, reported by the API in the `categoryname` attribute
    pub cwe_name: String,
    pub category_id: Option<u32>,
    /// Resolved from the `categoryid` attribute; empty when the ID is unknown
    /// or not written in plain decimal form
    pub category_name: String,
    pub cwe_id: Option<u32>,
    pub remediation_status: String,
    pub mitigation_status: String,
    pub affects_policy_compliance: Option<bool>,
    /// Copied from the report's policy name
    pub policy_name: String,
    pub date_first_occurrence: String,
    pub severity: Option<u8>,
    pub exploit_level: Option<i8>,
    pub module: String,
    pub source_file: String,
    pub line: Option<u32>,
    pub description: String,
    pub mitigations: Vec<Mitigation>,
    pub annotations: Vec<Annotation>,
    /// Original text of numeric or boolean attributes that failed to parse,
    /// keyed by attribute name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub raw_attributes: BTreeMap<String, String>,
}

impl Flaw {
    /// When the flaw was first seen, as UTC
    #[must_use]
    pub fn first_occurrence(&self) -> Option<DateTime<Utc>> {
        parse_report_timestamp(&self.date_first_occurrence)
    }

    /// Whether the flaw counts against policy compliance (absent means no)
    #[must_use]
    pub fn affects_policy(&self) -> bool {
        self.affects_policy_compliance.unwrap_or(false)
    }

    /// Whether the flaw is still present in the scanned build
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.remediation_status.eq_ignore_ascii_case("Fixed")
    }

    /// Whether a proposed mitigation has been accepted
    #[must_use]
    pub fn is_mitigation_accepted(&self) -> bool {
        self.mitigation_status.eq_ignore_ascii_case("accepted")
    }
}

/// A custom field of the application profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
}

/// An element-level problem that was absorbed during parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub element: String,
    pub attribute: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.element)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " @{attribute}")?;
        }
        if let Some(value) = &self.value {
            write!(f, " = {value:?}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Everything extracted from one detailed report document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedReport {
    /// Root element attributes; `None` when the document has no
    /// `detailedreport` element
    pub metadata: Option<ReportMetadata>,
    /// Flaws in document order
    pub flaws: Vec<Flaw>,
    /// Custom fields in document order
    pub custom_fields: Vec<CustomField>,
    /// Message of the document's `error` element, if any
    pub api_error: Option<String>,
    /// Element-level decode problems
    pub warnings: Vec<ParseWarning>,
}

impl DetailedReport {
    /// The document-level error, returned alongside whatever data was present
    #[must_use]
    pub fn error(&self) -> Option<DetailedReportError> {
        self.api_error
            .as_ref()
            .map(|message| DetailedReportError::ApiError(message.clone()))
    }

    #[must_use]
    pub fn has_api_error(&self) -> bool {
        self.api_error.is_some()
    }

    /// Split into flaws, custom fields and the document-level error
    #[must_use]
    pub fn into_parts(self) -> (Vec<Flaw>, Vec<CustomField>, Option<DetailedReportError>) {
        let error = self.api_error.map(DetailedReportError::ApiError);
        (self.flaws, self.custom_fields, error)
    }

    /// Policy name from the report root, or `""`
    #[must_use]
    pub fn policy_name(&self) -> &str {
        self.metadata
            .as_ref()
            .map_or("", |metadata| metadata.policy_name.as_str())
    }

    /// Value of the first custom field called `name`
    #[must_use]
    pub fn custom_field(&self, name: &str) -> Option<&str> {
        self.custom_fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    pub fn policy_affecting_flaws(&self) -> impl Iterator<Item = &Flaw> {
        self.flaws.iter().filter(|flaw| flaw.affects_policy())
    }

    pub fn open_flaws(&self) -> impl Iterator<Item = &Flaw> {
        self.flaws.iter().filter(|flaw| flaw.is_open())
    }

    /// Number of flaws per severity level; flaws without a severity are skipped
    #[must_use]
    pub fn severity_counts(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for severity in self.flaws.iter().filter_map(|flaw| flaw.severity) {
            let count = counts.entry(severity).or_insert(0usize);
            *count = count.saturating_add(1);
        }
        counts
    }
}

/// Detailed report specific error types
#[derive(Debug, thiserror::Error)]
pub enum DetailedReportError {
    /// Veracode API transport error
    #[error("API error: {0}")]
    Api(#[from] VeracodeError),
    /// Invalid request input
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
    /// Unauthorized access
    #[error("Unauthorized access")]
    Unauthorized,
    /// Permission denied
    #[error("Permission denied")]
    PermissionDenied,
    /// Build not found
    #[error("Build not found")]
    BuildNotFound,
    /// Any other non-success HTTP status
    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    /// The document is not well-formed XML
    #[error("XML parsing error at byte {position}: {message}")]
    Xml { position: u64, message: String },
    /// The document contained an `error` element
    #[error("{0}")]
    ApiError(String),
}

impl From<reqwest::Error> for DetailedReportError {
    fn from(err: reqwest::Error) -> Self {
        DetailedReportError::Api(VeracodeError::Http(err))
    }
}

/// Parse a report timestamp such as `2019-03-20 14:39:52 UTC`
#[must_use]
pub fn parse_report_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_zone = trimmed.strip_suffix("UTC").map_or(trimmed, str::trim_end);
    NaiveDateTime::parse_from_str(without_zone, REPORT_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Which list inside a `flaw` element is currently being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlawSection {
    Mitigations,
    Annotations,
    Other,
}

/// Shared `action, description, user, date` attributes of history entries
#[derive(Default)]
struct HistoryAttributes {
    action: String,
    description: String,
    user: String,
    date: String,
}

impl From<HistoryAttributes> for Mitigation {
    fn from(attrs: HistoryAttributes) -> Self {
        Self {
            action: attrs.action,
            description: attrs.description,
            user: attrs.user,
            date: attrs.date,
        }
    }
}

impl From<HistoryAttributes> for Annotation {
    fn from(attrs: HistoryAttributes) -> Self {
        Self {
            action: attrs.action,
            description: attrs.description,
            user: attrs.user,
            date: attrs.date,
        }
    }
}

/// Parser for detailed report documents
#[derive(Debug, Clone)]
pub struct DetailedReportParser {
    categories: Arc<CategoryMap>,
}

impl Default for DetailedReportParser {
    fn default() -> Self {
        Self::new(CategoryMap::builtin())
    }
}

impl DetailedReportParser {
    /// Create a parser owning `categories`
    #[must_use]
    pub fn new(categories: CategoryMap) -> Self {
        Self {
            categories: Arc::new(categories),
        }
    }

    /// Create a parser sharing an existing category table
    #[must_use]
    pub fn with_shared_categories(categories: Arc<CategoryMap>) -> Self {
        Self { categories }
    }

    #[must_use]
    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Parse a detailed report document.
    ///
    /// Flaws and custom fields are collected in document order. An `error`
    /// element does not stop the scan: it is reported through
    /// [`DetailedReport::error`] next to the collected data. Malformed
    /// attributes are recorded as [`ParseWarning`]s.
    ///
    /// # Errors
    ///
    /// Returns [`DetailedReportError::Xml`] when the document is not
    /// well-formed XML, including documents that end with elements still open.
    pub fn parse(&self, document: &[u8]) -> Result<DetailedReport, DetailedReportError> {
        let mut reader = Reader::from_reader(document);
        reader.config_mut().trim_text(true);

        let mut report = DetailedReport::default();
        let mut depth: usize = 0;
        let mut error_text: Option<ErrorText> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| xml_error(reader.error_position(), &e))?;

            match event {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"flaw" => {
                        let flaw = self.read_flaw(&mut reader, e, &mut report.warnings)?;
                        report.flaws.push(flaw);
                    }
                    b"customfield" => {
                        let field = decode_custom_field(e, &mut report.warnings);
                        report.custom_fields.push(field);
                        reader
                            .read_to_end(e.name())
                            .map_err(|err| xml_error(reader.error_position(), &err))?;
                    }
                    b"error" if error_text.is_none() => {
                        depth = depth.saturating_add(1);
                        error_text = Some(ErrorText::new(depth));
                        // Keep whitespace around entity references in the message
                        reader.config_mut().trim_text(false);
                    }
                    name => {
                        handle_report_element(name, e, &mut report);
                        depth = depth.saturating_add(1);
                    }
                },
                Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"flaw" => {
                        let flaw = self.decode_flaw(e, &mut report.warnings);
                        report.flaws.push(flaw);
                    }
                    b"error" if error_text.is_none() => record_api_error(&mut report, ""),
                    name => handle_report_element(name, e, &mut report),
                },
                Event::Text(ref t) => {
                    if let Some(open) = error_text.as_mut() {
                        open.push_escaped(&String::from_utf8_lossy(t));
                    }
                }
                Event::GeneralRef(ref r) => {
                    if let Some(open) = error_text.as_mut() {
                        open.push_escaped(&format!("&{};", String::from_utf8_lossy(r)));
                    }
                }
                Event::CData(ref c) => {
                    if let Some(open) = error_text.as_mut() {
                        open.text.push_str(&String::from_utf8_lossy(c));
                    }
                }
                Event::End(_) => {
                    match error_text.take() {
                        Some(open) if open.level == depth => {
                            record_api_error(&mut report, &open.text);
                            reader.config_mut().trim_text(true);
                        }
                        other => error_text = other,
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => {
                    if depth > 0 {
                        return Err(DetailedReportError::Xml {
                            position: to_position(reader.buffer_position()),
                            message: format!(
                                "unexpected end of document with {depth} element(s) still open"
                            ),
                        });
                    }
                    break;
                }
                _ => {}
            }
        }

        let policy_name = report.policy_name().to_string();
        for flaw in &mut report.flaws {
            flaw.policy_name.clone_from(&policy_name);
        }

        debug!(
            "Parsed detailed report: {} flaws, {} custom fields, api error: {}",
            report.flaws.len(),
            report.custom_fields.len(),
            report.has_api_error()
        );

        Ok(report)
    }

    /// Decode a `flaw` start tag and consume its subtree
    fn read_flaw(
        &self,
        reader: &mut Reader<&[u8]>,
        start: &BytesStart<'_>,
        warnings: &mut Vec<ParseWarning>,
    ) -> Result<Flaw, DetailedReportError> {
        let mut flaw = self.decode_flaw(start, warnings);
        let mut section = FlawSection::Other;
        let mut depth: usize = 0;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| xml_error(reader.error_position(), &e))?;

            match event {
                Event::Start(ref e) => {
                    depth = depth.saturating_add(1);
                    read_flaw_child(e, depth, &mut section, &mut flaw, warnings);
                }
                Event::Empty(ref e) => {
                    read_flaw_child(e, depth.saturating_add(1), &mut section, &mut flaw, warnings);
                }
                Event::End(_) => {
                    if depth == 0 {
                        break;
                    }
                    if depth == 1 {
                        section = FlawSection::Other;
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => {
                    return Err(DetailedReportError::Xml {
                        position: to_position(reader.buffer_position()),
                        message: "unexpected end of document inside <flaw>".to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(flaw)
    }

    /// Decode the attributes of a `flaw` element
    fn decode_flaw(&self, e: &BytesStart<'_>, warnings: &mut Vec<ParseWarning>) -> Flaw {
        let mut flaw = Flaw::default();
        let mut category_key = None;

        for_each_attribute(e, "flaw", warnings, |key, value, warnings| match key {
            b"issueid" => {
                let parsed = parse_number("flaw", "issueid", &value, warnings);
                flaw.issue_id = keep_unparsed(parsed, "issueid", value, &mut flaw.raw_attributes);
            }
            b"categoryname" => flaw.cwe_name = value,
            b"categoryid" => {
                let parsed: Option<u32> = parse_number("flaw", "categoryid", &value, warnings);
                // Category names are keyed by the ID's decimal text
                category_key = parsed.filter(|id| id.to_string() == value);
                flaw.category_id =
                    keep_unparsed(parsed, "categoryid", value, &mut flaw.raw_attributes);
            }
            b"cweid" => {
                let parsed = parse_number("flaw", "cweid", &value, warnings);
                flaw.cwe_id = keep_unparsed(parsed, "cweid", value, &mut flaw.raw_attributes);
            }
            b"remediation_status" => flaw.remediation_status = value,
            b"mitigation_status" => flaw.mitigation_status = value,
            b"affects_policy_compliance" => {
                let parsed = parse_bool("flaw", "affects_policy_compliance", &value, warnings);
                flaw.affects_policy_compliance = keep_unparsed(
                    parsed,
                    "affects_policy_compliance",
                    value,
                    &mut flaw.raw_attributes,
                );
            }
            b"date_first_occurrence" => flaw.date_first_occurrence = value,
            b"severity" => {
                let parsed = parse_number("flaw", "severity", &value, warnings);
                flaw.severity = keep_unparsed(parsed, "severity", value, &mut flaw.raw_attributes);
            }
            b"exploitLevel" => {
                let parsed = parse_number("flaw", "exploitLevel", &value, warnings);
                flaw.exploit_level =
                    keep_unparsed(parsed, "exploitLevel", value, &mut flaw.raw_attributes);
            }
            b"module" => flaw.module = value,
            b"sourcefile" => flaw.source_file = value,
            b"line" => {
                let parsed = parse_number("flaw", "line", &value, warnings);
                flaw.line = keep_unparsed(parsed, "line", value, &mut flaw.raw_attributes);
            }
            b"description" => flaw.description = value,
            _ => {}
        });

        if let Some(category_id) = category_key {
            flaw.category_name = self.categories.name(category_id).to_string();
        }

        flaw
    }
}

/// Root metadata, and custom fields written as empty tags
fn handle_report_element(name: &[u8], e: &BytesStart<'_>, report: &mut DetailedReport) {
    match name {
        b"detailedreport" if report.metadata.is_none() => {
            report.metadata = Some(decode_metadata(e, &mut report.warnings));
        }
        b"customfield" => {
            let field = decode_custom_field(e, &mut report.warnings);
            report.custom_fields.push(field);
        }
        _ => {}
    }
}

/// Handle an element nested `level` deep inside a flaw
fn read_flaw_child(
    e: &BytesStart<'_>,
    level: usize,
    section: &mut FlawSection,
    flaw: &mut Flaw,
    warnings: &mut Vec<ParseWarning>,
) {
    match (level, e.local_name().as_ref()) {
        (1, b"mitigations") => *section = FlawSection::Mitigations,
        (1, b"annotations") => *section = FlawSection::Annotations,
        (1, _) => *section = FlawSection::Other,
        (2, b"mitigation") if *section == FlawSection::Mitigations => {
            flaw.mitigations
                .push(decode_history(e, "mitigation", warnings).into());
        }
        (2, b"annotation") if *section == FlawSection::Annotations => {
            flaw.annotations
                .push(decode_history(e, "annotation", warnings).into());
        }
        _ => {}
    }
}

fn decode_metadata(e: &BytesStart<'_>, warnings: &mut Vec<ParseWarning>) -> ReportMetadata {
    let mut metadata = ReportMetadata::default();

    for_each_attribute(e, "detailedreport", warnings, |key, value, warnings| match key {
        b"app_name" => metadata.app_name = value,
        b"app_id" => metadata.app_id = value,
        b"policy_name" => metadata.policy_name = value,
        b"policy_compliance_status" => metadata.policy_compliance_status = value,
        b"policy_rules_status" => metadata.policy_rules_status = value,
        b"grace_period_expired" => {
            metadata.grace_period_expired =
                parse_bool("detailedreport", "grace_period_expired", &value, warnings);
        }
        b"business_unit" => metadata.business_unit = value,
        _ => {}
    });

    metadata
}

fn decode_custom_field(e: &BytesStart<'_>, warnings: &mut Vec<ParseWarning>) -> CustomField {
    let mut field = CustomField::default();

    for_each_attribute(e, "customfield", warnings, |key, value, _| match key {
        b"name" => field.name = value,
        b"value" => field.value = value,
        _ => {}
    });

    field
}

fn decode_history(
    e: &BytesStart<'_>,
    element: &str,
    warnings: &mut Vec<ParseWarning>,
) -> HistoryAttributes {
    let mut attrs = HistoryAttributes::default();

    for_each_attribute(e, element, warnings, |key, value, _| match key {
        b"action" => attrs.action = value,
        b"description" => attrs.description = value,
        b"user" => attrs.user = value,
        b"date" => attrs.date = value,
        _ => {}
    });

    attrs
}

/// Visit every well-formed attribute of `e` with its unescaped value.
///
/// Malformed attributes are recorded as warnings and skipped.
fn for_each_attribute<F>(
    e: &BytesStart<'_>,
    element: &str,
    warnings: &mut Vec<ParseWarning>,
    mut visit: F,
) where
    F: FnMut(&[u8], String, &mut Vec<ParseWarning>),
{
    for attr in e.attributes() {
        match attr {
            Ok(attr) => {
                let key = attr.key.local_name();
                let value = attr_to_string(element, key.as_ref(), &attr.value, warnings);
                visit(key.as_ref(), value, warnings);
            }
            Err(err) => push_warning(
                warnings,
                ParseWarning {
                    element: element.to_string(),
                    attribute: None,
                    value: None,
                    message: format!("malformed attribute: {err}"),
                },
            ),
        }
    }
}

/// Unescape an attribute value, falling back to the raw text
fn attr_to_string(
    element: &str,
    key: &[u8],
    raw: &[u8],
    warnings: &mut Vec<ParseWarning>,
) -> String {
    let lossy = String::from_utf8_lossy(raw);
    let unescaped = quick_xml::escape::unescape(&lossy).map(Cow::into_owned);
    match unescaped {
        Ok(value) => value,
        Err(err) => {
            push_warning(
                warnings,
                ParseWarning {
                    element: element.to_string(),
                    attribute: Some(String::from_utf8_lossy(key).into_owned()),
                    value: Some(lossy.to_string()),
                    message: format!("invalid escape sequence: {err}"),
                },
            );
            lossy.into_owned()
        }
    }
}

fn parse_number<T: FromStr>(
    element: &str,
    attribute: &str,
    value: &str,
    warnings: &mut Vec<ParseWarning>,
) -> Option<T> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(number) => Some(number),
        Err(_) => {
            push_warning(
                warnings,
                ParseWarning {
                    element: element.to_string(),
                    attribute: Some(attribute.to_string()),
                    value: Some(value.to_string()),
                    message: "not a valid number".to_string(),
                },
            );
            None
        }
    }
}

/// Record `value` under `attribute` when it was present but did not parse
fn keep_unparsed<T>(
    parsed: Option<T>,
    attribute: &str,
    value: String,
    raw: &mut BTreeMap<String, String>,
) -> Option<T> {
    if parsed.is_none() && !value.trim().is_empty() {
        raw.insert(attribute.to_string(), value);
    }
    parsed
}

fn parse_bool(
    element: &str,
    attribute: &str,
    value: &str,
    warnings: &mut Vec<ParseWarning>,
) -> Option<bool> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        push_warning(
            warnings,
            ParseWarning {
                element: element.to_string(),
                attribute: Some(attribute.to_string()),
                value: Some(value.to_string()),
                message: "not a valid boolean".to_string(),
            },
        );
        None
    }
}

fn push_warning(warnings: &mut Vec<ParseWarning>, warning: ParseWarning) {
    warn!("Skipping malformed value: {warning}");
    warnings.push(warning);
}

/// Keep the first `error` element's message
fn record_api_error(report: &mut DetailedReport, text: &str) {
    let trimmed = text.trim();
    let message = if trimmed.is_empty() {
        API_ERROR_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    };
    warn!("Detailed report API returned an error element: {message}");
    if report.api_error.is_none() {
        report.api_error = Some(message);
    }
}

/// Character data of an open `error` element
struct ErrorText {
    /// Depth at which the element was opened
    level: usize,
    text: String,
}

impl ErrorText {
    fn new(level: usize) -> Self {
        Self {
            level,
            text: String::new(),
        }
    }

    /// Append escaped text, keeping it verbatim when it cannot be unescaped
    fn push_escaped(&mut self, raw: &str) {
        match quick_xml::escape::unescape(raw) {
            Ok(text) => self.text.push_str(&text),
            Err(_) => self.text.push_str(raw),
        }
    }
}

fn to_position<P: TryInto<u64>>(position: P) -> u64 {
    position.try_into().unwrap_or(u64::MAX)
}

fn xml_error<P: TryInto<u64>>(position: P, err: &quick_xml::Error) -> DetailedReportError {
    DetailedReportError::Xml {
        position: to_position(position),
        message: err.to_string(),
    }
}

/// Source of raw detailed report documents
pub trait ReportFetcher {
    /// Retrieve the raw XML document for `build_id`
    fn fetch(
        &self,
        build_id: &BuildId,
    ) -> impl Future<Output = Result<Vec<u8>, DetailedReportError>> + Send;
}

/// Fetch a report and parse it. The parser is not invoked when the fetch fails.
///
/// # Errors
///
/// Returns the fetcher's error, or a parse error for malformed XML.
pub async fn fetch_and_parse<F: ReportFetcher>(
    fetcher: &F,
    parser: &DetailedReportParser,
    build_id: &BuildId,
) -> Result<DetailedReport, DetailedReportError> {
    let document = fetcher.fetch(build_id).await?;
    debug!(
        "Fetched detailed report for build {build_id} ({} bytes)",
        document.len()
    );
    parser.parse(&document)
}

/// Detailed report API operations for the Veracode platform
#[derive(Clone)]
pub struct DetailedReportApi {
    client: VeracodeClient,
    parser: DetailedReportParser,
}

impl DetailedReportApi {
    /// Create an API instance using the built-in category table
    #[must_use]
    pub fn new(client: VeracodeClient) -> Self {
        Self::with_parser(client, DetailedReportParser::default())
    }

    /// Create an API instance with a custom parser
    #[must_use]
    pub fn with_parser(client: VeracodeClient, parser: DetailedReportParser) -> Self {
        Self { client, parser }
    }

    #[must_use]
    pub fn parser(&self) -> &DetailedReportParser {
        &self.parser
    }

    /// Download the raw detailed report XML for a build
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success HTTP status.
    pub async fn get_detailed_report_xml(
        &self,
        build_id: &BuildId,
    ) -> Result<Vec<u8>, DetailedReportError> {
        let query_params = [("build_id", build_id.as_str())];
        let response = self
            .client
            .get_with_query_params(DETAILED_REPORT_ENDPOINT, &query_params)
            .await?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response.bytes().await?.to_vec()),
            401 => Err(DetailedReportError::Unauthorized),
            403 => Err(DetailedReportError::PermissionDenied),
            404 => Err(DetailedReportError::BuildNotFound),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(DetailedReportError::UnexpectedStatus { status, body })
            }
        }
    }

    /// Download and parse the detailed report for a build
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success HTTP status or a
    /// malformed document. An `error` element inside a well-formed document
    /// is not an `Err`; see [`DetailedReport::error`].
    pub async fn get_detailed_report(
        &self,
        build_id: &BuildId,
    ) -> Result<DetailedReport, DetailedReportError> {
        fetch_and_parse(self, &self.parser, build_id).await
    }
}

impl ReportFetcher for DetailedReportApi {
    async fn fetch(&self, build_id: &BuildId) -> Result<Vec<u8>, DetailedReportError> {
        self.get_detailed_report_xml(build_id).await
    }
}
