//! Rendering of parsed detailed reports
use crate::cli::OutputFormat;
use crate::error::Result;
use log::info;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use veracode_detailedreport::DetailedReport;

/// Render `report` in `format` to `writer`
pub fn render<W: Write>(report: &DetailedReport, format: OutputFormat, writer: &mut W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, report)?;
            writeln!(writer)?;
        }
        OutputFormat::Summary => write_summary(report, writer)?,
    }
    Ok(())
}

/// Write the rendered report to `path`, or stdout when no path is given
pub fn write_report(report: &DetailedReport, format: OutputFormat, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let mut buffer = Vec::new();
            render(report, format, &mut buffer)?;
            fs::write(path, buffer)?;
            info!("Report written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            render(report, format, &mut handle)?;
            handle.flush()?;
        }
    }
    Ok(())
}

fn write_summary<W: Write>(report: &DetailedReport, out: &mut W) -> io::Result<()> {
    if let Some(metadata) = &report.metadata {
        writeln!(out, "Application: {} ({})", metadata.app_name, metadata.app_id)?;
        writeln!(out, "Policy: {}", metadata.policy_name)?;
        writeln!(out, "Compliance: {}", metadata.policy_compliance_status)?;
    }

    writeln!(
        out,
        "Flaws: {} total, {} open, {} affecting policy",
        report.flaws.len(),
        report.open_flaws().count(),
        report.policy_affecting_flaws().count()
    )?;

    for (severity, count) in report.severity_counts().iter().rev() {
        writeln!(out, "  Severity {severity}: {count}")?;
    }

    for flaw in &report.flaws {
        let issue = flaw.issue_id.map_or_else(|| "?".to_string(), |id| id.to_string());
        let line = flaw.line.map_or_else(String::new, |line| format!(":{line}"));
        writeln!(
            out,
            "  #{issue} [{}] {} - {}{line} ({})",
            flaw.severity.map_or_else(|| "-".to_string(), |s| s.to_string()),
            display_category(flaw),
            flaw.source_file,
            flaw.remediation_status
        )?;
    }

    if !report.custom_fields.is_empty() {
        writeln!(out, "Custom fields:")?;
        for field in &report.custom_fields {
            writeln!(out, "  {} = {}", field.name, field.value)?;
        }
    }

    if !report.warnings.is_empty() {
        writeln!(out, "Warnings: {}", report.warnings.len())?;
        for warning in &report.warnings {
            writeln!(out, "  {warning}")?;
        }
    }

    if let Some(error) = &report.api_error {
        writeln!(out, "API error: {error}")?;
    }

    Ok(())
}

fn display_category(flaw: &veracode_detailedreport::Flaw) -> &str {
    if flaw.category_name.is_empty() {
        &flaw.cwe_name
    } else {
        &flaw.category_name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use veracode_detailedreport::{CategoryMap, DetailedReportParser};

    fn sample() -> DetailedReport {
        let xml = br#"<detailedreport app_name="Shop" app_id="9" policy_name="Strict" policy_compliance_status="Pass">
            <flaw issueid="7" categoryid="19" severity="5" sourcefile="Db.java" line="12" remediation_status="Open" affects_policy_compliance="true"/>
            <flaw issueid="8" categoryname="Weak Hash" severity="3" remediation_status="Fixed"/>
            <customfield name="Owner" value="Team Z"/>
        </detailedreport>"#;
        DetailedReportParser::new(CategoryMap::from_entries([(19, "SQL Injection")]))
            .parse(xml)
            .unwrap()
    }

    #[test]
    fn test_summary_output() {
        let mut out = Vec::new();
        render(&sample(), OutputFormat::Summary, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Application: Shop (9)"));
        assert!(text.contains("Policy: Strict"));
        assert!(text.contains("Flaws: 2 total, 1 open, 1 affecting policy"));
        assert!(text.contains("#7 [5] SQL Injection - Db.java:12 (Open)"));
        assert!(text.contains("#8 [3] Weak Hash"));
        assert!(text.contains("Owner = Team Z"));
        assert!(!text.contains("API error"));

        let sev5 = text.find("Severity 5").unwrap();
        let sev3 = text.find("Severity 3").unwrap();
        assert!(sev5 < sev3);
    }

    #[test]
    fn test_json_output() {
        let mut out = Vec::new();
        render(&sample(), OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["flaws"].as_array().unwrap().len(), 2);
        assert_eq!(value["flaws"][0]["policy_name"], "Strict");
        assert_eq!(value["custom_fields"][0]["name"], "Owner");
    }

    #[test]
    fn test_summary_reports_api_error() {
        let report = DetailedReportParser::default()
            .parse(b"<error>Access denied</error>")
            .unwrap();
        let mut out = Vec::new();
        render(&report, OutputFormat::Summary, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Flaws: 0 total"));
        assert!(text.contains("API error: Access denied"));
    }
}
