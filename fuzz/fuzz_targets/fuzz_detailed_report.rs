#![no_main]

use libfuzzer_sys::fuzz_target;
use veracode_detailedreport::{CategoryMap, DetailedReportParser};

fuzz_target!(|data: &[u8]| {
    let parser = DetailedReportParser::new(CategoryMap::builtin());

    // Raw bytes straight from the API
    if let Ok(report) = parser.parse(data) {
        // Every flaw carries the root policy name
        let policy = report.policy_name().to_string();
        assert!(report.flaws.iter().all(|f| f.policy_name == policy));

        // Category names only come from the table
        for flaw in &report.flaws {
            match flaw.category_id {
                Some(id) => assert!(
                    flaw.category_name.is_empty()
                        || flaw.category_name == parser.categories().name(id)
                ),
                None => assert!(flaw.category_name.is_empty()),
            }
        }

        let _ = report.severity_counts();
        let _ = report.error();
    }

    // Fuzz input wrapped in a well-formed root
    if let Ok(s) = std::str::from_utf8(data) {
        let wrapped = format!("<detailedreport policy_name=\"fuzz\">{s}</detailedreport>");
        let _ = parser.parse(wrapped.as_bytes());
    }
});
