#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str::FromStr;
use veracode_detailedreport::{BuildId, CategoryMap};
use verareport::cli::{AuthScheme, OutputFormat, Region};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Accepted build IDs are always plain digits
        if let Ok(id) = BuildId::new(s) {
            assert!(id.as_str().bytes().all(|b| b.is_ascii_digit()));
        }

        // Category override files
        let _ = CategoryMap::from_json_str(s);

        // CLI enum parsing
        let _ = Region::from_str(s);
        let _ = AuthScheme::from_str(s);
        let _ = OutputFormat::from_str(s);
    }
});
