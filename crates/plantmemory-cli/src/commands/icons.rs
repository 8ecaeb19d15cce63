use plantmemory_core::icon::{MAX_VARIANT, MIN_VARIANT};
use plantmemory_core::IconType;

use super::{print_json, CliResult};

pub fn run() -> CliResult {
    print_json(&serde_json::json!({
        "icons": IconType::all(),
        "variants": { "min": MIN_VARIANT, "max": MAX_VARIANT },
    }))
}
