// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

pub const APP_NAME: &str = "paddock";

/// Search endpoint of the default provider.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.rule34.xxx/index.php";

/// Tag autocomplete endpoint of the default provider.
pub const AUTOCOMPLETE_ENDPOINT: &str = "https://api.rule34.xxx/autocomplete.php";

/// User agent mimicking a real browser; Cloudflare-fronted boorus reject
/// obvious bot agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Per-request timeout for page fetches.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-request timeout for autocomplete lookups.
pub const AUTOCOMPLETE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed page size of the search API.
pub const PAGE_SIZE: usize = 100;

/// Courtesy delay between page fetches within one tracker.
pub const PAGE_DELAY: Duration = Duration::from_millis(500);

/// Courtesy delay between trackers in a full sweep.
pub const TRACKER_DELAY: Duration = Duration::from_millis(1500);

/// Page cap for a forced backfill (repair) run.
pub const REPAIR_MAX_PAGES: u32 = 3;
