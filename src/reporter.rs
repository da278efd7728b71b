use crate::types::{FeedItem, ForecasterStats};

/// Emit a feed item as a single JSON line to stdout.
pub fn report_feed_item(item: &FeedItem) {
    if let Ok(json) = serde_json::to_string(item) {
        println!("{json}");
    }
}

/// Emit every item of a feed, in order.
pub fn report_feed(items: &[FeedItem]) {
    items.iter().for_each(report_feed_item);
}

/// Emit forecaster stats as pretty-printed JSON to stdout.
pub fn report_stats(stats: &ForecasterStats) {
    if let Ok(json) = serde_json::to_string_pretty(stats) {
        println!("{json}");
    }
}
