//! Report rendering
//!
//! Text output is tab separated, one line per bucket:
//!
//! ```text
//! UNUSED RESERVATION!\t(<count>)\t<type>\t<platform>\t<zone or "region">
//! Instance not reserved:\t(<count>)\t<type>\t<platform>\t<zone or "region">[\t<names>]
//! ```
//!
//! followed by the running/reserved/unused totals. Lines are ordered by
//! bucket key, so the same reconciliation always renders the same text.

use crate::check::Reconciliation;
use crate::error::Result;
use crate::reconcile::{GroupKey, Platform, Scope};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const NO_UNUSED_MESSAGE: &str = "Congratulations, you have no unused reservations";
pub const NO_UNRESERVED_MESSAGE: &str = "Congratulations, you have no unreserved instances";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Append sorted instance names to unreserved lines
    pub include_names: bool,
}

/// Render the plain-text report
pub fn render_text(reconciliation: &Reconciliation, options: &ReportOptions) -> String {
    let mut out = String::new();

    let mut unused = reconciliation.diff.unused().peekable();
    if unused.peek().is_none() {
        out.push_str(NO_UNUSED_MESSAGE);
        out.push('\n');
    }
    for (key, count) in unused {
        out.push_str(&format!(
            "UNUSED RESERVATION!\t({})\t{}\n",
            count,
            key_fields(key)
        ));
    }

    out.push('\n');

    let mut unreserved = reconciliation.diff.unreserved().peekable();
    if unreserved.peek().is_none() {
        out.push_str(NO_UNRESERVED_MESSAGE);
        out.push('\n');
    }
    for (key, count) in unreserved {
        out.push_str(&format!(
            "Instance not reserved:\t({})\t{}",
            count,
            key_fields(key)
        ));
        if options.include_names {
            out.push('\t');
            out.push_str(&reconciliation.names.sorted_names(key).join(", "));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "\n({}) running on-demand instances\n({}) reservations\n({}) unused reservations\n",
        reconciliation.total_running(),
        reconciliation.total_reserved(),
        reconciliation.total_unused()
    ));

    out
}

fn key_fields(key: &GroupKey) -> String {
    format!("{}\t{}\t{}", key.instance_type, key.platform, key.scope)
}

#[derive(Debug, Serialize)]
struct JsonEntry<'a> {
    count: u64,
    instance_type: &'a str,
    platform: Platform,
    scope: &'a Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    names: Option<Vec<&'a str>>,
}

#[derive(Debug, Serialize)]
struct JsonTotals {
    running: u64,
    reserved: u64,
    unused: u64,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    region: &'a str,
    generated_at: DateTime<Utc>,
    unused_reservations: Vec<JsonEntry<'a>>,
    unreserved_instances: Vec<JsonEntry<'a>>,
    totals: JsonTotals,
}

fn json_entry<'a>(
    reconciliation: &'a Reconciliation,
    key: &'a GroupKey,
    count: u64,
    with_names: bool,
) -> JsonEntry<'a> {
    JsonEntry {
        count,
        instance_type: &key.instance_type,
        platform: key.platform,
        scope: &key.scope,
        names: with_names.then(|| reconciliation.names.sorted_names(key)),
    }
}

/// Render the report as pretty-printed JSON
pub fn render_json(
    reconciliation: &Reconciliation,
    options: &ReportOptions,
    region: &str,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let report = JsonReport {
        region,
        generated_at,
        unused_reservations: reconciliation
            .diff
            .unused()
            .map(|(key, count)| json_entry(reconciliation, key, count, false))
            .collect(),
        unreserved_instances: reconciliation
            .diff
            .unreserved()
            .map(|(key, count)| json_entry(reconciliation, key, count, options.include_names))
            .collect(),
        totals: JsonTotals {
            running: reconciliation.total_running(),
            reserved: reconciliation.total_reserved(),
            unused: reconciliation.total_unused(),
        },
    };

    Ok(serde_json::to_string_pretty(&report)?)
}
