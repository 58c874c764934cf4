use chrono::{DateTime, SecondsFormat, Utc};
use cv_updater_core::types::to_epoch_secs;
use cv_updater_core::ActionKind;
use serde::Serialize;

use super::{finish, App};
use crate::output::{print_json, print_table};

#[derive(Debug, Serialize)]
struct KindStatus {
    kind: &'static str,
    last_success: Option<String>,
    epoch_secs: f64,
    /// Earliest time the next occurrence can be scheduled for.
    earliest_next: String,
}

fn describe(app: &App, kind: ActionKind, last: DateTime<Utc>) -> KindStatus {
    let spec = app.config.intervals.for_kind(kind);
    let now = Utc::now();
    let earliest = chrono::TimeDelta::from_std(spec.min_gap())
        .ok()
        .and_then(|gap| last.checked_add_signed(gap))
        .map_or(now, |t| t.max(now));
    KindStatus {
        kind: kind.as_str(),
        last_success: (last != DateTime::UNIX_EPOCH)
            .then(|| last.to_rfc3339_opts(SecondsFormat::Secs, true)),
        epoch_secs: to_epoch_secs(last),
        earliest_next: earliest.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

/// Print the last success time of every tracked action.
pub fn run(app: &App, json: bool) -> anyhow::Result<()> {
    let tracker = app.open_tracker()?;
    let snapshot = tracker.snapshot();
    let result = snapshot.map_err(anyhow::Error::from).and_then(|rows| {
        let statuses: Vec<KindStatus> = rows
            .into_iter()
            .map(|(kind, last)| describe(app, kind, last))
            .collect();
        if json {
            print_json(&statuses)
        } else {
            let rows: Vec<Vec<String>> = statuses
                .iter()
                .map(|s| {
                    vec![
                        s.kind.to_string(),
                        s.last_success.clone().unwrap_or_else(|| "never".into()),
                        s.earliest_next.clone(),
                    ]
                })
                .collect();
            print_table(&["ACTION", "LAST SUCCESS", "EARLIEST NEXT"], &rows);
            Ok(())
        }
    });
    finish(tracker, result)
}
