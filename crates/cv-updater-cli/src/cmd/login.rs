use anyhow::Context;
use chrono::Utc;
use cv_updater_core::{guarded, ActionKind, GuardSettings, SystemClock, Tracker, UpdaterError};
use tokio_util::sync::CancellationToken;

use super::{cancel_on_signal, finish, runtime, App};
use crate::steps::ManualLogin;

/// Open a visible browser and wait for the user to sign in.
///
/// A successful login counts as a REFRESH.
pub fn run(app: &App) -> anyhow::Result<()> {
    let tracker = app.open_tracker()?;
    let result = login(app, &tracker);
    finish(tracker, result)
}

fn login(app: &App, tracker: &Tracker) -> anyhow::Result<()> {
    tracing::info!("Login mode. Please enter your credentials in the opened browser window.");
    let factory = app.browser_factory(false)?;
    let executor = ManualLogin::new(app.config.manual_login_timeout(), app.config.settle())?;
    let settings = GuardSettings {
        action_budget: executor.budget(),
        ..app.guard_settings()
    };

    runtime()?.block_on(async {
        let cancel = CancellationToken::new();
        let signals = cancel_on_signal(cancel.clone());
        let result = guarded(
            &factory,
            &executor,
            &SystemClock,
            ActionKind::Refresh,
            &settings,
            &cancel,
        )
        .await;
        signals.abort();

        match result {
            Ok(()) => tracker
                .record(ActionKind::Refresh, Utc::now())
                .map(|_| ())
                .context("failed to record login"),
            Err(UpdaterError::Cancelled) => {
                tracing::warn!("Interrupted");
                Ok(())
            }
            Err(e) => Err(e).context("login failed"),
        }
    })
}
