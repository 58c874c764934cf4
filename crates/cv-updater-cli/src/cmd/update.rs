use cv_updater_core::{ControlLoop, LoopSettings, SystemClock, Tracker};
use tokio_util::sync::CancellationToken;

use super::{cancel_on_signal, finish, runtime, App};
use crate::steps::WorkUaSteps;

/// Run the scheduler with a headless browser until stopped.
pub fn run(app: &App) -> anyhow::Result<()> {
    let tracker = app.open_tracker()?;
    let result = serve(app, &tracker);
    finish(tracker, result)
}

fn serve(app: &App, tracker: &Tracker) -> anyhow::Result<()> {
    tracing::info!("Update mode. Running headless browser.");
    let factory = app.browser_factory(true)?;
    let executor = WorkUaSteps::new(app.config.settle())?;
    let settings = LoopSettings::from_config(&app.config, app.guard_settings());

    runtime()?.block_on(async {
        let cancel = CancellationToken::new();
        let signals = cancel_on_signal(cancel.clone());
        let control = ControlLoop::new(tracker, factory, executor, SystemClock, settings);
        let result = control.run(&cancel).await;
        signals.abort();
        tracing::info!("Shutting down...");
        result.map_err(anyhow::Error::from)
    })
}
