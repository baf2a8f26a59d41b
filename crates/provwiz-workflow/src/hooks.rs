//! Callbacks the web wizard would use to render the next page.
//!
//! Running headless there is nothing to render, so the defaults do nothing.
//! Callers that want visibility pass [`LoggingHooks`] or their own impl.

use crate::sequencer::WizardStep;

pub trait WizardHooks {
    fn on_success(&self, _step: &str) {}

    fn on_error(&self, _step: &str, _err: &anyhow::Error) {}

    /// Page the web flow would redirect to after `step`.
    fn next_step_path(&self, _step: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl WizardHooks for NoopHooks {}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHooks;

impl WizardHooks for LoggingHooks {
    fn on_success(&self, step: &str) {
        log::info!("✅ {}", step);
    }

    fn on_error(&self, step: &str, err: &anyhow::Error) {
        log::error!("❌ {}: {:#}", step, err);
    }

    fn next_step_path(&self, step: &str) -> Option<String> {
        WizardStep::from_name(step)
            .and_then(WizardStep::web_next_page)
            .map(|page| format!("foreman_setup/provisioners/:id/{page}"))
    }
}
