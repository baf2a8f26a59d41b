use crate::hooks::WizardHooks;
use anyhow::Result;

pub type StageFn<'a, S> = Box<dyn Fn(&mut S) -> Result<()> + 'a>;

pub struct StageDefinition<'a, S> {
    pub name: &'a str,
    pub run: StageFn<'a, S>,
}

pub trait WorkflowState {
    fn is_completed(&self, stage: &str) -> bool;
    fn set_current(&mut self, stage: &str);
    fn mark_completed(&mut self, stage: &str);
}

/// Runs named stages strictly in order, stopping at the first failure.
///
/// There is no retry and no rollback: a failed stage leaves `state` exactly as
/// the stage left it, with the failing stage recorded as current.
pub struct StageRunner<'h> {
    hooks: &'h dyn WizardHooks,
}

impl<'h> StageRunner<'h> {
    pub fn new(hooks: &'h dyn WizardHooks) -> Self {
        Self { hooks }
    }

    pub fn run<S: WorkflowState>(
        &self,
        state: &mut S,
        stages: &[StageDefinition<'_, S>],
    ) -> Result<()> {
        for stage in stages {
            if state.is_completed(stage.name) {
                log::debug!("Stage {} already completed; skipping", stage.name);
                continue;
            }
            state.set_current(stage.name);
            log::info!("▶ {}", stage.name);

            if let Err(err) = (stage.run)(state) {
                self.hooks.on_error(stage.name, &err);
                return Err(err.context(format!("stage '{}' failed", stage.name)));
            }

            state.mark_completed(stage.name);
            self.hooks.on_success(stage.name);
            if let Some(next) = self.hooks.next_step_path(stage.name) {
                log::debug!("{} → {}", stage.name, next);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopHooks;
    use std::cell::RefCell;
    use std::collections::BTreeSet;

    #[derive(Debug, Default)]
    struct TestState {
        current: Option<String>,
        completed: BTreeSet<String>,
    }

    impl WorkflowState for TestState {
        fn is_completed(&self, stage: &str) -> bool {
            self.completed.contains(stage)
        }

        fn set_current(&mut self, stage: &str) {
            self.current = Some(stage.to_string());
        }

        fn mark_completed(&mut self, stage: &str) {
            self.completed.insert(stage.to_string());
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        events: RefCell<Vec<String>>,
    }

    impl WizardHooks for RecordingHooks {
        fn on_success(&self, step: &str) {
            self.events.borrow_mut().push(format!("ok:{step}"));
        }

        fn on_error(&self, step: &str, _err: &anyhow::Error) {
            self.events.borrow_mut().push(format!("err:{step}"));
        }
    }

    #[test]
    fn runner_skips_completed_stages() {
        let mut state = TestState::default();
        state.completed.insert("stage-1".to_string());

        let calls = RefCell::new(Vec::new());
        let stages = vec![
            StageDefinition {
                name: "stage-1",
                run: Box::new(|_state: &mut TestState| {
                    calls.borrow_mut().push("stage-1");
                    Ok(())
                }),
            },
            StageDefinition {
                name: "stage-2",
                run: Box::new(|_state: &mut TestState| {
                    calls.borrow_mut().push("stage-2");
                    Ok(())
                }),
            },
        ];

        StageRunner::new(&NoopHooks).run(&mut state, &stages).unwrap();

        assert_eq!(calls.borrow().as_slice(), &["stage-2"]);
        assert!(state.is_completed("stage-1"));
        assert!(state.is_completed("stage-2"));
    }

    #[test]
    fn runner_stops_at_first_failure() {
        let hooks = RecordingHooks::default();
        let mut state = TestState::default();
        let stages = vec![
            StageDefinition {
                name: "a",
                run: Box::new(|_state: &mut TestState| Ok(())),
            },
            StageDefinition {
                name: "b",
                run: Box::new(|_state: &mut TestState| -> Result<()> { anyhow::bail!("boom") }),
            },
            StageDefinition {
                name: "c",
                run: Box::new(|_state: &mut TestState| -> Result<()> { panic!("must not run") }),
            },
        ];

        let err = StageRunner::new(&hooks).run(&mut state, &stages).unwrap_err();

        assert!(err.to_string().contains("stage 'b' failed"));
        assert_eq!(state.current.as_deref(), Some("b"));
        assert!(!state.is_completed("b"));
        assert_eq!(hooks.events.borrow().as_slice(), &["ok:a", "err:b"]);
    }
}
