//! Tokio shell around the engine. All mutation is serialized through one
//! mutex; timers are armed and disarmed from state after every event, so a
//! timer exists exactly while its dependency set says it should:
//!
//! - the 5s phase interval, only while the intro dialogue is hidden;
//! - the 1s countdown interval, only while a cooldown, timeout, or craft is
//!   live, re-armed whenever that dependency set changes;
//! - one commit sleep per scheduled stage transition.
//!
//! Missed ticks are skipped, never replayed.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, Notify};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::warn;

use crate::content::{ResourceKind, PHASE_TICK_SECS, STAGE_COMMIT_DELAY_MS};
use crate::engine::{Action, Engine};

/// Dependency set of the 1s timer. A change re-arms the interval.
type CountdownDeps = (Vec<ResourceKind>, bool, bool, Option<String>);

struct TimerPlan {
    phase_wanted: bool,
    countdown_deps: Option<CountdownDeps>,
    pending_stage: Option<usize>,
}

pub struct Runtime {
    engine: Mutex<Engine>,
    notify: Notify,
    frames: broadcast::Sender<String>,
}

impl Runtime {
    pub fn new(engine: Engine) -> Arc<Self> {
        let (frames, _) = broadcast::channel(512);
        Arc::new(Self {
            engine: Mutex::new(engine),
            notify: Notify::new(),
            frames,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.frames.subscribe()
    }

    /// Run a closure against the engine, then publish the refreshed frame
    /// and wake the timer loop to re-arm.
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut Engine) -> T) -> T {
        let result = {
            let mut engine = self.engine.lock().expect("engine lock poisoned");
            f(&mut engine)
        };
        self.publish();
        self.notify.notify_one();
        result
    }

    pub fn apply(&self, action: Action) -> bool {
        self.with_engine(|engine| engine.apply(action))
    }

    /// Read-only access; publishes nothing and wakes nobody.
    pub fn read<T>(&self, f: impl FnOnce(&Engine) -> T) -> T {
        let engine = self.engine.lock().expect("engine lock poisoned");
        f(&engine)
    }

    fn publish(&self) {
        let engine = self.engine.lock().expect("engine lock poisoned");
        match serde_json::to_string(&engine.frame()) {
            Ok(payload) => {
                let _ = self.frames.send(payload);
            }
            Err(err) => warn!(?err, "failed to serialize state frame"),
        }
    }

    fn timer_plan(&self) -> TimerPlan {
        let engine = self.engine.lock().expect("engine lock poisoned");
        let state = engine.state();
        let countdown_deps = engine.second_timer_wanted().then(|| {
            let cooling: Vec<ResourceKind> = state
                .manual_cooldowns
                .iter()
                .filter(|(_, secs)| **secs > 0)
                .map(|(kind, _)| *kind)
                .collect();
            (
                cooling,
                state.tenant_recruit_cooldown > 0,
                state.tenant_timeout > 0,
                state.crafting_recipe.clone(),
            )
        });
        TimerPlan {
            phase_wanted: engine.phase_timer_wanted(),
            countdown_deps,
            pending_stage: engine.pending_stage(),
        }
    }

    /// Drive the timers forever. Spawn once; drop the task on shutdown.
    pub async fn run(&self) {
        let mut phase_timer: Option<Interval> = None;
        let mut countdown_timer: Option<Interval> = None;
        let mut armed_deps: Option<CountdownDeps> = None;
        let mut commit_task: Option<(usize, Pin<Box<Sleep>>)> = None;

        loop {
            let plan = self.timer_plan();

            if plan.phase_wanted {
                if phase_timer.is_none() {
                    phase_timer = Some(fixed_interval(Duration::from_secs(PHASE_TICK_SECS)));
                }
            } else {
                phase_timer = None;
            }

            match plan.countdown_deps {
                Some(deps) => {
                    if armed_deps.as_ref() != Some(&deps) {
                        countdown_timer = Some(fixed_interval(Duration::from_secs(1)));
                        armed_deps = Some(deps);
                    }
                }
                None => {
                    countdown_timer = None;
                    armed_deps = None;
                }
            }

            match plan.pending_stage {
                Some(target) => {
                    if commit_task.as_ref().map(|(armed, _)| *armed) != Some(target) {
                        commit_task = Some((
                            target,
                            Box::pin(tokio::time::sleep(Duration::from_millis(
                                STAGE_COMMIT_DELAY_MS,
                            ))),
                        ));
                    }
                }
                None => commit_task = None,
            }

            tokio::select! {
                _ = tick_or_never(phase_timer.as_mut()) => {
                    self.with_engine(|engine| engine.phase_tick());
                }
                _ = tick_or_never(countdown_timer.as_mut()) => {
                    self.with_engine(|engine| engine.second_tick());
                }
                _ = commit_or_never(commit_task.as_mut()) => {
                    if let Some((target, _)) = commit_task.take() {
                        self.with_engine(|engine| engine.commit_stage(target));
                    }
                }
                _ = self.notify.notified() => {}
            }
        }
    }
}

fn fixed_interval(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn tick_or_never(interval: Option<&mut Interval>) -> Instant {
    match interval {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

async fn commit_or_never(task: Option<&mut (usize, Pin<Box<Sleep>>)>) {
    match task {
        Some((_, sleep)) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use crate::engine::Engine;

    fn runtime() -> Arc<Runtime> {
        Runtime::new(Engine::with_seed(Content::standard(), 7))
    }

    fn spawn_loop(runtime: &Arc<Runtime>) {
        let handle = runtime.clone();
        tokio::spawn(async move { handle.run().await });
    }

    #[tokio::test(start_paused = true)]
    async fn phase_timer_stays_suspended_while_the_intro_shows() {
        let runtime = runtime();
        spawn_loop(&runtime);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runtime.with_engine(|engine| engine.state().tick), 0);

        for _ in 0..5 {
            assert!(runtime.apply(Action::AdvanceIntro));
        }
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(runtime.with_engine(|engine| engine.state().tick), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_stage_commits_after_the_delay() {
        let runtime = runtime();
        spawn_loop(&runtime);
        let imported = runtime.with_engine(|engine| {
            engine.import(
                r#"{"resources": [{"key": "sunleaf", "amount": 20.0}],
                    "showIntroDialogue": false}"#,
            )
        });
        imported.expect("import");
        assert_eq!(
            runtime.with_engine(|engine| engine.pending_stage()),
            Some(1)
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            runtime.with_engine(|engine| engine.state().stage_index),
            0,
            "commit waits out the delay"
        );
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(runtime.with_engine(|engine| engine.state().stage_index), 1);
        assert_eq!(runtime.with_engine(|engine| engine.pending_stage()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn crafting_keeps_ticking_while_production_is_suspended() {
        let runtime = runtime();
        spawn_loop(&runtime);
        runtime
            .with_engine(|engine| {
                engine.import(r#"{"resources": [{"key": "sunleaf", "amount": 10.0}]}"#)
            })
            .expect("import");
        assert!(runtime.apply(Action::StartCraft {
            recipe: "woven-baskets".into()
        }));
        tokio::time::sleep(Duration::from_secs(25)).await;
        runtime.with_engine(|engine| {
            assert_eq!(engine.state().tick, 0, "intro still suspends production");
            assert_eq!(engine.state().crafting_recipe, None, "craft finished anyway");
            assert_eq!(engine.state().pending_boosts.len(), 1);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_broadcast_after_every_mutation() {
        let runtime = runtime();
        let mut frames = runtime.subscribe();
        assert!(runtime.apply(Action::SetLanguage {
            language: crate::state::Language::Zh
        }));
        let payload = frames.try_recv().expect("frame published");
        assert!(payload.contains(r#""language":"zh""#));
    }
}
