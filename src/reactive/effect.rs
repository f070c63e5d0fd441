//! Effects and watchers.
//!
//! # Effects
//!
//! An effect is a closure that re-runs whenever any reactive value it read
//! during its last run changes:
//!
//! ```ignore
//! let rt = Runtime::new();
//! let count = rt.signal(0);
//! let c = count.clone();
//! let stop = rt.run_effect(move || println!("count = {}", c.get()));
//! count.set(1);
//! rt.tick(); // prints "count = 1"
//! stop.stop();
//! count.set(2);
//! rt.tick(); // prints nothing
//! ```
//!
//! # Watchers
//!
//! A watcher derives a value and calls back with `(new, old)` only when the
//! derived value actually changes:
//!
//! ```ignore
//! let rt = Runtime::new();
//! let count = rt.signal(3);
//! let c = count.clone();
//! rt.watch(move || c.get().min(10), |new, old| println!("{old} -> {new}"));
//! ```

use std::fmt;

use super::runtime::{EffectId, Runtime, WeakRuntime};

/// Handle that permanently stops an effect or watcher.
///
/// Dropping the handle does *not* stop the effect.
#[derive(Clone)]
pub struct StopHandle {
    id: EffectId,
    runtime: WeakRuntime,
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("id", &self.id)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl StopHandle {
    /// Stop the effect. It never runs again and all its edges are removed.
    /// Idempotent.
    pub fn stop(&self) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.stop(self.id);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.runtime
            .upgrade()
            .map_or(true, |rt| !rt.is_active(self.id))
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Number of sources the effect read during its last run.
    pub fn dependency_count(&self) -> usize {
        self.runtime
            .upgrade()
            .map_or(0, |rt| rt.dependency_count(self.id))
    }
}

impl Runtime {
    /// Run `f` now, then again whenever anything it read changes.
    ///
    /// Panics inside `f` propagate to whoever caused the run.
    pub fn run_effect(&self, f: impl FnMut() + 'static) -> StopHandle {
        let id = self.create_effect(Box::new(f));
        StopHandle {
            id,
            runtime: self.downgrade(),
        }
    }

    /// Watch a derived value.
    ///
    /// `getter` runs as an effect. Its first result is the baseline and does
    /// not invoke `callback`; later results that differ from the previous one
    /// invoke `callback(&new, &old)`. The callback runs untracked.
    pub fn watch<T, G, C>(&self, mut getter: G, mut callback: C) -> StopHandle
    where
        T: PartialEq + 'static,
        G: FnMut() -> T + 'static,
        C: FnMut(&T, &T) + 'static,
    {
        let runtime = self.downgrade();
        let mut last: Option<T> = None;
        self.run_effect(move || {
            let next = getter();
            // `last` is only replaced once the callback has returned.
            if let Some(previous) = last.as_ref().filter(|previous| **previous != next) {
                match runtime.upgrade() {
                    Some(rt) => rt.untrack(|| callback(&next, previous)),
                    None => callback(&next, previous),
                }
            }
            last = Some(next);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    // ------------------------------------------------------------------
    // Effect basics
    // ------------------------------------------------------------------

    #[test]
    fn effect_runs_on_creation() {
        let rt = Runtime::new();
        let ran = Rc::new(Cell::new(false));
        let ran_c = ran.clone();
        let _stop = rt.run_effect(move || ran_c.set(true));
        assert!(ran.get());
    }

    #[test]
    fn effect_reruns_on_signal_change() {
        let rt = Runtime::new();
        let count = rt.signal(0_i32);
        let log = Rc::new(RefCell::new(Vec::new()));
        let (count_c, log_c) = (count.clone(), log.clone());
        let _stop = rt.run_effect(move || log_c.borrow_mut().push(count_c.get()));
        assert_eq!(*log.borrow(), vec![0]);
        count.set(42);
        rt.tick();
        assert_eq!(*log.borrow(), vec![0, 42]);
    }

    #[test]
    fn effect_tracks_multiple_signals() {
        let rt = Runtime::new();
        let a = rt.signal(1_i32);
        let b = rt.signal(2_i32);
        let sum = Rc::new(Cell::new(0));
        let (a_c, b_c, sum_c) = (a.clone(), b.clone(), sum.clone());
        let _stop = rt.run_effect(move || sum_c.set(a_c.get() + b_c.get()));
        assert_eq!(sum.get(), 3);
        a.set(10);
        rt.tick();
        assert_eq!(sum.get(), 12);
        b.set(20);
        rt.tick();
        assert_eq!(sum.get(), 30);
    }

    #[test]
    fn effect_retracks_conditional_deps() {
        let rt = Runtime::new();
        let flag = rt.signal(true);
        let x = rt.signal(100_i32);
        let y = rt.signal(200_i32);
        let result = Rc::new(Cell::new(0));
        let (flag_c, x_c, y_c, result_c) = (flag.clone(), x.clone(), y.clone(), result.clone());
        let stop = rt.run_effect(move || {
            let v = if flag_c.get() { x_c.get() } else { y_c.get() };
            result_c.set(v);
        });
        assert_eq!(result.get(), 100);
        assert_eq!(stop.dependency_count(), 2);

        flag.set(false);
        rt.tick();
        assert_eq!(result.get(), 200);
        y.set(999);
        rt.tick();
        assert_eq!(result.get(), 999);
        // x is no longer a dependency.
        x.set(1);
        rt.tick();
        assert_eq!(result.get(), 999);
    }

    #[test]
    fn same_value_written_twice_triggers_once() {
        let rt = Runtime::new();
        let count = rt.signal(0_i32);
        let runs = Rc::new(Cell::new(0_u32));
        let (count_c, runs_c) = (count.clone(), runs.clone());
        let _stop = rt.run_effect(move || {
            let _ = count_c.get();
            runs_c.set(runs_c.get() + 1);
        });
        count.set(5);
        rt.tick();
        count.set(5);
        rt.tick();
        assert_eq!(runs.get(), 2);
    }

    // ------------------------------------------------------------------
    // Batch
    // ------------------------------------------------------------------

    #[test]
    fn same_turn_writes_rerun_once() {
        let rt = Runtime::new();
        let a = rt.signal(0_i32);
        let b = rt.signal(0_i32);
        let runs = Rc::new(Cell::new(0_u32));
        let (a_c, b_c, runs_c) = (a.clone(), b.clone(), runs.clone());
        let _stop = rt.run_effect(move || {
            let _ = a_c.get() + b_c.get();
            runs_c.set(runs_c.get() + 1);
        });
        a.set(1);
        b.set(1);
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.tick(), 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn batch_coalesces_notifications() {
        let rt = Runtime::new();
        let a = rt.signal(0_i32);
        let b = rt.signal(0_i32);
        let runs = Rc::new(Cell::new(0_u32));
        let (a_c, b_c, runs_c) = (a.clone(), b.clone(), runs.clone());
        let _stop = rt.run_effect(move || {
            let _ = a_c.get() + b_c.get();
            runs_c.set(runs_c.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        rt.batch(|| {
            a.set(10);
            b.set(20);
        });
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn batch_nested_only_flushes_once() {
        let rt = Runtime::new();
        let value = rt.signal(0_i32);
        let runs = Rc::new(Cell::new(0_u32));
        let (value_c, runs_c) = (value.clone(), runs.clone());
        let _stop = rt.run_effect(move || {
            let _ = value_c.get();
            runs_c.set(runs_c.get() + 1);
        });

        rt.batch(|| {
            value.set(1);
            rt.batch(|| {
                value.set(2);
            });
            value.set(3);
        });
        assert_eq!(runs.get(), 2);
    }

    // ------------------------------------------------------------------
    // Stop
    // ------------------------------------------------------------------

    #[test]
    fn stop_prevents_reruns() {
        let rt = Runtime::new();
        let value = rt.signal(0_i32);
        let log = Rc::new(RefCell::new(Vec::<i32>::new()));
        let (value_c, log_c) = (value.clone(), log.clone());
        let stop = rt.run_effect(move || log_c.borrow_mut().push(value_c.get()));
        value.set(1);
        rt.tick();
        stop.stop();
        value.set(2);
        rt.tick();
        value.set(3);
        rt.tick();
        assert_eq!(*log.borrow(), vec![0, 1]);
        assert!(stop.is_stopped());
        assert_eq!(stop.dependency_count(), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let rt = Runtime::new();
        let stop = rt.run_effect(|| {});
        stop.stop();
        stop.stop();
        assert_eq!(rt.effect_count(), 0);
    }

    #[test]
    fn effect_can_stop_itself() {
        let rt = Runtime::new();
        let value = rt.signal(0_i32);
        let runs = Rc::new(Cell::new(0_u32));
        let handle: Rc<RefCell<Option<StopHandle>>> = Rc::new(RefCell::new(None));
        let (value_c, runs_c, handle_c) = (value.clone(), runs.clone(), handle.clone());
        let stop = rt.run_effect(move || {
            runs_c.set(runs_c.get() + 1);
            if value_c.get() > 0 {
                if let Some(h) = handle_c.borrow().as_ref() {
                    h.stop();
                }
            }
        });
        *handle.borrow_mut() = Some(stop.clone());
        value.set(1);
        rt.tick();
        value.set(2);
        rt.tick();
        assert_eq!(runs.get(), 2);
        assert!(stop.is_stopped());
    }

    #[test]
    fn debug_reports_stopped_state() {
        let rt = Runtime::new();
        let stop = rt.run_effect(|| {});
        assert!(format!("{stop:?}").contains("stopped: false"));
        stop.stop();
        assert!(format!("{stop:?}").contains("stopped: true"));
    }

    // ------------------------------------------------------------------
    // Nested / reentrant
    // ------------------------------------------------------------------

    #[test]
    fn nested_effect_both_track() {
        let rt = Runtime::new();
        let value = rt.signal(0_i32);
        let outer_runs = Rc::new(Cell::new(0_u32));
        let inner_runs = Rc::new(Cell::new(0_u32));
        let (rt_c, value_c, outer_c, inner_c) =
            (rt.clone(), value.clone(), outer_runs.clone(), inner_runs.clone());

        let _stop = rt.run_effect(move || {
            let _ = value_c.get();
            outer_c.set(outer_c.get() + 1);
            if outer_c.get() == 1 {
                let (value_cc, inner_cc) = (value_c.clone(), inner_c.clone());
                let _inner = rt_c.run_effect(move || {
                    let _ = value_cc.get();
                    inner_cc.set(inner_cc.get() + 1);
                });
            }
        });
        assert_eq!(outer_runs.get(), 1);
        assert_eq!(inner_runs.get(), 1);

        value.set(1);
        rt.tick();
        assert_eq!(outer_runs.get(), 2);
        assert_eq!(inner_runs.get(), 2);
    }

    #[test]
    fn stopping_nested_effect_keeps_outer_edges() {
        let rt = Runtime::new();
        let outer_src = rt.signal(0_i32);
        let inner_src = rt.signal(0_i32);
        let inner_handle: Rc<RefCell<Option<StopHandle>>> = Rc::new(RefCell::new(None));
        let outer_runs = Rc::new(Cell::new(0_u32));
        let (rt_c, outer_c, inner_c, handle_c, runs_c) = (
            rt.clone(),
            outer_src.clone(),
            inner_src.clone(),
            inner_handle.clone(),
            outer_runs.clone(),
        );

        let outer = rt.run_effect(move || {
            let _ = outer_c.get();
            runs_c.set(runs_c.get() + 1);
            if handle_c.borrow().is_none() {
                let inner_cc = inner_c.clone();
                let handle = rt_c.run_effect(move || {
                    let _ = inner_cc.get();
                });
                *handle_c.borrow_mut() = Some(handle);
            }
            // Read after the nested effect ran: must land on the outer effect.
            let _ = outer_c.get();
        });

        let inner = inner_handle.borrow().clone().expect("inner created");
        assert_eq!(outer.dependency_count(), 1);
        assert_eq!(inner.dependency_count(), 1);

        inner.stop();
        assert_eq!(outer.dependency_count(), 1);
        outer_src.set(1);
        rt.tick();
        assert_eq!(outer_runs.get(), 2);

        outer.stop();
        assert_eq!(outer.dependency_count(), 0);
    }

    #[test]
    fn stopping_outer_effect_keeps_nested_edges() {
        let rt = Runtime::new();
        let src = rt.signal(0_i32);
        let inner_runs = Rc::new(Cell::new(0_u32));
        let inner_handle: Rc<RefCell<Option<StopHandle>>> = Rc::new(RefCell::new(None));
        let (rt_c, src_c, runs_c, handle_c) =
            (rt.clone(), src.clone(), inner_runs.clone(), inner_handle.clone());

        let outer = rt.run_effect(move || {
            let _ = src_c.get();
            if handle_c.borrow().is_none() {
                let (src_cc, runs_cc) = (src_c.clone(), runs_c.clone());
                let handle = rt_c.run_effect(move || {
                    let _ = src_cc.get();
                    runs_cc.set(runs_cc.get() + 1);
                });
                *handle_c.borrow_mut() = Some(handle);
            }
        });
        outer.stop();
        src.set(1);
        rt.tick();
        assert_eq!(inner_runs.get(), 2);
    }

    #[test]
    fn effect_own_write_does_not_retrigger_itself() {
        let rt = Runtime::new();
        let value = rt.signal(0_i32);
        let runs = Rc::new(Cell::new(0_u32));
        let (value_c, runs_c) = (value.clone(), runs.clone());
        let _stop = rt.run_effect(move || {
            let v = value_c.get();
            runs_c.set(runs_c.get() + 1);
            value_c.set(v + 1);
        });
        assert_eq!(runs.get(), 1);
        assert_eq!(value.get(), 1);
    }

    #[test]
    fn effect_chain_settles() {
        let rt = Runtime::new();
        let a = rt.signal(0_i32);
        let b = rt.signal(0_i32);
        let log = Rc::new(RefCell::new(Vec::<i32>::new()));
        let (a_c, b_c) = (a.clone(), b.clone());
        let _double = rt.run_effect(move || {
            b_c.set(a_c.get() * 2);
        });
        let (b_c, log_c) = (b.clone(), log.clone());
        let _logger = rt.run_effect(move || log_c.borrow_mut().push(b_c.get()));

        a.set(5);
        rt.tick();
        assert_eq!(b.get(), 10);
        assert_eq!(log.borrow().last(), Some(&10));
    }

    #[test]
    fn panic_in_rerun_propagates_to_tick() {
        let rt = Runtime::new();
        let value = rt.signal(0_i32);
        let value_c = value.clone();
        let _stop = rt.run_effect(move || {
            if value_c.get() == 13 {
                panic!("unlucky");
            }
        });
        value.set(13);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| rt.tick()));
        assert!(result.is_err());
        assert!(!rt.is_tracking());
    }

    // ------------------------------------------------------------------
    // Watch
    // ------------------------------------------------------------------

    #[test]
    fn watch_skips_first_run() {
        let rt = Runtime::new();
        let value = rt.signal(1_i32);
        let calls = Rc::new(RefCell::new(Vec::<(i32, i32)>::new()));
        let (value_c, calls_c) = (value.clone(), calls.clone());
        let _stop = rt.watch(move || value_c.get(), move |new, old| {
            calls_c.borrow_mut().push((*new, *old));
        });
        assert!(calls.borrow().is_empty());
        value.set(2);
        rt.tick();
        value.set(5);
        rt.tick();
        assert_eq!(*calls.borrow(), vec![(2, 1), (5, 2)]);
    }

    #[test]
    fn watch_keeps_baseline_when_callback_panics() {
        let rt = Runtime::new();
        let value = rt.signal(1_i32);
        let calls = Rc::new(RefCell::new(Vec::<(i32, i32)>::new()));
        let (value_c, calls_c) = (value.clone(), calls.clone());
        let _stop = rt.watch(move || value_c.get(), move |new, old| {
            if *new == 2 {
                panic!("callback failed");
            }
            calls_c.borrow_mut().push((*new, *old));
        });
        value.set(2);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| rt.tick()));
        assert!(result.is_err());

        value.set(3);
        rt.tick();
        assert_eq!(*calls.borrow(), vec![(3, 1)]);
    }

    #[test]
    fn watch_ignores_unchanged_derived_value() {
        let rt = Runtime::new();
        let value = rt.signal(5_i32);
        let calls = Rc::new(Cell::new(0_u32));
        let (value_c, calls_c) = (value.clone(), calls.clone());
        let _stop = rt.watch(
            move || value_c.get().clamp(0, 10),
            move |_, _| calls_c.set(calls_c.get() + 1),
        );
        value.set(15);
        rt.tick();
        assert_eq!(calls.get(), 1);
        value.set(20);
        rt.tick();
        assert_eq!(calls.get(), 1);
        value.set(3);
        rt.tick();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn watch_callback_is_untracked() {
        let rt = Runtime::new();
        let watched = rt.signal(0_i32);
        let other = rt.signal(0_i32);
        let calls = Rc::new(Cell::new(0_u32));
        let (watched_c, other_c, calls_c) = (watched.clone(), other.clone(), calls.clone());
        let stop = rt.watch(move || watched_c.get(), move |_, _| {
            let _ = other_c.get();
            calls_c.set(calls_c.get() + 1);
        });
        watched.set(1);
        rt.tick();
        assert_eq!(calls.get(), 1);
        other.set(1);
        rt.tick();
        assert_eq!(calls.get(), 1);
        assert_eq!(stop.dependency_count(), 1);
    }

    #[test]
    fn stopped_watch_never_fires() {
        let rt = Runtime::new();
        let value = rt.signal(0_i32);
        let calls = Rc::new(Cell::new(0_u32));
        let (value_c, calls_c) = (value.clone(), calls.clone());
        let stop = rt.watch(move || value_c.get(), move |_, _| calls_c.set(calls_c.get() + 1));
        stop.stop();
        value.set(9);
        rt.tick();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn watch_observable_record_key() {
        let rt = Runtime::new();
        let state = rt
            .observe_value(serde_json::json!({ "title": "draft" }))
            .expect("object");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (state_c, seen_c) = (state.clone(), seen.clone());
        let _stop = rt.watch(
            move || state_c.get_value("title"),
            move |new, old| seen_c.borrow_mut().push((new.clone(), old.clone())),
        );
        state.set("title", "final");
        rt.tick();
        assert_eq!(
            *seen.borrow(),
            vec![(
                Some(serde_json::json!("final")),
                Some(serde_json::json!("draft"))
            )]
        );
    }
}
