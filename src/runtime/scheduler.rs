//! Delayed transitions scoped to the active state.

use super::mail::Scope;
use crate::core::{Event, State};
use crate::definition::DelayedTransitions;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Timers armed by the current state entry.
///
/// Every timer posts its `after.<ms>.<state>` event through the entry's
/// [`Scope`]. Cancelling aborts the tasks; a firing that already reached the
/// mailbox is dropped by the interpreter because its generation is stale.
#[derive(Default)]
pub(crate) struct Scheduler {
    timers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub(crate) fn arm<S: State>(&mut self, groups: &[DelayedTransitions<S>], scope: &Scope<S>) {
        let now = Instant::now();
        for group in groups {
            let deadline = now + group.delay();
            let kind = group.kind().to_string();
            let scope = scope.clone();
            trace!(event = %kind, generation = scope.generation(), "arming timer");
            self.timers.push(tokio::spawn(async move {
                sleep_until(deadline).await;
                scope.post(Event::named(kind));
            }));
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.timers.iter().filter(|timer| !timer.is_finished()).count()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
