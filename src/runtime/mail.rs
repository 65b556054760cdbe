//! Messages delivered to the interpreter task.

use crate::core::{Event, Snapshot, State};
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::sync::oneshot;

pub(crate) type Listener<S> = Box<dyn Fn(&Snapshot<S>) + Send>;

pub(crate) enum Mail<S: State> {
    /// An event sent through a handle, optionally waiting for its snapshot.
    External {
        event: Event,
        reply: Option<oneshot::Sender<Snapshot<S>>>,
    },
    /// A synthetic event produced by a timer or an invocation of one state entry.
    Scoped { generation: u64, event: Event },
    Subscribe { id: u64, listener: Listener<S> },
    Unsubscribe { id: u64 },
    Stop { reply: oneshot::Sender<()> },
}

/// Posting side of one state entry.
///
/// Holds a weak sender so pending timers and services never keep the
/// interpreter alive on their own.
#[derive(Clone)]
pub(crate) struct Scope<S: State> {
    generation: u64,
    mailbox: WeakUnboundedSender<Mail<S>>,
}

impl<S: State> Scope<S> {
    pub(crate) fn new(generation: u64, mailbox: WeakUnboundedSender<Mail<S>>) -> Self {
        Self {
            generation,
            mailbox,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Post a synthetic event. Returns `false` once the interpreter is gone.
    pub(crate) fn post(&self, event: Event) -> bool {
        match self.mailbox.upgrade() {
            Some(sender) => sender
                .send(Mail::Scoped {
                    generation: self.generation,
                    event,
                })
                .is_ok(),
            None => false,
        }
    }
}
