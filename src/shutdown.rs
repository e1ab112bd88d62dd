use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

struct Shared {
    cancelled: AtomicBool,
    waiters: AtomicU64,
    wakers: Mutex<HashMap<u64, Waker>>,
}

impl Shared {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);

        self.wakers
            .lock()
            .expect("waker map lock poisoned")
            .drain()
            .for_each(|(_id, waker)| waker.wake());
    }
}

/// The write half of the shutdown channel. Cancelling (or dropping) it
/// resolves every associated [`ShutdownSignal`].
pub struct Trigger {
    shared: Arc<Shared>,
}

impl Trigger {
    pub fn cancel(self) {
        self.shared.cancel();
    }
}

impl Drop for Trigger {
    fn drop(&mut self) {
        // a lost trigger must not leave the loop unstoppable
        self.shared.cancel();
    }
}

/// A cloneable future that resolves once shutdown has been requested.
/// Resolution is sticky: polling after readiness stays ready.
pub struct ShutdownSignal {
    shared: Arc<Shared>,
    id: u64,
}

impl ShutdownSignal {
    pub fn new() -> (Trigger, ShutdownSignal) {
        let shared = Arc::new(Shared {
            cancelled: AtomicBool::new(false),
            waiters: AtomicU64::new(0),
            wakers: Mutex::new(HashMap::new()),
        });

        (
            Trigger {
                shared: Arc::clone(&shared),
            },
            ShutdownSignal { id: 0, shared },
        )
    }
}

impl Clone for ShutdownSignal {
    fn clone(&self) -> Self {
        let id = self.shared.waiters.fetch_add(1, Ordering::SeqCst) + 1;

        ShutdownSignal {
            shared: Arc::clone(&self.shared),
            id,
        }
    }
}

impl Drop for ShutdownSignal {
    fn drop(&mut self) {
        self.shared
            .wakers
            .lock()
            .expect("waker map lock poisoned")
            .remove(&self.id);
    }
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return Poll::Ready(());
        }

        self.shared
            .wakers
            .lock()
            .expect("waker map lock poisoned")
            .insert(self.id, cx.waker().clone());

        // the trigger may have fired between the check above and the
        // waker registration; without this re-check that wakeup is lost
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return Poll::Ready(());
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_pending {
        ($var:expr) => {
            assert!(std::pin::pin!(&mut $var).poll(&mut noop_context()).is_pending());
        };
    }

    macro_rules! assert_ready {
        ($var:expr) => {
            assert!(std::pin::pin!(&mut $var).poll(&mut noop_context()).is_ready());
        };
    }

    fn noop_context() -> Context<'static> {
        Context::from_waker(Waker::noop())
    }

    #[test]
    fn cancel_resolves() {
        let (trigger, mut shutdown) = ShutdownSignal::new();

        assert_pending!(shutdown);
        trigger.cancel();
        assert_ready!(shutdown);
        // sticky
        assert_ready!(shutdown);
    }

    #[test]
    fn drop_resolves() {
        let (trigger, mut shutdown) = ShutdownSignal::new();

        assert_pending!(shutdown);
        drop(trigger);
        assert_ready!(shutdown);
    }

    #[test]
    fn clones_resolve_independently() {
        let (trigger, mut first) = ShutdownSignal::new();
        let mut second = first.clone();

        assert_pending!(first);
        assert_pending!(second);

        trigger.cancel();

        assert_ready!(first);
        assert_ready!(second);
    }

    #[tokio::test]
    async fn wakes_a_waiting_task() {
        let (trigger, shutdown) = ShutdownSignal::new();

        let waiter = tokio::spawn(shutdown);
        trigger.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("shutdown signal never resolved")
            .unwrap();
    }
}
