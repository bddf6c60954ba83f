use dashmap::DashMap;
use parking_lot::Mutex;
use vkshim_protocol::SurrogateId;

/// Bookkeeping that must run once the deferred work is known to have
/// finished: releasing retained argument copies, publishing produced
/// objects.
pub type CompletionAction = Box<dyn FnOnce() + Send>;

/// Consumer of the produced-object list, run after the completion actions.
pub type PostCheck = Box<dyn FnOnce(&[SurrogateId]) + Send>;

/// Per-operation deferred work, keyed by the operation's surrogate identity.
///
/// A deferred operation's completion can be observed from two independent
/// paths -- an explicit join, or a poll of the final result -- on whatever
/// thread the client chooses. Each of the three lists here is detached
/// atomically on first observation, so whichever path arrives second finds
/// nothing and does nothing. Detached closures run with no map lock held;
/// they are free to call back into the layer.
#[derive(Default)]
pub struct DeferredOperationTracker {
    // The closure lists sit behind a Mutex only to be shareable between
    // threads; all mutation goes through the map's own entry guards.
    completion_actions: DashMap<SurrogateId, Mutex<Vec<CompletionAction>>>,
    post_checks: DashMap<SurrogateId, Mutex<Vec<PostCheck>>>,
    produced: DashMap<SurrogateId, Vec<SurrogateId>>,
    in_flight: DashMap<SurrogateId, ()>,
}

impl DeferredOperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action to run when the operation is first observed complete.
    /// Actions run in the order they were queued.
    pub fn queue_completion(&self, op: SurrogateId, action: CompletionAction) {
        self.completion_actions
            .entry(op)
            .or_default()
            .get_mut()
            .push(action);
    }

    /// Queue a consumer of the operation's produced-object list.
    pub fn queue_post_check(&self, op: SurrogateId, check: PostCheck) {
        self.post_checks.entry(op).or_default().get_mut().push(check);
    }

    /// Record objects produced by the deferred work, for the post-check
    /// consumers to pick up.
    pub fn record_produced(&self, op: SurrogateId, objects: Vec<SurrogateId>) {
        self.produced.entry(op).or_default().extend(objects);
    }

    /// Run everything attached to the operation. Called on the first event
    /// that reports overall success, from whichever thread observed it; a
    /// racing second observer backs off while the first consumer's
    /// detachment covers everything queued so far, and anything arriving
    /// after consumption finds the lists already empty.
    pub fn consume(&self, op: SurrogateId) {
        if self.in_flight.insert(op, ()).is_some() {
            return;
        }

        // Completion actions first: they release retained buffers and
        // publish the produced-object list the post-checks read.
        if let Some((_, actions)) = self.completion_actions.remove(&op) {
            for action in actions.into_inner() {
                action();
            }
        }

        let produced = self
            .produced
            .remove(&op)
            .map(|(_, objects)| objects)
            .unwrap_or_default();
        if let Some((_, checks)) = self.post_checks.remove(&op) {
            for check in checks.into_inner() {
                check(&produced);
            }
        }

        self.in_flight.remove(&op);
    }

    /// Drop whatever is still attached to an operation without running it.
    /// Destruction path only: a record must have been fully consumed before
    /// its operation is destroyed, so normally there is nothing here.
    pub fn forget(&self, op: SurrogateId) {
        self.completion_actions.remove(&op);
        self.post_checks.remove(&op);
        self.produced.remove(&op);
        self.in_flight.remove(&op);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    const OP: SurrogateId = SurrogateId(0x2000);

    #[test]
    fn actions_run_in_queue_order() {
        let tracker = DeferredOperationTracker::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let order = Arc::clone(&order);
            tracker.queue_completion(OP, Box::new(move || order.lock().unwrap().push(i)));
        }
        tracker.consume(OP);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn post_checks_see_produced_objects() {
        let tracker = DeferredOperationTracker::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            tracker.queue_post_check(
                OP,
                Box::new(move |objects| seen.lock().unwrap().extend_from_slice(objects)),
            );
        }
        tracker.record_produced(OP, vec![SurrogateId(1), SurrogateId(2)]);
        tracker.consume(OP);
        assert_eq!(*seen.lock().unwrap(), vec![SurrogateId(1), SurrogateId(2)]);
    }

    #[test]
    fn produced_objects_recorded_by_an_action_reach_post_checks() {
        let tracker = Arc::new(DeferredOperationTracker::new());
        {
            let inner = Arc::clone(&tracker);
            tracker.queue_completion(
                OP,
                Box::new(move || inner.record_produced(OP, vec![SurrogateId(9)])),
            );
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            tracker.queue_post_check(
                OP,
                Box::new(move |objects| seen.lock().unwrap().extend_from_slice(objects)),
            );
        }
        tracker.consume(OP);
        assert_eq!(*seen.lock().unwrap(), vec![SurrogateId(9)]);
    }

    #[test]
    fn consume_twice_is_a_no_op() {
        let tracker = DeferredOperationTracker::new();
        let runs = Arc::new(AtomicUsize::new(0));
        {
            let runs = Arc::clone(&runs);
            tracker.queue_completion(
                OP,
                Box::new(move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        tracker.consume(OP);
        tracker.consume(OP);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn consume_without_record_is_a_no_op() {
        let tracker = DeferredOperationTracker::new();
        tracker.consume(SurrogateId(0x9999));
    }

    #[test]
    fn forget_drops_queued_work_without_running_it() {
        let tracker = DeferredOperationTracker::new();
        let runs = Arc::new(AtomicUsize::new(0));
        {
            let runs = Arc::clone(&runs);
            tracker.queue_completion(
                OP,
                Box::new(move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        tracker.forget(OP);
        tracker.consume(OP);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reentrant_consume_from_an_action_does_not_deadlock() {
        let tracker = Arc::new(DeferredOperationTracker::new());
        {
            let inner = Arc::clone(&tracker);
            tracker.queue_completion(OP, Box::new(move || inner.consume(OP)));
        }
        tracker.consume(OP);
    }
}
