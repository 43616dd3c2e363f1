use std::{mem, sync::Arc};

use parking_lot::Mutex;

use crate::{
    Result, RexxError, Selector, Value, Visitable, Visitor,
    threads::{self, Worker},
};

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct MessageFlags: u8 {
        /// dispatch finished without raising
        const RESULT_RETURNED = 1 << 0;
        /// dispatch raised, the error is kept
        const RAISE_ERROR = 1 << 1;
        /// the error was handed to a `result()` caller
        const ERROR_REPORTED = 1 << 2;
        /// waiters and interested parties have been told
        const ALL_NOTIFIED = 1 << 3;
        /// started, the worker has not picked it up yet
        const START_PENDING = 1 << 4;
        /// dispatch has begun
        const SENT = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Idle,
    Pending,
    Dispatching,
    CompletedSuccess,
    CompletedError,
}

impl MessageFlags {
    fn status(self) -> MessageStatus {
        if self.contains(MessageFlags::RAISE_ERROR) {
            MessageStatus::CompletedError
        } else if self.contains(MessageFlags::RESULT_RETURNED) {
            MessageStatus::CompletedSuccess
        } else if self.contains(MessageFlags::SENT) {
            MessageStatus::Dispatching
        } else if self.contains(MessageFlags::START_PENDING) {
            MessageStatus::Pending
        } else {
            MessageStatus::Idle
        }
    }

    #[inline]
    fn completed(self) -> bool {
        self.intersects(MessageFlags::RESULT_RETURNED | MessageFlags::RAISE_ERROR)
    }
}

#[derive(Debug, Default)]
struct MessageState {
    flags: MessageFlags,
    result: Option<Value>,
    error: Option<RexxError>,
    dispatch_worker: Option<Worker>,
    // halt asked of the dispatch worker on behalf of this message
    halt_requested: bool,
    waiters: Vec<Worker>,
    interested: Vec<Value>,
}

impl Default for MessageFlags {
    fn default() -> Self {
        MessageFlags::empty()
    }
}

/// A deferred method invocation: target, selector and arguments, sent
/// once either on the caller's worker or on a worker of its own.
#[derive(Debug)]
pub struct Message {
    target: Value,
    selector: Selector,
    arguments: Vec<Value>,
    state: Mutex<MessageState>,
}

impl Message {
    pub fn new(target: Value, selector: Selector, arguments: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            target,
            selector,
            arguments,
            state: Mutex::new(MessageState::default()),
        })
    }

    #[inline]
    pub fn target(&self) -> &Value {
        &self.target
    }

    #[inline]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    #[inline]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn flags(&self) -> MessageFlags {
        self.state.lock().flags
    }

    pub fn status(&self) -> MessageStatus {
        self.flags().status()
    }

    pub fn completed(&self) -> bool {
        self.flags().completed()
    }

    /// Completed normally with a value.
    pub fn has_result(&self) -> bool {
        let state = self.state.lock();
        state.flags.contains(MessageFlags::RESULT_RETURNED) && state.result.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.flags().contains(MessageFlags::RAISE_ERROR)
    }

    pub fn error_condition(&self) -> Option<RexxError> {
        self.state.lock().error.clone()
    }

    // claim an idle envelope, flagging it with `flag`
    fn claim(&self, flag: MessageFlags) -> Result<()> {
        let mut state = self.state.lock();
        if state.flags.status() != MessageStatus::Idle {
            return Err(RexxError::MessageReuse);
        }
        state.flags |= flag;
        if flag.contains(MessageFlags::SENT) {
            state.dispatch_worker = Some(threads::current_worker());
        }
        Ok(())
    }

    /// Dispatch synchronously on the calling worker.
    pub fn send(self: &Arc<Self>) -> Result<Option<Value>> {
        self.claim(MessageFlags::SENT)?;
        let outcome = self.dispatch();
        self.complete(outcome.clone());
        outcome
    }

    /// Dispatch on a new worker and return immediately.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        self.start_on(threads::run_on_worker)
    }

    fn start_on(self: &Arc<Self>, run: impl FnOnce(Arc<Message>) -> Result<Worker>) -> Result<()> {
        self.claim(MessageFlags::START_PENDING)?;
        let worker = match run(self.clone()) {
            Ok(worker) => worker,
            Err(err) => {
                // back to idle, nobody will ever dispatch it
                self.state.lock().flags.remove(MessageFlags::START_PENDING);
                return Err(err);
            }
        };
        let mut state = self.state.lock();
        if state.dispatch_worker.is_none() && !state.flags.completed() {
            state.dispatch_worker = Some(worker);
        }
        Ok(())
    }

    /// Start a fresh copy of this message, sharing its interested
    /// parties. This envelope is left as it is.
    pub fn reply(self: &Arc<Self>) -> Result<Arc<Message>> {
        let interested = self.state.lock().interested.clone();
        let copy = Arc::new(Self {
            target: self.target.clone(),
            selector: self.selector.clone(),
            arguments: self.arguments.clone(),
            state: Mutex::new(MessageState {
                interested,
                ..MessageState::default()
            }),
        });
        copy.start()?;
        Ok(copy)
    }

    /// Body of a started message, run by its worker.
    pub(crate) fn run_started(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.flags.remove(MessageFlags::START_PENDING);
            state.flags |= MessageFlags::SENT;
            state.dispatch_worker = Some(threads::current_worker());
        }
        let outcome = self.dispatch();
        self.complete(outcome);
    }

    fn dispatch(&self) -> Result<Option<Value>> {
        log::debug!("dispatching {:?} to {:?}", self.selector, self.target);
        threads::check_halt()?;
        self.target.send(&self.selector, &self.arguments)
    }

    // Store the outcome, then wake every waiter and tell every
    // interested party, once.
    fn complete(self: &Arc<Self>, outcome: Result<Option<Value>>) {
        let halted = matches!(outcome, Err(RexxError::Halted { .. }));
        let (waiters, parties) = {
            let mut state = self.state.lock();
            if state.halt_requested && !halted {
                // the dispatch finished before reaching a safepoint
                if let Some(worker) = &state.dispatch_worker {
                    worker.clear_halt();
                }
            }
            match outcome {
                Ok(result) => {
                    state.result = result;
                    state.flags |= MessageFlags::RESULT_RETURNED;
                }
                Err(error) => {
                    state.error = Some(error);
                    state.flags |= MessageFlags::RAISE_ERROR;
                }
            }
            if state.flags.contains(MessageFlags::ALL_NOTIFIED) {
                return;
            }
            state.flags |= MessageFlags::ALL_NOTIFIED;
            (mem::take(&mut state.waiters), mem::take(&mut state.interested))
        };
        log::debug!(
            "{:?} completed, waking {} waiters and {} parties",
            self.selector,
            waiters.len(),
            parties.len()
        );
        for waiter in &waiters {
            threads::wake_worker(waiter);
        }
        for party in &parties {
            self.notify_party(party);
        }
    }

    fn notify_party(self: &Arc<Self>, party: &Value) {
        let argument = [Value::Message(self.clone())];
        if let Err(err) = party.send(&Selector::new("MESSAGECOMPLETE"), &argument) {
            log::warn!("interested party of {:?} failed: {err}", self.selector);
        }
    }

    /// Register a party to be sent `MESSAGECOMPLETE` once this message
    /// completes, or right away if it already has.
    pub fn notify(self: &Arc<Self>, party: Value) {
        {
            let mut state = self.state.lock();
            if !state.flags.contains(MessageFlags::ALL_NOTIFIED) {
                state.interested.push(party);
                return;
            }
        }
        self.notify_party(&party);
    }

    /// Block until the message completes.
    pub fn wait(self: &Arc<Self>) -> Result<()> {
        let me = threads::current_worker();
        loop {
            {
                let mut state = self.state.lock();
                match state.flags.status() {
                    MessageStatus::Idle => return Err(RexxError::MessageNotSent),
                    MessageStatus::CompletedSuccess | MessageStatus::CompletedError => {
                        return Ok(());
                    }
                    MessageStatus::Pending | MessageStatus::Dispatching => (),
                }
                if state.dispatch_worker.as_ref().is_some_and(|w| w.ptr_eq(&me)) {
                    return Err(RexxError::Deadlock { worker: me.id() });
                }
                if !state.waiters.iter().any(|w| w.ptr_eq(&me)) {
                    state.waiters.push(me.clone());
                }
            }
            me.park(Some(Value::Message(self.clone())));
            if let Err(err) = threads::check_halt() {
                self.state.lock().waiters.retain(|w| !w.ptr_eq(&me));
                return Err(err);
            }
        }
    }

    /// Wait, then hand back the result or the error the dispatch raised.
    pub fn result(self: &Arc<Self>) -> Result<Option<Value>> {
        self.wait()?;
        let mut state = self.state.lock();
        if state.flags.contains(MessageFlags::RAISE_ERROR) {
            state.flags |= MessageFlags::ERROR_REPORTED;
            return Err(state.error.clone().unwrap_or(RexxError::MessageNotSent));
        }
        Ok(state.result.clone())
    }

    /// Ask the dispatching worker to halt. `false` unless the dispatch
    /// is currently running.
    pub fn halt(&self, reason: Option<&str>) -> bool {
        let mut state = self.state.lock();
        if state.flags.status() != MessageStatus::Dispatching {
            return false;
        }
        let requested = state
            .dispatch_worker
            .as_ref()
            .is_some_and(|w| w.request_halt(reason.unwrap_or("message halted")));
        state.halt_requested |= requested;
        requested
    }
}

impl Visitable for Message {
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        visitor.visit(&self.target);
        self.arguments.iter().for_each(|arg| visitor.visit(arg));
        let state = self.state.lock();
        if let Some(result) = &state.result {
            visitor.visit(result);
        }
        state.interested.iter().for_each(|party| visitor.visit(party));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Receiver;
    use std::{
        sync::atomic::{AtomicUsize, Ordering::SeqCst},
        thread,
        time::Duration,
    };

    /// Host object answering `FOO` (optionally after a delay), `NOTHING`,
    /// `FAIL` and counting `MESSAGECOMPLETE`.
    #[derive(Default)]
    struct Host {
        delay: Duration,
        completions: AtomicUsize,
    }

    impl Receiver for Host {
        fn invoke(&self, selector: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
            match selector.name() {
                "FOO" => {
                    thread::sleep(self.delay);
                    Ok(Some(Value::from(42i64)))
                }
                "NOTHING" => Ok(None),
                "FAIL" => Err(RexxError::raised("SYNTAX", "failed on purpose")),
                "ECHO" => Ok(arguments.first().cloned()),
                "SPIN" => loop {
                    threads::check_halt()?;
                    thread::sleep(Duration::from_millis(2));
                },
                "MESSAGECOMPLETE" => {
                    assert!(matches!(arguments, [Value::Message(_)]));
                    self.completions.fetch_add(1, SeqCst);
                    Ok(None)
                }
                _ => Err(RexxError::NoMethod {
                    selector: selector.name().to_owned(),
                }),
            }
        }
    }

    fn host(delay_ms: u64) -> Arc<Host> {
        Arc::new(Host {
            delay: Duration::from_millis(delay_ms),
            ..Host::default()
        })
    }

    fn message_to(target: &Arc<Host>, name: &str) -> Arc<Message> {
        Message::new(Value::Native(target.clone()), Selector::new(name), vec![])
    }

    #[test]
    fn send_returns_the_result() {
        let target = host(0);
        let message = Message::new(Value::Native(target), Selector::new("echo"), vec!["x".into()]);
        let result = message.send().unwrap();
        assert!(result.is_some_and(|v| v.equals(&"x".into())));
        assert_eq!(message.status(), MessageStatus::CompletedSuccess);
        assert!(message.has_result());
    }

    #[test]
    fn started_message_reports_result() {
        let target = host(10);
        let message = message_to(&target, "foo");
        message.start().unwrap();
        message.wait().unwrap();
        assert!(message.has_result());
        assert_eq!(message.result().unwrap().and_then(|v| v.as_integer()), Some(42));

        let silent = message_to(&target, "nothing");
        silent.start().unwrap();
        silent.wait().unwrap();
        assert!(silent.completed());
        assert!(!silent.has_result());
    }

    #[test]
    fn envelopes_are_single_use() {
        let target = host(0);
        let message = message_to(&target, "nothing");
        message.send().unwrap();
        assert_eq!(message.send().unwrap_err(), RexxError::MessageReuse);
        assert_eq!(message.start().unwrap_err(), RexxError::MessageReuse);
    }

    #[test]
    fn result_before_send_fails() {
        let target = host(0);
        let message = message_to(&target, "foo");
        assert_eq!(message.result().unwrap_err(), RexxError::MessageNotSent);
        assert_eq!(message.status(), MessageStatus::Idle);
    }

    #[test]
    fn errors_are_captured_and_reported() {
        let target = host(0);
        let message = message_to(&target, "fail");
        message.start().unwrap();
        let err = message.result().unwrap_err();
        assert_eq!(err.name(), "raised");
        assert!(message.has_error());
        assert!(message.flags().contains(MessageFlags::ERROR_REPORTED));
        assert_eq!(message.error_condition(), Some(err.clone()));
        // every caller sees the same error
        assert_eq!(message.result().unwrap_err(), err);
    }

    #[test]
    fn waiting_on_own_dispatch_is_a_deadlock() {
        struct Recursive(Mutex<Option<Arc<Message>>>);
        impl Receiver for Recursive {
            fn invoke(&self, _: &Selector, _: &[Value]) -> Result<Option<Value>> {
                let message = self.0.lock().clone();
                match message {
                    Some(message) => message.wait().map(|_| None),
                    None => Ok(None),
                }
            }
        }
        let target = Arc::new(Recursive(Mutex::new(None)));
        let message = Message::new(Value::Native(target.clone()), Selector::new("go"), vec![]);
        *target.0.lock() = Some(message.clone());
        let err = message.send().unwrap_err();
        assert_eq!(err.name(), "deadlock");
        // break the cycle
        target.0.lock().take();
    }

    #[test]
    fn every_party_and_waiter_is_notified_once() {
        for failing in [false, true] {
            let target = host(30);
            let parties: Vec<Arc<Host>> = (0..4).map(|_| host(0)).collect();
            let message = message_to(&target, if failing { "fail" } else { "foo" });
            for party in &parties {
                message.notify(Value::Native(party.clone()));
            }
            message.start().unwrap();

            let woken = Arc::new(AtomicUsize::new(0));
            let waiters: Vec<_> = (0..3)
                .map(|_| {
                    let message = message.clone();
                    let woken = woken.clone();
                    thread::spawn(move || {
                        message.wait().unwrap();
                        woken.fetch_add(1, SeqCst);
                    })
                })
                .collect();
            for waiter in waiters {
                waiter.join().unwrap();
            }
            assert_eq!(woken.load(SeqCst), 3);
            for party in &parties {
                assert_eq!(party.completions.load(SeqCst), 1);
            }
            assert!(message.flags().contains(MessageFlags::ALL_NOTIFIED));
            assert_eq!(message.has_error(), failing);
        }
    }

    #[test]
    fn late_party_is_notified_immediately() {
        let target = host(0);
        let party = host(0);
        let message = message_to(&target, "foo");
        message.send().unwrap();
        message.notify(Value::Native(party.clone()));
        assert_eq!(party.completions.load(SeqCst), 1);
    }

    #[test]
    fn reply_starts_a_copy() {
        let target = host(0);
        let party = host(0);
        let message = message_to(&target, "foo");
        message.notify(Value::Native(party.clone()));
        let copy = message.reply().unwrap();
        assert_eq!(copy.result().unwrap().and_then(|v| v.as_integer()), Some(42));
        assert_eq!(message.status(), MessageStatus::Idle);
        assert_eq!(party.completions.load(SeqCst), 1);
        // the original is still usable
        assert!(message.send().is_ok());
        assert_eq!(party.completions.load(SeqCst), 2);
    }

    #[test]
    fn halt_stops_a_running_dispatch() {
        let target = host(0);
        let message = message_to(&target, "spin");
        assert!(!message.halt(None));
        message.start().unwrap();
        while message.status() != MessageStatus::Dispatching {
            thread::yield_now();
        }
        assert!(message.halt(Some("enough")));
        let err = message.result().unwrap_err();
        assert_eq!(err, RexxError::Halted { reason: "enough".into() });
        assert!(!message.halt(None));
    }

    #[test]
    fn failed_start_leaves_the_envelope_idle() {
        let target = host(0);
        let message = message_to(&target, "foo");
        let err = message
            .start_on(|_| Err(RexxError::ThreadStart { reason: "no threads".into() }))
            .unwrap_err();
        assert_eq!(err.name(), "thread start");
        assert_eq!(message.status(), MessageStatus::Idle);
        assert_eq!(message.wait().unwrap_err(), RexxError::MessageNotSent);
        // the envelope can still be used
        message.start().unwrap();
        assert_eq!(message.result().unwrap().and_then(|v| v.as_integer()), Some(42));
    }

    // started without a worker, the test runs the body itself
    fn start_held(message: &Arc<Message>) {
        message.start_on(|_| Ok(threads::current_worker())).unwrap();
        assert_eq!(message.status(), MessageStatus::Pending);
    }

    fn wait_for_waiters(message: &Message, count: usize) {
        while message.state.lock().waiters.len() < count {
            thread::yield_now();
        }
    }

    #[test]
    fn waiting_on_a_pending_message() {
        let target = host(0);
        let message = message_to(&target, "foo");
        start_held(&message);

        let waiter = {
            let message = message.clone();
            thread::spawn(move || message.result())
        };
        wait_for_waiters(&message, 1);
        assert_eq!(message.status(), MessageStatus::Pending);

        message.run_started();
        let result = waiter.join().unwrap().unwrap();
        assert_eq!(result.and_then(|v| v.as_integer()), Some(42));
        assert!(message.state.lock().waiters.is_empty());
    }

    #[test]
    fn waiters_are_woken_in_registration_order() {
        let target = host(0);
        let message = message_to(&target, "foo");
        start_held(&message);

        let mut ids = Vec::new();
        let mut handles = Vec::new();
        for n in 1..=3 {
            let (tx, rx) = std::sync::mpsc::channel();
            let waiting = message.clone();
            handles.push(thread::spawn(move || {
                tx.send(threads::current_worker().id()).unwrap();
                waiting.wait()
            }));
            ids.push(rx.recv().unwrap());
            wait_for_waiters(&message, n);
        }
        let registered: Vec<u64> = message.state.lock().waiters.iter().map(Worker::id).collect();
        assert_eq!(registered, ids);

        message.run_started();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
    }

    #[test]
    fn halt_of_a_finished_send_does_not_linger() {
        struct HaltsItself(Mutex<Option<Arc<Message>>>);
        impl Receiver for HaltsItself {
            fn invoke(&self, _: &Selector, _: &[Value]) -> Result<Option<Value>> {
                let message = self.0.lock().clone();
                if let Some(message) = message {
                    assert!(message.halt(Some("late")));
                }
                Ok(Some(Value::from(1i64)))
            }
        }
        let target = Arc::new(HaltsItself(Mutex::new(None)));
        let message = Message::new(Value::Native(target.clone()), Selector::new("go"), vec![]);
        *target.0.lock() = Some(message.clone());
        assert!(message.send().unwrap().is_some());
        assert!(threads::check_halt().is_ok());
        target.0.lock().take();
    }
}
