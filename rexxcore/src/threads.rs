use std::{
    cell::RefCell,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

use crate::{Message, NativeParker, Result, RexxError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    Waiting,
    Dead,
}

#[derive(Debug)]
pub struct WorkerShared {
    id: u64,
    name: String,
    state: Mutex<WorkerState>,
    parker: NativeParker,
    halt: Mutex<Option<String>>,
}

/// An activity able to run message dispatches. Cheap to clone.
#[derive(Clone)]
pub struct Worker(Arc<WorkerShared>);

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_WORKER: RefCell<Option<Worker>> = const { RefCell::new(None) };
}

impl Worker {
    fn new(name: impl Into<String>, state: WorkerState) -> Self {
        Self(Arc::new(WorkerShared {
            id: NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            state: Mutex::new(state),
            parker: NativeParker::new(),
            halt: Mutex::new(None),
        }))
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn state(&self) -> WorkerState {
        *self.0.state.lock()
    }

    fn set_state(&self, state: WorkerState) {
        *self.0.state.lock() = state;
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Worker) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Block the calling worker until woken. `blocker` is what it waits on.
    pub fn park(&self, blocker: Option<Value>) {
        self.set_state(WorkerState::Waiting);
        self.0.parker.park(blocker);
        self.set_state(WorkerState::Running);
    }

    pub fn park_timeout(&self, blocker: Option<Value>, timeout: Duration) -> bool {
        self.set_state(WorkerState::Waiting);
        let woken = self.0.parker.park_timeout(blocker, timeout);
        self.set_state(WorkerState::Running);
        woken
    }

    pub fn unpark(&self) {
        self.0.parker.unpark();
    }

    /// Ask the worker to stop at its next safepoint. Only live workers
    /// accept the request.
    pub fn request_halt(&self, reason: impl Into<String>) -> bool {
        match self.state() {
            WorkerState::Running | WorkerState::Waiting => {
                *self.0.halt.lock() = Some(reason.into());
                self.unpark();
                true
            }
            WorkerState::Created | WorkerState::Dead => false,
        }
    }

    fn take_halt(&self) -> Option<String> {
        self.0.halt.lock().take()
    }

    /// Drop a halt request that was never observed.
    pub(crate) fn clear_halt(&self) {
        self.take_halt();
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// The worker of the calling thread, registered on first use.
pub fn current_worker() -> Worker {
    CURRENT_WORKER.with(|current| {
        current
            .borrow_mut()
            .get_or_insert_with(|| {
                let name = thread::current().name().unwrap_or("native").to_owned();
                let worker = Worker::new(name, WorkerState::Running);
                log::debug!("registered worker {} for thread {:?}", worker.id(), thread::current().id());
                worker
            })
            .clone()
    })
}

/// Unpark `worker`. A wake that arrives before the worker parks is kept.
pub fn wake_worker(worker: &Worker) {
    worker.unpark();
}

/// Safepoint: fails with `Halted` once a halt was requested for the
/// calling worker.
pub fn check_halt() -> Result<()> {
    match current_worker().take_halt() {
        Some(reason) => Err(RexxError::Halted { reason }),
        None => Ok(()),
    }
}

/// Start `f` on a new worker thread.
pub fn spawn_worker<F>(name: impl Into<String>, f: F) -> Result<(Worker, Arc<NativeThread>)>
where
    F: FnOnce() + Send + 'static,
{
    let name = name.into();
    spawn_worker_with(thread::Builder::new().name(name.clone()), name, f)
}

fn spawn_worker_with<F>(
    builder: thread::Builder,
    name: String,
    f: F,
) -> Result<(Worker, Arc<NativeThread>)>
where
    F: FnOnce() + Send + 'static,
{
    let worker = Worker::new(name, WorkerState::Created);
    let inner = worker.clone();
    let spawned = NativeThread::spawn_with(builder, move || {
        CURRENT_WORKER.with(|current| *current.borrow_mut() = Some(inner.clone()));
        inner.set_state(WorkerState::Running);
        log::debug!("worker {} ({}) running", inner.id(), inner.name());
        f();
        inner.set_state(WorkerState::Dead);
        log::debug!("worker {} exited", inner.id());
        CURRENT_WORKER.with(|current| current.borrow_mut().take());
    });
    match spawned {
        Ok(native) => Ok((worker, native)),
        Err(err) => {
            worker.set_state(WorkerState::Dead);
            Err(err)
        }
    }
}

/// Dispatch a started message on a worker of its own.
pub fn run_on_worker(message: Arc<Message>) -> Result<Worker> {
    let name = format!("message {}", message.selector().name());
    let (worker, _native) = spawn_worker(name, move || message.run_started())?;
    Ok(worker)
}

pub struct NativeThread {
    handle: Mutex<Option<JoinHandle<()>>>,
    done: (Mutex<bool>, Condvar),
}

impl NativeThread {
    pub fn spawn<F>(name: String, f: F) -> Result<Arc<Self>>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn_with(thread::Builder::new().name(name), f)
    }

    pub fn spawn_with<F>(builder: thread::Builder, f: F) -> Result<Arc<Self>>
    where
        F: FnOnce() + Send + 'static,
    {
        let jt = Arc::new(Self {
            handle: Mutex::new(None),
            done: (Mutex::new(false), Condvar::new()),
        });

        let jt2 = Arc::clone(&jt);
        let body = move || {
            f();
            let (ref mx, ref cv) = jt2.done;
            *mx.lock() = true;
            cv.notify_all();
        };
        let h = builder.spawn(body).map_err(|err| {
            log::warn!("could not spawn a native thread: {err}");
            RexxError::ThreadStart {
                reason: err.to_string(),
            }
        })?;
        *jt.handle.lock() = Some(h);
        Ok(jt)
    }

    pub fn join_timeout(&self, dur: Duration) -> bool {
        let (ref mx, ref cv) = self.done;
        let mut done = mx.lock();
        if *done {
            return true;
        }
        let res = cv.wait_for(&mut done, dur);
        !res.timed_out() || *done
    }

    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(h) = handle {
            let _ = h.join();
            let (ref mx, ref cv) = self.done;
            *mx.lock() = true;
            cv.notify_all();
            return;
        }

        let (ref mx, ref cv) = self.done;
        let mut done = mx.lock();
        while !*done {
            cv.wait(&mut done);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
    use std::time::Instant;

    #[test]
    fn current_worker_is_stable_per_thread() {
        let a = current_worker();
        let b = current_worker();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.state(), WorkerState::Running);

        let other = thread::spawn(|| current_worker().id()).join().unwrap();
        assert_ne!(other, a.id());
    }

    #[test]
    fn spawned_worker_sees_itself_as_current() {
        let (tx, rx) = std::sync::mpsc::channel();
        let (worker, native) = spawn_worker("reporter", move || {
            tx.send(current_worker().id()).unwrap();
        }).unwrap();
        assert_eq!(rx.recv().unwrap(), worker.id());
        native.join();
        assert_eq!(worker.state(), WorkerState::Dead);
        assert_eq!(worker.name(), "reporter");
    }

    #[test]
    fn wake_before_park_is_not_lost() {
        let ready = Arc::new(AtomicBool::new(false));
        let ready2 = ready.clone();
        let (worker, native) = spawn_worker("sleeper", move || {
            while !ready2.load(SeqCst) {
                thread::yield_now();
            }
            current_worker().park(None);
        }).unwrap();
        wake_worker(&worker);
        ready.store(true, SeqCst);
        assert!(native.join_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn failed_thread_start_is_reported() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        let builder = thread::Builder::new().stack_size(isize::MAX as usize);
        let outcome = spawn_worker_with(builder, "oversized".into(), move || ran2.store(true, SeqCst));
        let err = outcome.err().unwrap();
        assert_eq!(err.name(), "thread start");
        assert!(!ran.load(SeqCst));
    }

    #[test]
    fn halt_is_observed_at_safepoint() {
        let (tx, rx) = std::sync::mpsc::channel();
        let (worker, native) = spawn_worker("looper", move || {
            let started = Instant::now();
            let outcome = loop {
                if let Err(err) = check_halt() {
                    break Some(err);
                }
                if started.elapsed() > Duration::from_secs(5) {
                    break None;
                }
                current_worker().park_timeout(None, Duration::from_millis(5));
            };
            tx.send(outcome).unwrap();
        }).unwrap();
        while worker.state() == WorkerState::Created {
            thread::yield_now();
        }
        assert!(worker.request_halt("stop"));
        let outcome = rx.recv().unwrap();
        assert_eq!(outcome, Some(RexxError::Halted { reason: "stop".into() }));
        native.join();
        assert!(!worker.request_halt("again"));
    }
}
