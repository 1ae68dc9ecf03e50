//! Background execution: run long native work on worker threads and deliver the
//! outcome back on the UI thread.
//!
//! [`UiLoop`] is a single-threaded task queue bound to the thread that created
//! it (the "UI thread"). [`UiHandle`] is its cloneable, `Send` posting end.
//! [`BackgroundExecutor`] spawns one worker thread per job; when the work
//! returns, succeeds or fails or panics, exactly one completion is posted to the
//! UI loop. The caller never blocks on the work.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn};

use crate::config::WorkerConfig;
use crate::{BenchError, BenchResult};

type UiTask = Box<dyn FnOnce() + Send>;

/// Event loop for the UI thread.
pub struct UiLoop {
    rx: Receiver<UiTask>,
    thread: ThreadId,
    // Tasks must run on the creating thread.
    _not_send: PhantomData<*const ()>,
}

#[derive(Clone)]
pub struct UiHandle {
    tx: Sender<UiTask>,
    ui_thread: ThreadId,
}

impl UiLoop {
    /// Create a loop bound to the calling thread.
    pub fn new() -> (UiLoop, UiHandle) {
        let (tx, rx) = mpsc::channel();
        let thread = thread::current().id();
        (
            UiLoop { rx, thread, _not_send: PhantomData },
            UiHandle { tx, ui_thread: thread },
        )
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    /// Run every task already queued, without waiting. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one task and run it. Returns whether a task ran.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run tasks until `done` holds or `timeout` elapses. Returns whether `done` held.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        // `None` when the timeout is too large to represent: wait indefinitely.
        let deadline = Instant::now().checked_add(timeout);
        while !done() {
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    deadline - now
                }
                None => Duration::from_secs(3600),
            };
            self.run_next(wait);
        }
        true
    }

    /// Run tasks until every [`UiHandle`] is dropped.
    pub fn run(&self) {
        while let Ok(task) = self.rx.recv() {
            task();
        }
    }
}

impl UiHandle {
    pub fn ui_thread(&self) -> ThreadId {
        self.ui_thread
    }

    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui_thread
    }

    /// Queue `task` on the UI loop. Returns false if the loop is gone.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(task)).is_ok()
    }
}

/// Cooperative cancellation flag handed to background work.
///
/// Nothing in this crate interrupts a native call; work may check the token
/// before starting one.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a dispatched job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: u64,
    pub token: CancellationToken,
}

/// Spawns background jobs and routes their completions to a [`UiHandle`].
pub struct BackgroundExecutor {
    ui: UiHandle,
    config: WorkerConfig,
    next_id: AtomicU64,
}

impl BackgroundExecutor {
    pub fn new(ui: UiHandle, config: WorkerConfig) -> Self {
        BackgroundExecutor { ui, config, next_id: AtomicU64::new(1) }
    }

    pub fn ui(&self) -> &UiHandle {
        &self.ui
    }

    /// Run `work` on a new worker thread and deliver its result to `on_complete`
    /// on the UI thread. Returns immediately.
    ///
    /// A panic in `work` is delivered as [`BenchError::WorkerPanicked`]. If the
    /// worker cannot be spawned, the failure is still delivered to `on_complete`.
    pub fn dispatch<T, W, C>(&self, work: W, on_complete: C) -> JobHandle
    where
        T: Send + 'static,
        W: FnOnce(&CancellationToken) -> BenchResult<T> + Send + 'static,
        C: FnOnce(BenchResult<T>) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::default();
        let completion: Arc<Mutex<Option<C>>> = Arc::new(Mutex::new(Some(on_complete)));

        let ui = self.ui.clone();
        let worker_token = token.clone();
        let worker_completion = Arc::clone(&completion);
        let mut builder = thread::Builder::new().name(format!("{}-{id}", self.config.thread_name));
        if let Some(stack) = self.config.stack_size_bytes {
            builder = builder.stack_size(stack);
        }

        let spawned = builder.spawn(move || {
            let _span = info_span!("background_job", job = id).entered();
            let start = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| work(&worker_token)))
                .unwrap_or_else(|payload| Err(BenchError::WorkerPanicked(panic_message(payload))));
            info!(job = id, ok = result.is_ok(), elapsed_ms = start.elapsed().as_millis() as u64, "background job finished");
            deliver(&ui, id, &worker_completion, result);
        });

        match spawned {
            Ok(_) => debug!(job = id, "background job dispatched"),
            Err(e) => {
                warn!(job = id, error = %e, "failed to spawn worker");
                deliver(
                    &self.ui,
                    id,
                    &completion,
                    Err(BenchError::Message(format!("failed to start benchmark worker: {e}"))),
                );
            }
        }
        JobHandle { id, token }
    }

    /// String-only form: failures are rendered as an `Error: ...` message.
    pub fn run_off_thread<W, C>(&self, work: W, on_complete: C) -> JobHandle
    where
        W: FnOnce() -> BenchResult<String> + Send + 'static,
        C: FnOnce(String) + Send + 'static,
    {
        self.dispatch(move |_| work(), move |result| on_complete(render_outcome(result)))
    }
}

fn deliver<T, C>(ui: &UiHandle, id: u64, completion: &Mutex<Option<C>>, result: BenchResult<T>)
where
    T: Send + 'static,
    C: FnOnce(BenchResult<T>) + Send + 'static,
{
    let Some(on_complete) = completion.lock().ok().and_then(|mut slot| slot.take()) else {
        return;
    };
    if !ui.post(move || on_complete(result)) {
        warn!(job = id, "UI loop closed; completion dropped");
    }
}

/// Text shown in the output region for a finished job.
pub fn render_outcome(result: BenchResult<String>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => format!("Error: {e}"),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const WAIT: Duration = Duration::from_secs(10);

    fn executor() -> (UiLoop, BackgroundExecutor) {
        let (ui_loop, handle) = UiLoop::new();
        (ui_loop, BackgroundExecutor::new(handle, WorkerConfig::default()))
    }

    #[test]
    fn test_post_runs_on_loop_thread() {
        let (ui_loop, handle) = UiLoop::new();
        let seen = Arc::new(Mutex::new(None));
        let seen2 = Arc::clone(&seen);
        let h2 = handle.clone();
        thread::spawn(move || {
            h2.post(move || *seen2.lock().unwrap() = Some(thread::current().id()));
        })
        .join()
        .unwrap();

        assert_eq!(ui_loop.run_pending(), 1);
        assert_eq!(*seen.lock().unwrap(), Some(ui_loop.thread_id()));
    }

    #[test]
    fn test_run_ends_when_handles_drop() {
        let (ui_loop, handle) = UiLoop::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = Arc::clone(&count);
            handle.post(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(handle);
        ui_loop.run();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_worker_error_is_rendered() {
        let (ui_loop, exec) = executor();
        let out = Arc::new(Mutex::new(None));
        let out2 = Arc::clone(&out);
        exec.run_off_thread(
            || Err(BenchError::native("null result")),
            move |s| *out2.lock().unwrap() = Some(s),
        );
        assert!(ui_loop.run_until(WAIT, || out.lock().unwrap().is_some()));
        assert_eq!(
            out.lock().unwrap().as_deref(),
            Some("Error: native benchmark failed: null result")
        );
    }

    #[test]
    fn test_worker_panic_is_delivered() {
        let (ui_loop, exec) = executor();
        let out = Arc::new(Mutex::new(None));
        let out2 = Arc::clone(&out);
        exec.dispatch(
            |_| -> BenchResult<String> { panic!("prover exploded") },
            move |r| *out2.lock().unwrap() = Some(r),
        );
        assert!(ui_loop.run_until(WAIT, || out.lock().unwrap().is_some()));
        match out.lock().unwrap().take() {
            Some(Err(BenchError::WorkerPanicked(msg))) => assert_eq!(msg, "prover exploded"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_job_ids_increase() {
        let (ui_loop, exec) = executor();
        let done = Arc::new(AtomicUsize::new(0));
        let (d1, d2) = (Arc::clone(&done), Arc::clone(&done));
        let a = exec.run_off_thread(|| Ok("a".into()), move |_| {
            d1.fetch_add(1, Ordering::SeqCst);
        });
        let b = exec.run_off_thread(|| Ok("b".into()), move |_| {
            d2.fetch_add(1, Ordering::SeqCst);
        });
        assert!(b.id > a.id);
        assert!(ui_loop.run_until(WAIT, || done.load(Ordering::SeqCst) == 2));
    }

    #[test]
    fn test_token_visible_to_work() {
        let (ui_loop, exec) = executor();
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let out = Arc::new(Mutex::new(None));
        let out2 = Arc::clone(&out);
        let job = exec.dispatch(
            move |token| {
                go_rx.recv().ok();
                Ok(token.is_cancelled())
            },
            move |r| *out2.lock().unwrap() = Some(r.unwrap()),
        );
        job.token.cancel();
        go_tx.send(()).unwrap();
        assert!(ui_loop.run_until(WAIT, || out.lock().unwrap().is_some()));
        assert_eq!(*out.lock().unwrap(), Some(true));
    }
}
