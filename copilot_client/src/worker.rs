//! Background session thread.
//!
//! [`SessionWorker`] moves a [`Session`] onto its own thread so that blocking
//! waits never stall the caller. Requests go in over `std::sync::mpsc`; each
//! result comes back through a `tokio::sync::oneshot` channel that a UI event
//! loop can `.await` or a plain thread can `blocking_recv()`.
//!
//! Between requests the thread polls status and operator messages once per
//! tick and publishes them: the snapshot as an `Arc<StatusSnapshot>` swapped
//! wholesale behind a `RwLock`, messages merged into shared slots.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use copilot_common::status::StatusSnapshot;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace};

use crate::error::SessionError;
use crate::messages::OperatorMessages;
use crate::session::Session;

/// Operator messages drained per tick at most.
const MAX_MESSAGES_PER_TICK: usize = 16;

type Task = Box<dyn FnOnce(&mut Session) + Send + 'static>;

enum Request {
    Execute(Task),
    Shutdown,
}

struct Shared {
    snapshot: RwLock<Arc<StatusSnapshot>>,
    messages: Mutex<OperatorMessages>,
}

impl Shared {
    fn publish(&self, session: &mut Session) {
        *self.snapshot.write() = Arc::new(session.status().clone());
        let fresh = std::mem::take(session.messages_mut());
        if !fresh.is_empty() {
            self.messages.lock().merge(fresh);
        }
    }
}

/// Pending result of a submitted task.
pub type Reply<T> = oneshot::Receiver<Result<T, SessionError>>;

/// Owns a [`Session`] on a background thread.
pub struct SessionWorker {
    sender: mpsc::Sender<Request>,
    worker: Option<JoinHandle<Session>>,
    shared: Arc<Shared>,
}

impl SessionWorker {
    /// Start the worker. Status is refreshed every `tick` while idle.
    pub fn spawn(session: Session, tick: Duration) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Request>();
        let shared = Arc::new(Shared {
            snapshot: RwLock::new(Arc::new(session.status().clone())),
            messages: Mutex::new(OperatorMessages::new()),
        });
        let thread_shared = Arc::clone(&shared);

        let worker = thread::Builder::new()
            .name("copilot-session".into())
            .spawn(move || run(session, receiver, tick, thread_shared))?;

        info!(tick_ms = tick.as_millis() as u64, "session worker started");
        Ok(Self {
            sender,
            worker: Some(worker),
            shared,
        })
    }

    /// Queue `task` to run against the session.
    ///
    /// Fails with [`SessionError::WorkerStopped`] if the thread is gone.
    pub fn submit<F, T>(&self, task: F) -> Result<Reply<T>, SessionError>
    where
        F: FnOnce(&mut Session) -> Result<T, SessionError> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = Request::Execute(Box::new(move |session| {
            let result = task(session);
            if reply_tx.send(result).is_err() {
                debug!("caller dropped before receiving session result");
            }
        }));
        self.sender
            .send(request)
            .map_err(|_| SessionError::WorkerStopped)?;
        Ok(reply_rx)
    }

    /// Run `task` and await its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T, SessionError>
    where
        F: FnOnce(&mut Session) -> Result<T, SessionError> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(task)?
            .await
            .map_err(|_| SessionError::WorkerStopped)?
    }

    /// Run `task` and block the calling thread on its result.
    ///
    /// Must not be called from inside an async runtime.
    pub fn execute_blocking<F, T>(&self, task: F) -> Result<T, SessionError>
    where
        F: FnOnce(&mut Session) -> Result<T, SessionError> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(task)?
            .blocking_recv()
            .map_err(|_| SessionError::WorkerStopped)?
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&*self.shared.snapshot.read())
    }

    pub fn take_error(&self) -> Option<String> {
        self.shared.messages.lock().take_error()
    }

    pub fn take_text(&self) -> Option<String> {
        self.shared.messages.lock().take_text()
    }

    pub fn take_display(&self) -> Option<String> {
        self.shared.messages.lock().take_display()
    }

    /// Stop the thread and hand the session back.
    ///
    /// Returns `None` if the worker thread panicked.
    pub fn shutdown(mut self) -> Option<Session> {
        self.stop()
    }

    fn stop(&mut self) -> Option<Session> {
        let handle = self.worker.take()?;
        // The thread may already be gone; joining tells us either way.
        let _ = self.sender.send(Request::Shutdown);
        match handle.join() {
            Ok(session) => Some(session),
            Err(panic) => {
                error!("session worker panicked: {panic:?}");
                None
            }
        }
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut session: Session,
    receiver: mpsc::Receiver<Request>,
    tick: Duration,
    shared: Arc<Shared>,
) -> Session {
    loop {
        match receiver.recv_timeout(tick) {
            Ok(Request::Execute(task)) => {
                task(&mut session);
                shared.publish(&mut session);
            }
            Ok(Request::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                refresh(&mut session);
                shared.publish(&mut session);
            }
        }
    }
    info!("session worker shutting down");
    session
}

fn refresh(session: &mut Session) {
    if !session.is_connected() {
        return;
    }
    if let Err(e) = session.update_status() {
        trace!(error = %e, "status refresh failed");
    }
    for _ in 0..MAX_MESSAGES_PER_TICK {
        match session.update_error() {
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                trace!(error = %e, "error channel poll failed");
                break;
            }
        }
    }
}
