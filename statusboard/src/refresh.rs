//! Background refresh
//!
//! A `RefreshJob` wraps a slow producer (typically one shelling out to an
//! external process) so that its owner never waits for it: `poll()` always
//! answers immediately with the last completed result, while `kick()`
//! starts a new producer run on a background thread unless one is already
//! in flight.
//!
//! Results travel back through a one-slot channel owned by the job. A
//! `reset()` drops that channel, which abandons the outstanding run: the
//! thread is never joined, and whatever it produces is discarded.

use std::fmt;
use std::sync::Arc;
use std::thread;

use crossbeam::channel;
use tracing::{error, warn};

use crate::metrics::MetricsError;

type Producer<T, E> = Arc<dyn Fn() -> Result<T, E> + Send + Sync>;

pub struct RefreshJob<T, E = MetricsError> {
    name: String,
    producer: Producer<T, E>,
    last_result: Option<T>,
    in_flight: Option<channel::Receiver<Result<T, E>>>,
    error_logged: bool,
}

impl<T, E> RefreshJob<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    pub fn new<F>(name: &str, producer: F) -> RefreshJob<T, E>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        RefreshJob {
            name: name.to_string(),
            producer: Arc::new(producer),
            last_result: None,
            in_flight: None,
            error_logged: false,
        }
    }

    /// Last completed result, without waiting.
    pub fn poll(&mut self) -> Option<&T> {
        self.collect();
        self.last_result.as_ref()
    }

    /// Start a producer run, unless one is already in flight. Returns
    /// whether a run was started.
    pub fn kick(&mut self) -> bool {
        self.collect();
        if self.in_flight.is_some() {
            return false;
        }
        let (tx, rx) = channel::bounded(1);
        let producer = self.producer.clone();
        let spawned = thread::Builder::new()
            .name(format!("refresh-{}", self.name))
            .spawn(move || {
                // The receiver is gone if the job was reset meanwhile.
                let _ = tx.send(producer());
            });
        match spawned {
            Ok(_) => {
                self.in_flight = Some(rx);
                true
            }
            Err(err) => {
                warn!(job = %self.name, "failed to start refresh thread: {}", err);
                false
            }
        }
    }

    pub fn is_in_flight(&mut self) -> bool {
        self.collect();
        self.in_flight.is_some()
    }

    /// True once a producer failure has been logged in this session.
    pub fn error_logged(&self) -> bool {
        self.error_logged
    }

    /// Forget the result and the error state, and abandon any run in flight.
    pub fn reset(&mut self) {
        self.last_result = None;
        self.in_flight = None;
        self.error_logged = false;
    }

    /// Take the outcome of the run in flight, if it finished.
    fn collect(&mut self) {
        let Some(rx) = &self.in_flight else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(channel::TryRecvError::Empty) => return,
            // The producer thread died without sending anything.
            Err(channel::TryRecvError::Disconnected) => None,
        };
        self.in_flight = None;
        match outcome {
            Some(Ok(value)) => self.last_result = Some(value),
            Some(Err(err)) => self.log_once(format_args!("{}", err)),
            None => self.log_once(format_args!("producer panicked")),
        }
    }

    fn log_once(&mut self, msg: fmt::Arguments<'_>) {
        if !self.error_logged {
            error!(job = %self.name, "refresh failed: {}", msg);
            self.error_logged = true;
        }
    }
}

impl<T, E> fmt::Debug for RefreshJob<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshJob")
            .field("name", &self.name)
            .field("has_result", &self.last_result.is_some())
            .field("in_flight", &self.in_flight.is_some())
            .field("error_logged", &self.error_logged)
            .finish()
    }
}
