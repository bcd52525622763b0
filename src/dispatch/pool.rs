use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use log::{info, warn};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::dispatch::Engine;
use crate::error::DispatchError;
use crate::request::processing::{ProcessResource, ProcessingRequest};

/// One accepted submission waiting for a worker
struct Job {
    request: ProcessingRequest,
    resources: Vec<ProcessResource>,
}

/// Identifiers of requests whose dispatch outcome has been persisted, in the order they were
/// persisted
///
/// The channel is unbounded: a holder that never reads keeps every identifier in memory. Drop
/// it if nobody listens, sends to a dropped receiver are ignored.
pub struct Notifications {
    rx: mpsc::UnboundedReceiver<String>,
}

impl Notifications {
    /// Waits for the next identifier, `None` once the dispatcher and all its workers are gone
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Fire-and-forget front end for the [`Engine`]
///
/// A fixed number of workers take submissions from a bounded queue. When the queue is full a
/// submission is rejected straight away with [`DispatchError::QueueFull`]; `submit` never waits.
pub struct Dispatcher {
    engine: Arc<Engine>,
    queue: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    in_flight: InFlight,
}

/// Identifiers accepted by `submit` whose dispatch hasn't finished yet
#[derive(Clone, Default)]
struct InFlight(Arc<StdMutex<HashSet<String>>>);

impl InFlight {
    /// False if the identifier was already there
    fn insert(&self, identifier: &str) -> bool {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).insert(identifier.to_string())
    }

    fn remove(&self, identifier: &str) {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).remove(identifier);
    }
}

impl Dispatcher {
    /// Spawn the worker pool on the current tokio runtime
    ///
    /// The returned [`Notifications`] are unbounded, see there.
    pub fn start(engine: Arc<Engine>) -> (Dispatcher, Notifications) {
        let pool = engine.config.pool;
        let (queue, rx) = mpsc::channel(pool.queue_depth.max(1));
        let (notifier, notifications) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        let in_flight = InFlight::default();

        info!("Starting {} dispatch workers, queue depth {}", pool.workers, pool.queue_depth);
        let workers = (0..pool.workers)
            .map(|n| tokio::spawn(worker(n, engine.clone(), rx.clone(), notifier.clone(), in_flight.clone())))
            .collect();

        (Dispatcher { engine, queue, workers, in_flight }, Notifications { rx: notifications })
    }

    /// Validate a request and queue it for dispatch
    ///
    /// Validation problems, a request that is already queued or being dispatched, and a full
    /// queue are returned immediately. Anything that goes wrong later is recorded on the request
    /// as FINISHED_WITH_ERRORS.
    pub fn submit(&self, request: ProcessingRequest, resources: Vec<ProcessResource>) -> Result<(), DispatchError> {
        self.engine.preflight(&request)?;
        let id = request.identifier.clone();

        if !self.in_flight.insert(&id) {
            warn!("Request {} is already queued for dispatch", id);
            return Err(DispatchError::Validation(format!("request <{id}> is already queued for dispatch")));
        }

        match self.queue.try_send(Job { request, resources }) {
            Ok(()) => {
                info!("Request {} queued for dispatch", id);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!("Dispatch queue is full, rejecting request {}", id);
                self.in_flight.remove(&id);
                Err(DispatchError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.in_flight.remove(&id);
                Err(DispatchError::ShutDown)
            }
        }
    }

    pub fn poll_completion(&self, identifier: &str) -> Result<bool, DispatchError> {
        self.engine.poll_completion(identifier)
    }

    /// Stop accepting submissions and wait for queued ones to be dispatched
    pub async fn shutdown(self) {
        drop(self.queue);
        for handle in self.workers {
            if let Err(err) = handle.await {
                warn!("Dispatch worker ended abnormally: {}", err);
            }
        }
    }
}

async fn worker(n: usize, engine: Arc<Engine>, queue: Arc<Mutex<mpsc::Receiver<Job>>>,
                notifier: mpsc::UnboundedSender<String>, in_flight: InFlight) {
    loop {
        let job = queue.lock().await.recv().await;
        let Some(job) = job else { break };
        let id = job.request.identifier.clone();

        let delay = engine.config.backoff.delay();
        if !delay.is_zero() {
            info!("Worker {n} waiting {}s before dispatching {}", delay.as_secs(), id);
            tokio::time::sleep(delay).await;
        }

        let dispatching = engine.clone();
        let dispatched = tokio::task::spawn_blocking(move || dispatching.dispatch(&job.request, &job.resources)).await;
        in_flight.remove(&id);
        match dispatched {
            Ok(Ok(output)) => {
                info!("Worker {n} dispatched {} with state {}", id, output.state);
                // listeners are optional
                let _ = notifier.send(id);
            }
            Ok(Err(err)) => warn!("Worker {n} couldn't dispatch {}: {}", id, err),
            Err(err) => warn!("Worker {n} crashed dispatching {}: {}", id, err),
        }
    }
    info!("Worker {n} stopping");
}
