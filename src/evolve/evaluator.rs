//! Fitness-evaluation transports.
//!
//! The graph engine stays single-threaded; parallelism lives behind the
//! [`Evaluator`] capability interface. Genomes cross the boundary only in
//! their serialized wire form, workers share the dataset read-only, and
//! results are re-associated by handle, never by arrival order.

use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::graph::Network;
use crate::methods::Cost;
use crate::wire::WireNetwork;

/// Opaque handle tying an evaluation result back to its genome.
pub type EvalHandle = u64;

/// Why an evaluation produced no fitness.
#[derive(Clone, Debug)]
pub enum EvalError {
    /// The worker owning the evaluation died before reporting.
    WorkerLost,
    /// The serialized network failed to evaluate.
    Failed(String),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WorkerLost => write!(f, "worker lost before reporting a result"),
            Self::Failed(msg) => write!(f, "evaluation failed: {}", msg),
        }
    }
}

impl std::error::Error for EvalError {}

/// A transport that scores genomes asynchronously.
///
/// Implementations may return results in any order; callers must match them
/// to submissions through the handle.
pub trait Evaluator {
    /// Queue a genome for evaluation and return its handle.
    fn submit(&mut self, network: &Network) -> EvalHandle;

    /// Block for the next completed evaluation.
    ///
    /// Returns `None` once no submissions remain outstanding.
    fn recv(&mut self) -> Option<(EvalHandle, Result<f64, EvalError>)>;

    /// Release transport resources. Idempotent.
    fn terminate(&mut self);
}

/// Synchronous evaluator scoring genomes on the calling thread.
///
/// Fitness is the negated mean cost over the dataset, so higher is better.
pub struct InProcessEvaluator {
    dataset: Arc<Vec<(Vec<f64>, Vec<f64>)>>,
    cost: Cost,
    next_handle: EvalHandle,
    ready: VecDeque<(EvalHandle, Result<f64, EvalError>)>,
}

impl InProcessEvaluator {
    pub fn new(dataset: Vec<(Vec<f64>, Vec<f64>)>, cost: Cost) -> Self {
        Self {
            dataset: Arc::new(dataset),
            cost,
            next_handle: 0,
            ready: VecDeque::new(),
        }
    }
}

impl Evaluator for InProcessEvaluator {
    fn submit(&mut self, network: &Network) -> EvalHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        let mut wire = network.to_wire();
        let result = wire
            .test(&self.dataset, self.cost)
            .map(|cost| -cost)
            .map_err(|e| EvalError::Failed(e.to_string()));
        self.ready.push_back((handle, result));
        handle
    }

    fn recv(&mut self) -> Option<(EvalHandle, Result<f64, EvalError>)> {
        self.ready.pop_front()
    }

    fn terminate(&mut self) {
        self.ready.clear();
    }
}

struct Job {
    handle: EvalHandle,
    wire: WireNetwork,
}

/// Thread-backed evaluator: a pool of workers fed over a channel.
///
/// Each worker owns a private copy of every genome it scores and a shared,
/// read-only view of the dataset. A dead worker fails only the evaluations
/// it held.
pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    result_rx: Receiver<(EvalHandle, Result<f64, EvalError>)>,
    workers: Vec<JoinHandle<()>>,
    pending: HashSet<EvalHandle>,
    next_handle: EvalHandle,
}

impl WorkerPool {
    /// Spawn `workers` threads scoring genomes as negated mean cost over the
    /// dataset.
    pub fn new(workers: usize, dataset: Vec<(Vec<f64>, Vec<f64>)>, cost: Cost) -> Self {
        let dataset = Arc::new(dataset);
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, result_rx) = mpsc::channel();

        let mut handles = Vec::with_capacity(workers.max(1));
        for id in 0..workers.max(1) {
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            let dataset = Arc::clone(&dataset);
            handles.push(thread::spawn(move || {
                worker_loop(id, jobs, results, dataset, cost);
            }));
        }

        Self {
            job_tx: Some(job_tx),
            result_rx,
            workers: handles,
            pending: HashSet::new(),
            next_handle: 0,
        }
    }
}

fn worker_loop(
    id: usize,
    jobs: Arc<Mutex<Receiver<Job>>>,
    results: Sender<(EvalHandle, Result<f64, EvalError>)>,
    dataset: Arc<Vec<(Vec<f64>, Vec<f64>)>>,
    cost: Cost,
) {
    loop {
        let job = {
            let Ok(guard) = jobs.lock() else { break };
            guard.recv()
        };
        let Ok(mut job) = job else { break };
        let result = job
            .wire
            .test(&dataset, cost)
            .map(|cost| -cost)
            .map_err(|e| EvalError::Failed(e.to_string()));
        if results.send((job.handle, result)).is_err() {
            break;
        }
    }
    log::debug!("evaluation worker {} stopped", id);
}

impl Evaluator for WorkerPool {
    fn submit(&mut self, network: &Network) -> EvalHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.pending.insert(handle);
        let job = Job {
            handle,
            wire: network.to_wire(),
        };
        let sent = match &self.job_tx {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        };
        if !sent {
            log::warn!("worker pool is terminated; evaluation {} will fail", handle);
        }
        handle
    }

    fn recv(&mut self) -> Option<(EvalHandle, Result<f64, EvalError>)> {
        if self.pending.is_empty() {
            return None;
        }
        match self.result_rx.recv() {
            Ok((handle, result)) => {
                self.pending.remove(&handle);
                Some((handle, result))
            }
            Err(_) => {
                // Every worker is gone; fail the pending evaluations one by
                // one so the caller can still make progress.
                let handle = self.pending.iter().next().copied()?;
                self.pending.remove(&handle);
                Some((handle, Err(EvalError::WorkerLost)))
            }
        }
    }

    fn terminate(&mut self) {
        self.job_tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architect;
    use crate::methods::Mutation;

    fn xor_dataset() -> Vec<(Vec<f64>, Vec<f64>)> {
        vec![
            (vec![0.0, 0.0], vec![0.0]),
            (vec![0.0, 1.0], vec![1.0]),
            (vec![1.0, 0.0], vec![1.0]),
            (vec![1.0, 1.0], vec![0.0]),
        ]
    }

    #[test]
    fn test_in_process_round() {
        let mut evaluator = InProcessEvaluator::new(xor_dataset(), Cost::Mse);
        let net = Network::new(2, 1);
        let handle = evaluator.submit(&net);
        let (got, result) = evaluator.recv().unwrap();
        assert_eq!(got, handle);
        assert!(result.unwrap().is_finite());
        assert!(evaluator.recv().is_none());
    }

    #[test]
    fn test_pool_reassociates_by_handle() {
        let mut pool = WorkerPool::new(3, xor_dataset(), Cost::Mse);
        let mut serial = InProcessEvaluator::new(xor_dataset(), Cost::Mse);

        // Structurally different genomes score differently, which exposes
        // any handle mix-up.
        let mut genomes = Vec::new();
        for i in 0..6 {
            let mut net = architect::perceptron(&[2, 2 + i % 3, 1]).unwrap();
            net.mutate(&Mutation::ModWeight { min: -1.0, max: 1.0 });
            genomes.push(net);
        }

        let mut expected = std::collections::HashMap::new();
        for net in &genomes {
            let handle = pool.submit(net);
            serial.submit(net);
            let (_, result) = serial.recv().unwrap();
            expected.insert(handle, result.unwrap());
        }

        let mut seen = 0;
        while let Some((handle, result)) = pool.recv() {
            let fitness = result.unwrap();
            let want = expected[&handle];
            assert!(
                (fitness - want).abs() < 1e-9,
                "handle {} fitness {} expected {}",
                handle,
                fitness,
                want
            );
            seen += 1;
        }
        assert_eq!(seen, genomes.len());
        pool.terminate();
        pool.terminate();
    }

    #[test]
    fn test_pool_terminate_idempotent() {
        let mut pool = WorkerPool::new(2, xor_dataset(), Cost::Mse);
        pool.terminate();
        pool.terminate();
        // Submissions after termination surface as failures, not hangs.
        let handle = pool.submit(&Network::new(2, 1));
        let (got, result) = pool.recv().unwrap();
        assert_eq!(got, handle);
        assert!(result.is_err());
        assert!(pool.recv().is_none());
    }
}
