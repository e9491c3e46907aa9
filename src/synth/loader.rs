use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use super::engine_state::{EngineState, EngineStateCell};
use super::sample::Sample;
use crate::error::LoadError;

struct LoadJob {
    channel: usize,
    generation: u64,
    filename: String,
    path: PathBuf,
}

enum Task {
    Load(LoadJob),
    /// A sample swapped out on the render path, freed off it
    Retire(Sample),
}

/// Result of one load, applied to the channel on the control path
#[derive(Debug)]
pub struct LoadOutcome {
    pub channel: usize,
    /// Channel load generation the request was made under
    pub generation: u64,
    pub filename: String,
    pub result: Result<Sample, LoadError>,
}

/// Dedicated decode worker. Requests queue without blocking the caller and
/// the worker decodes them one at a time, in order.
pub struct SampleLoader {
    tasks: Option<Sender<Task>>,
    outcomes: Receiver<LoadOutcome>,
    worker: Option<JoinHandle<()>>,
    pending: usize,
}

impl SampleLoader {
    pub fn spawn(state: Arc<EngineStateCell>, sample_rate: u32) -> std::io::Result<Self> {
        let (task_tx, task_rx) = unbounded::<Task>();
        let (outcome_tx, outcome_rx) = unbounded();

        let worker = thread::Builder::new()
            .name("sample-loader".into())
            .spawn(move || {
                for task in task_rx {
                    let job = match task {
                        Task::Load(job) => job,
                        Task::Retire(sample) => {
                            drop(sample);
                            continue;
                        }
                    };
                    let result = {
                        let _switch = state.enter(EngineState::LoadingSample);
                        Sample::decode(&job.path, &job.filename, sample_rate)
                    };
                    match &result {
                        Ok(sample) => info!(
                            "loaded {} into channel {} ({} ch, {} frames)",
                            job.filename,
                            job.channel,
                            sample.channels(),
                            sample.frames()
                        ),
                        Err(e) => error!("channel {}: {}", job.channel, e),
                    }
                    let outcome = LoadOutcome {
                        channel: job.channel,
                        generation: job.generation,
                        filename: job.filename,
                        result,
                    };
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
                debug!("sample loader stopped");
            })?;

        Ok(Self {
            tasks: Some(task_tx),
            outcomes: outcome_rx,
            worker: Some(worker),
            pending: 0,
        })
    }

    /// Queue a load. Never blocks; the worker takes jobs in order.
    pub fn request(&mut self, channel: usize, generation: u64, filename: &str, path: PathBuf) -> bool {
        let Some(tasks) = self.tasks.as_ref() else {
            return false;
        };
        let job = LoadJob {
            channel,
            generation,
            filename: filename.to_string(),
            path,
        };
        if tasks.send(Task::Load(job)).is_err() {
            error!("sample loader is gone, dropping {}", filename);
            return false;
        }
        self.pending += 1;
        true
    }

    /// Hand a replaced sample to the worker so its buffer is freed there
    pub fn retire(&self, sample: Sample) {
        if let Some(tasks) = self.tasks.as_ref() {
            // A stopped worker hands the sample back and it drops here
            let _ = tasks.send(Task::Retire(sample));
        }
    }

    /// Number of requests whose outcome has not been collected yet
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn try_outcome(&mut self) -> Option<LoadOutcome> {
        let outcome = self.outcomes.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(outcome)
    }

    /// Block for the next outcome; `None` when nothing is outstanding
    pub fn wait_outcome(&mut self) -> Option<LoadOutcome> {
        if self.pending == 0 {
            return None;
        }
        let outcome = self.outcomes.recv().ok()?;
        self.pending -= 1;
        Some(outcome)
    }
}

impl Drop for SampleLoader {
    fn drop(&mut self) {
        self.tasks.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("sample loader thread panicked");
            }
        }
    }
}
