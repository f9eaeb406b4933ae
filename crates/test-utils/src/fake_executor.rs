use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use batchdag::dag::{Job, JobName};
use batchdag::errors::ExecutorError;
use batchdag::exec::{ExecFuture, Executor, StatusUpdate, Submission};

/// What the fake does with a given job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// Finish successfully during `submit`, like a local run.
    Complete,
    /// Fail during `submit` with an execution error.
    Fail(String),
    /// Reject the submission itself.
    Reject(String),
    /// Accept the job and report it finished after `polls` monitor calls.
    Queue { polls: u32, succeed: bool },
    /// Accept the job and never report it finished.
    Hang,
}

#[derive(Debug)]
struct Pending {
    polls_left: Option<u32>,
    succeed: bool,
}

/// A fake executor that:
/// - records every call as a string event (`submit:A`, `complete:A`, `poll`, ...)
/// - follows a scripted [`FakeBehaviour`] per job (default: `Complete`).
#[derive(Debug)]
pub struct FakeExecutor {
    behaviours: HashMap<JobName, FakeBehaviour>,
    default: FakeBehaviour,
    events: Arc<Mutex<Vec<String>>>,
    pending: BTreeMap<JobName, Pending>,
    submitted: Vec<JobName>,
    next_id: u32,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            behaviours: HashMap::new(),
            default: FakeBehaviour::Complete,
            events: Arc::new(Mutex::new(Vec::new())),
            pending: BTreeMap::new(),
            submitted: Vec::new(),
            next_id: 1,
        }
    }

    pub fn with(mut self, job: &str, behaviour: FakeBehaviour) -> Self {
        self.behaviours.insert(job.to_string(), behaviour);
        self
    }

    pub fn with_default(mut self, behaviour: FakeBehaviour) -> Self {
        self.default = behaviour;
        self
    }

    /// Shared handle to the event log, usable after the executor has been
    /// moved into a driver.
    pub fn event_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.events)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Events matching `prefix`, with the prefix stripped.
    pub fn events_with(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_string))
            .collect()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn behaviour_for(&self, job: &str) -> FakeBehaviour {
        self.behaviours
            .get(job)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for FakeExecutor {
    fn kind(&self) -> &'static str {
        "fake"
    }

    fn submit<'a>(
        &'a mut self,
        job: &'a Job,
    ) -> ExecFuture<'a, Result<Submission, ExecutorError>> {
        Box::pin(async move {
            if self.submitted.contains(&job.name) {
                return Err(ExecutorError::AlreadySubmitted {
                    job: job.name.clone(),
                });
            }
            self.submitted.push(job.name.clone());
            self.record(format!("submit:{}", job.name));

            let queue = |this: &mut Self,
                         polls_left: Option<u32>,
                         succeed: bool|
             -> Result<Submission, ExecutorError> {
                let remote_id = format!("fake-{}", this.next_id);
                this.next_id += 1;
                this.pending.insert(
                    job.name.clone(),
                    Pending {
                        polls_left,
                        succeed,
                    },
                );
                Ok(Submission::Queued { remote_id })
            };

            match self.behaviour_for(&job.name) {
                FakeBehaviour::Complete => {
                    self.record(format!("complete:{}", job.name));
                    Ok(Submission::Finished)
                }
                FakeBehaviour::Fail(message) => {
                    self.record(format!("fail:{}", job.name));
                    Err(ExecutorError::Execution {
                        job: job.name.clone(),
                        message,
                        exit_code: Some(1),
                    })
                }
                FakeBehaviour::Reject(message) => {
                    self.record(format!("reject:{}", job.name));
                    Err(ExecutorError::Submission {
                        job: job.name.clone(),
                        message,
                    })
                }
                FakeBehaviour::Queue { polls, succeed } => queue(self, Some(polls), succeed),
                FakeBehaviour::Hang => queue(self, None, true),
            }
        })
    }

    fn monitor(&mut self) -> ExecFuture<'_, Vec<StatusUpdate>> {
        Box::pin(async move {
            self.record("poll".to_string());
            tokio::task::yield_now().await;

            let mut updates = Vec::new();
            let mut finished = Vec::new();
            for (name, pending) in self.pending.iter_mut() {
                let Some(left) = pending.polls_left.as_mut() else {
                    continue;
                };
                *left = left.saturating_sub(1);
                if *left == 0 {
                    finished.push(name.clone());
                    if pending.succeed {
                        updates.push(StatusUpdate::completed(name.clone()));
                    } else {
                        updates.push(StatusUpdate::failed(
                            name.clone(),
                            format!("fake job {name} exited"),
                        ));
                    }
                }
            }

            for name in finished {
                let succeeded = self.pending.remove(&name).is_some_and(|p| p.succeed);
                let verb = if succeeded { "complete" } else { "fail" };
                self.record(format!("{verb}:{name}"));
            }

            updates
        })
    }

    fn kill<'a>(&'a mut self, job: &'a str) -> ExecFuture<'a, Result<(), ExecutorError>> {
        Box::pin(async move {
            if self.pending.remove(job).is_some() {
                self.record(format!("kill:{job}"));
            }
            Ok(())
        })
    }

    fn cleanup(&mut self) -> ExecFuture<'_, ()> {
        Box::pin(async move {
            let names: Vec<JobName> = self.pending.keys().cloned().collect();
            for name in names {
                self.pending.remove(&name);
                self.record(format!("kill:{name}"));
            }
        })
    }

    fn outstanding(&self) -> Vec<JobName> {
        self.pending.keys().cloned().collect()
    }
}
