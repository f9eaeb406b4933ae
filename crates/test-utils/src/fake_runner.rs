use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use batchdag::exec::{CommandOutput, CommandRunner, ExecFuture};

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    SpawnError,
}

#[derive(Debug, Default)]
struct Inner {
    queued: HashMap<String, VecDeque<Scripted>>,
    fallback: HashMap<String, CommandOutput>,
    calls: Vec<(String, Vec<String>)>,
}

/// A `CommandRunner` that returns canned outputs per program name and
/// records every invocation.
///
/// Queued responses are used first, in order; after that the program's
/// fallback (if any). A program with neither fails to "spawn" with
/// `NotFound`. Clones share state, so a test can keep one handle while the
/// executor owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, program: &str, output: CommandOutput) -> &Self {
        self.lock()
            .queued
            .entry(program.to_string())
            .or_default()
            .push_back(Scripted::Output(output));
        self
    }

    /// Next call to `program` fails as if the binary did not exist.
    pub fn push_spawn_error(&self, program: &str) -> &Self {
        self.lock()
            .queued
            .entry(program.to_string())
            .or_default()
            .push_back(Scripted::SpawnError);
        self
    }

    pub fn set_fallback(&self, program: &str, output: CommandOutput) -> &Self {
        self.lock().fallback.insert(program.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.lock().calls.clone()
    }

    /// Argument lists of every call to `program`.
    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.lock()
            .calls
            .iter()
            .filter(|(p, _)| p == program)
            .map(|(_, args)| args.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn respond(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let mut inner = self.lock();
        inner.calls.push((program.to_string(), args.to_vec()));

        let queued = inner.queued.get_mut(program).and_then(VecDeque::pop_front);
        let next = match queued {
            Some(scripted) => Some(scripted),
            None => inner.fallback.get(program).cloned().map(Scripted::Output),
        };

        match next {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::SpawnError) | None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: command not found"),
            )),
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
    ) -> ExecFuture<'a, io::Result<CommandOutput>> {
        Box::pin(async move { self.respond(program, args) })
    }
}
