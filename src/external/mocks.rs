// Scripted command executor and output collector shared by unit and
// integration tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::command::{CommandError, CommandExecutor, CommandOutput, Invocation, OutputObserver};

/// Replays queued outputs in order and records every invocation.
/// When the queue is empty it answers with a silent success.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<Result<CommandOutput, CommandError>>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_ok(self, stdout: &str) -> Self {
        self.then(Ok(CommandOutput {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }))
    }

    pub fn then_fail(self, exit_code: i32, stderr: &str) -> Self {
        self.then(Ok(CommandOutput {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }))
    }

    pub fn then(self, response: Result<CommandOutput, CommandError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn args_of(&self, index: usize) -> Vec<String> {
        self.invocations()[index].args.clone()
    }

    pub fn args(&self) -> Vec<Vec<String>> {
        self.invocations().into_iter().map(|i| i.args).collect()
    }

    pub fn spawn_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        invocation: &Invocation,
        observer: Option<&dyn OutputObserver>,
    ) -> Result<CommandOutput, CommandError> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CommandOutput {
                exit_code: Some(0),
                ..Default::default()
            }));

        if let (Some(observer), Ok(output)) = (observer, &response) {
            if !output.stdout.is_empty() {
                observer.on_stdout(&output.stdout);
            }
            if !output.stderr.is_empty() {
                observer.on_stderr(&output.stderr);
            }
            observer.on_exit(output.exit_code);
        }
        response
    }
}

/// Observer that keeps every chunk it is given.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    pub stdout: Mutex<String>,
    pub stderr: Mutex<String>,
    pub exit: Mutex<Option<Option<i32>>>,
}

impl OutputObserver for CollectingObserver {
    fn on_stdout(&self, chunk: &str) {
        self.stdout.lock().unwrap().push_str(chunk);
    }

    fn on_stderr(&self, chunk: &str) {
        self.stderr.lock().unwrap().push_str(chunk);
    }

    fn on_exit(&self, exit_code: Option<i32>) {
        *self.exit.lock().unwrap() = Some(exit_code);
    }
}
