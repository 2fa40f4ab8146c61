//! Git services over the crate's scripted executor

use std::sync::Arc;

use gitpush::external::mocks::ScriptedExecutor;
use gitpush::{GitService, GitSettings};

/// Service over a script, with the script kept for assertions.
pub fn scripted_service(script: ScriptedExecutor) -> (GitService, Arc<ScriptedExecutor>) {
    let script = Arc::new(script);
    let service = GitService::with_command_executor(script.clone(), &GitSettings::default());
    (service, script)
}
