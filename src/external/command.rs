//! Base command execution abstraction
//!
//! Provides the trait used to run external processes, enabling dependency
//! injection for testing. The production implementation spawns through
//! tokio, streams both pipes while the child runs and always reaps it.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

const READ_CHUNK: usize = 8192;

/// A fully described process launch. Arguments are discrete elements and
/// never pass through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// `None` runs in the caller's current directory.
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("IO error: {message}")]
    Io { message: String },
}

impl CommandError {
    fn from_io(program: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            CommandError::CommandNotFound {
                command: program.to_string(),
            }
        } else {
            CommandError::Io {
                message: err.to_string(),
            }
        }
    }
}

/// Receives output incrementally while a command runs.
///
/// Chunks keep arrival order within one stream; stdout and stderr are read
/// concurrently so there is no ordering between the two.
pub trait OutputObserver: Send + Sync {
    fn on_stdout(&self, _chunk: &str) {}
    fn on_stderr(&self, _chunk: &str) {}
    fn on_exit(&self, _exit_code: Option<i32>) {}
}

/// Trait for executing external commands
///
/// The rest of the crate never touches `tokio::process` directly, so tests
/// can substitute a scripted implementation and observe every spawn.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        invocation: &Invocation,
        observer: Option<&dyn OutputObserver>,
    ) -> Result<CommandOutput, CommandError>;
}

/// Real implementation using tokio::process::Command
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        invocation: &Invocation,
        observer: Option<&dyn OutputObserver>,
    ) -> Result<CommandOutput, CommandError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| CommandError::from_io(&invocation.program, e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout, stderr) = tokio::join!(
            drain(stdout, |chunk| {
                if let Some(observer) = observer {
                    observer.on_stdout(chunk);
                }
            }),
            drain(stderr, |chunk| {
                if let Some(observer) = observer {
                    observer.on_stderr(chunk);
                }
            }),
        );

        // Reap before looking at read errors so the child never outlives us.
        let status = child
            .wait()
            .await
            .map_err(|e| CommandError::from_io(&invocation.program, e))?;
        let exit_code = status.code();
        if let Some(observer) = observer {
            observer.on_exit(exit_code);
        }

        let stdout = stdout.map_err(|e| CommandError::from_io(&invocation.program, e))?;
        let stderr = stderr.map_err(|e| CommandError::from_io(&invocation.program, e))?;

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

/// Read a pipe to EOF, forwarding each chunk as it arrives.
async fn drain<R, F>(reader: Option<R>, mut on_chunk: F) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut collected = Vec::new();
    let Some(mut reader) = reader else {
        return Ok(collected);
    };

    let mut decoder = ChunkDecoder::default();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..read]);
        let text = decoder.push(&buf[..read]);
        if !text.is_empty() {
            on_chunk(&text);
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        on_chunk(&rest);
    }
    Ok(collected)
}

/// Decodes a byte stream chunk by chunk, holding back a trailing partial
/// UTF-8 sequence until the bytes that complete it arrive.
#[derive(Debug, Default)]
struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let split = self.pending.len() - incomplete_tail(&self.pending);
        let text = String::from_utf8_lossy(&self.pending[..split]).into_owned();
        self.pending.drain(..split);
        text
    }

    fn finish(self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}

/// Length of an unfinished multi-byte sequence at the end of `bytes`.
fn incomplete_tail(bytes: &[u8]) -> usize {
    let window = bytes.len().min(3);
    for back in 1..=window {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if back < needed { back } else { 0 };
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        stdout: Mutex<Vec<String>>,
        exit: Mutex<Option<Option<i32>>>,
    }

    impl OutputObserver for Collecting {
        fn on_stdout(&self, chunk: &str) {
            self.stdout.lock().unwrap().push(chunk.to_string());
        }

        fn on_exit(&self, exit_code: Option<i32>) {
            *self.exit.lock().unwrap() = Some(exit_code);
        }
    }

    #[tokio::test]
    async fn test_process_command_executor_success() {
        let executor = ProcessCommandExecutor;
        let result = executor
            .execute(&Invocation::new("echo", ["hello"]), None)
            .await;

        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_process_command_executor_command_not_found() {
        let executor = ProcessCommandExecutor;
        let result = executor
            .execute(
                &Invocation::new("nonexistent_command_xyz", Vec::<String>::new()),
                None,
            )
            .await;

        assert!(matches!(
            result.unwrap_err(),
            CommandError::CommandNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_observer_receives_chunks_and_exit() {
        let observer = Collecting::default();
        let output = ProcessCommandExecutor
            .execute(&Invocation::new("echo", ["streamed"]), Some(&observer))
            .await
            .unwrap();

        let seen = observer.stdout.lock().unwrap().concat();
        assert_eq!(seen, output.stdout);
        assert_eq!(*observer.exit.lock().unwrap(), Some(Some(0)));
    }

    #[tokio::test]
    async fn test_working_directory_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let output = ProcessCommandExecutor
            .execute(
                &Invocation::new("pwd", Vec::<String>::new()).in_dir(dir.path()),
                None,
            )
            .await
            .unwrap();

        let expected = dir.path().canonicalize().unwrap();
        let actual = std::path::Path::new(output.stdout.trim()).canonicalize().unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let output = ProcessCommandExecutor
            .execute(&Invocation::new("sh", ["-c", "echo oops >&2; exit 3"]), None)
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert!(output.stderr.contains("oops"));
    }

    #[test]
    fn test_decoder_holds_split_characters() {
        let mut decoder = ChunkDecoder::default();
        let bytes = "caf\u{e9} \u{2713}".as_bytes();

        let mut seen = decoder.push(&bytes[..4]);
        assert_eq!(seen, "caf");
        seen.push_str(&decoder.push(&bytes[4..8]));
        seen.push_str(&decoder.push(&bytes[8..]));
        seen.push_str(&decoder.finish());

        assert_eq!(seen, "caf\u{e9} \u{2713}");
    }

    #[test]
    fn test_decoder_flushes_truncated_tail() {
        let mut decoder = ChunkDecoder::default();
        assert_eq!(decoder.push(&[b'a', 0xE2, 0x9C]), "a");
        assert_eq!(decoder.finish(), "\u{fffd}");
    }

    #[tokio::test]
    async fn test_observer_sees_characters_split_between_writes() {
        let observer = Collecting::default();
        let output = ProcessCommandExecutor
            .execute(
                &Invocation::new("sh", ["-c", "printf '\\303'; sleep 0.1; printf '\\251'"]),
                Some(&observer),
            )
            .await
            .unwrap();

        assert_eq!(output.stdout, "\u{e9}");
        assert_eq!(observer.stdout.lock().unwrap().concat(), "\u{e9}");
    }
}
