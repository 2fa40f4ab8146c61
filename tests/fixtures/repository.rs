//! Temporary git repositories driven by the real git binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use gitpush::RepositoryContext;

pub struct TestRepo {
    _dir: TempDir,
    root: PathBuf,
}

impl TestRepo {
    /// Empty repository on an unborn `main` branch with a local identity.
    pub fn init() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let repo = Self {
            root: dir.path().to_path_buf(),
            _dir: dir,
        };

        repo.git(&["init", "--quiet"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo.configure_identity();
        repo
    }

    /// Repository with one commit containing `README.md`.
    pub fn with_initial_commit() -> Self {
        let repo = Self::init();
        repo.write("README.md", "# test\n");
        repo.commit_all("Initial commit");
        repo
    }

    /// Clone `origin` into a fresh temporary directory.
    pub fn clone_from(origin: &TestRepo) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let target = dir.path().join("clone");
        let output = Command::new("git")
            .args(["clone", "--quiet"])
            .arg(origin.path())
            .arg(&target)
            .output()
            .expect("Failed to run git clone");
        assert!(output.status.success(), "clone failed: {}", String::from_utf8_lossy(&output.stderr));

        let repo = Self {
            root: target,
            _dir: dir,
        };
        repo.configure_identity();
        repo
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn context(&self) -> RepositoryContext {
        RepositoryContext::at(self.path())
    }

    /// Run git directly, bypassing the crate. Panics if git cannot start.
    pub fn git(&self, args: &[&str]) -> Output {
        Command::new("git")
            .args(args)
            .current_dir(self.path())
            .env("GIT_EDITOR", "true")
            .output()
            .expect("Failed to run git")
    }

    pub fn git_stdout(&self, args: &[&str]) -> String {
        String::from_utf8_lossy(&self.git(args).stdout).trim().to_string()
    }

    pub fn write(&self, name: &str, contents: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(path, contents).expect("Failed to write file");
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).expect("Failed to read file")
    }

    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "."]);
        let output = self.git(&["commit", "--quiet", "-m", message]);
        assert!(output.status.success(), "commit failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    /// `main` and `feature` both rewrite `conflict.txt`, then `feature` is
    /// merged into `main` by the caller.
    pub fn with_diverged_branches() -> Self {
        Self::with_diverged_file("conflict.txt")
    }

    /// Same as [`TestRepo::with_diverged_branches`] for an arbitrary path.
    pub fn with_diverged_file(name: &str) -> Self {
        let repo = Self::init();
        repo.write(name, "base\n");
        repo.commit_all("Base");

        repo.git(&["checkout", "--quiet", "-b", "feature"]);
        repo.write(name, "feature\n");
        repo.commit_all("Feature change");

        repo.git(&["checkout", "--quiet", "main"]);
        repo.write(name, "main\n");
        repo.commit_all("Main change");
        repo
    }

    fn configure_identity(&self) {
        self.git(&["config", "user.name", "Test User"]);
        self.git(&["config", "user.email", "test@example.com"]);
        self.git(&["config", "commit.gpgsign", "false"]);
        self.git(&["config", "tag.gpgsign", "false"]);
    }
}

/// Directory that is guaranteed not to be inside any repository, as long as
/// git is told not to look above it.
pub struct PlainDir {
    dir: TempDir,
}

impl PlainDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn ceiling(&self) -> String {
        self.dir
            .path()
            .parent()
            .unwrap_or(self.dir.path())
            .to_string_lossy()
            .into_owned()
    }
}
