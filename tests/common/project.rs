//! Test projects for isolated Kiln testing.
//!
//! `MemoryProject` drives a `Compiler` over a `MemorySystem` rooted at `/app`.
//! `DiskProject` lays files out in a temp directory and runs the `kiln`
//! binary against it.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use tempfile::TempDir;

use kiln::{Compiler, Config, MemorySystem, OutputTarget};

pub const ROOT: &str = "/app";

/// Absolute path under the in-memory project root
pub fn app_path(relative: &str) -> PathBuf {
    Path::new(ROOT).join(relative)
}

pub struct MemoryProject {
    pub sys: Arc<MemorySystem>,
    pub compiler: Compiler,
}

impl MemoryProject {
    pub fn builder() -> MemoryProjectBuilder {
        MemoryProjectBuilder::default()
    }

    pub fn write(&self, relative: &str, content: &str) {
        use kiln::CompilerSystem;
        self.sys
            .write_file(&app_path(relative), content)
            .expect("write to memory system");
    }

    pub fn delete(&self, relative: &str) {
        use kiln::CompilerSystem;
        self.sys
            .unlink(&app_path(relative))
            .expect("unlink from memory system");
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        use kiln::CompilerSystem;
        self.sys.read_file(&app_path(relative))
    }

    pub fn exists(&self, relative: &str) -> bool {
        use kiln::CompilerSystem;
        self.sys.access(&app_path(relative))
    }
}

#[derive(Default)]
pub struct MemoryProjectBuilder {
    files: Vec<(String, String)>,
    targets: Option<Vec<OutputTarget>>,
    configure: Option<Box<dyn FnOnce(Config) -> Config>>,
}

impl MemoryProjectBuilder {
    pub fn with_file(mut self, relative: &str, content: &str) -> Self {
        self.files.push((relative.to_string(), content.to_string()));
        self
    }

    pub fn with_targets(mut self, targets: Vec<OutputTarget>) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn with_config(mut self, configure: impl FnOnce(Config) -> Config + 'static) -> Self {
        self.configure = Some(Box::new(configure));
        self
    }

    pub fn build(self) -> MemoryProject {
        let sys = Arc::new(
            MemorySystem::new()
                .with_files(
                    self.files
                        .iter()
                        .map(|(p, c)| (app_path(p), c.clone())),
                )
                .with_cwd(ROOT)
                .with_watch_timeout(std::time::Duration::from_millis(10)),
        );

        let mut config = Config::for_root(ROOT);
        if let Some(targets) = self.targets {
            config = config.with_output_targets(targets);
        }
        if let Some(configure) = self.configure {
            config = configure(config);
        }

        let compiler = Compiler::new(config, sys.clone()).expect("valid test config");
        MemoryProject { sys, compiler }
    }
}

/// Result of running the kiln binary
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Temp project directory for end-to-end runs of the binary
pub struct DiskProject {
    pub root: TempDir,
}

impl DiskProject {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("create temp project"),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let full = self.path(relative);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("create directories");
        }
        std::fs::write(full, content).expect("write project file");
        self
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("failed to read {}: {}", relative, e))
    }

    /// Run `kiln <args> --root <project>` with a clean environment
    pub fn run(&self, args: &[&str]) -> TestResult {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_kiln"));
        cmd.args(args)
            .arg("--root")
            .arg(self.root.path())
            .current_dir(self.root.path())
            .env_remove("KILN_SYS")
            .env_remove("KILN_NAMESPACE")
            .env_remove("KILN_VALIDATE_TYPES")
            .env_remove("KILN_DEV_MODE")
            .env_remove("KILN_LOG")
            .env("NO_COLOR", "1");

        let output = cmd.output().expect("failed to execute kiln");
        to_result(output)
    }
}

fn to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// List all files in a directory recursively (for failure messages)
pub fn list_all_files(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(list_all_files(&path));
            } else {
                files.push(path.display().to_string());
            }
        }
    }
    files.sort();
    files
}
