//! External command execution with output streamed into the run log.
//!
//! Extraction tools can print a lot and can take a while, so output is
//! not buffered until exit: stdout and stderr are each drained by a reader
//! thread and forwarded line by line, interleaved in arrival order, into
//! the [`RunLog`].

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::runlog::RunLog;

/// Builder for configuring command execution.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// The command line as echoed into the log.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the command, streaming combined output into `log`.
    ///
    /// Returns the exit code, or -1 if the process was killed by a signal.
    /// A non-zero exit is NOT an error here; the caller decides what it
    /// means. Failing to spawn at all is an error.
    pub fn run_logged(self, log: &mut RunLog) -> Result<i32> {
        log.command(&self.display())?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", self.program))?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        // Keep draining even if the log stops accepting writes, otherwise
        // the child blocks on a full pipe and never exits.
        let mut write_err = None;
        for line in rx {
            if write_err.is_none() {
                if let Err(e) = log.raw(&line) {
                    write_err = Some(e);
                }
            }
        }
        for reader in readers {
            let _ = reader.join();
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for '{}'", self.program))?;

        if let Some(e) = write_err {
            return Err(e);
        }
        log.flush()?;

        Ok(status.code().unwrap_or(-1))
    }
}

fn forward_lines<R: Read + Send + 'static>(source: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let mut line = String::from_utf8_lossy(&buf).into_owned();
                    if !line.ends_with('\n') {
                        line.push('\n');
                    }
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Check if a program exists in PATH.
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

// =============================================================================
// Tests
// =============================================================================
