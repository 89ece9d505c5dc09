use crate::config::IntakeConfig;
use bytes::BytesMut;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio_util::codec::{Decoder, FramedRead};
use tracing::{error, info, warn};

/// Longer worker output lines are logged in pieces of this size
pub const MAX_OUTPUT_LINE: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to launch worker `{program}`: {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fire-and-forget reference to a dispatched worker. Holding or dropping it
/// has no effect on the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchHandle {
    pid: Option<u32>,
    launched: bool,
}

impl DispatchHandle {
    fn launched(pid: Option<u32>) -> Self {
        Self {
            pid,
            launched: true,
        }
    }

    pub fn not_launched() -> Self {
        Self {
            pid: None,
            launched: false,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }
}

/// Starts background processing for a persisted file. Implementations must
/// return without waiting on the job and must never fail the caller.
pub trait JobDispatcher: Send + Sync {
    fn dispatch(&self, file_path: &Path) -> DispatchHandle;
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Launches the worker as a detached OS process
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl ProcessDispatcher {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir,
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self::new(
            config.worker_program(),
            config.worker_args().to_vec(),
            config.project_root.clone(),
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn command(&self, file_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(file_path)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        // Own process group: Ctrl+C on the server's terminal must not reach the worker.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    /// Spawns the worker and hands its output streams and exit status to
    /// background tasks. Only the spawn itself happens on the caller's path.
    pub fn launch(&self, file_path: &Path) -> Result<DispatchHandle, DispatchError> {
        let mut child = self
            .command(file_path)
            .spawn()
            .map_err(|source| DispatchError::LaunchFailed {
                program: self.program.clone(),
                source,
            })?;

        let pid = child.id();
        let file = file_path.display().to_string();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(log_output(stdout, OutputStream::Stdout, pid, file.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_output(stderr, OutputStream::Stderr, pid, file.clone()));
        }
        tokio::spawn(reap(child, pid, file));

        Ok(DispatchHandle::launched(pid))
    }
}

impl JobDispatcher for ProcessDispatcher {
    fn dispatch(&self, file_path: &Path) -> DispatchHandle {
        match self.launch(file_path) {
            Ok(handle) => {
                info!(
                    target: "worker",
                    pid = ?handle.pid(),
                    file = %file_path.display(),
                    "🚀 [worker] launched {}",
                    self.program
                );
                handle
            }
            Err(e) => {
                error!(
                    target: "worker",
                    file = %file_path.display(),
                    "❌ [worker] failed to spawn: {}",
                    e
                );
                DispatchHandle::not_launched()
            }
        }
    }
}

async fn log_output<R>(reader: R, stream: OutputStream, pid: Option<u32>, file: String)
where
    R: AsyncRead + Unpin,
{
    forward_lines(reader, MAX_OUTPUT_LINE, |line| match stream {
        OutputStream::Stdout => {
            info!(target: "worker", pid = ?pid, file = %file, "[worker] {}", line)
        }
        OutputStream::Stderr => {
            warn!(target: "worker", pid = ?pid, file = %file, "[worker ERROR] {}", line)
        }
    })
    .await;
}

/// Splits worker output on `\n`. A line longer than `max_length` is cut
/// into `max_length` pieces, so memory stays bounded whatever the worker
/// prints. Invalid UTF-8 is replaced rather than ending the stream.
#[derive(Debug)]
pub(crate) struct OutputLineCodec {
    max_length: usize,
    next_index: usize,
}

impl OutputLineCodec {
    pub(crate) fn new(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            next_index: 0,
        }
    }

    fn take(&mut self, buf: &mut BytesMut, len: usize, consumed: usize) -> String {
        self.next_index = 0;
        let chunk = buf.split_to(consumed);
        String::from_utf8_lossy(&chunk[..len])
            .trim_end_matches('\r')
            .to_string()
    }
}

impl Decoder for OutputLineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        // A newline right after max_length bytes still ends that line
        let search_end = buf.len().min(self.max_length + 1);
        if let Some(offset) = buf[self.next_index..search_end]
            .iter()
            .position(|b| *b == b'\n')
        {
            let end = self.next_index + offset;
            return Ok(Some(self.take(buf, end, end + 1)));
        }

        if buf.len() > self.max_length {
            let max = self.max_length;
            return Ok(Some(self.take(buf, max, max)));
        }

        self.next_index = buf.len();
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let len = buf.len();
        Ok(Some(self.take(buf, len, len)))
    }
}

/// Feeds each line of `reader` to `emit` as it arrives
pub(crate) async fn forward_lines<R, F>(reader: R, max_length: usize, mut emit: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut lines = FramedRead::new(reader, OutputLineCodec::new(max_length));
    while let Some(next) = lines.next().await {
        match next {
            Ok(line) => emit(&line),
            Err(e) => {
                tracing::debug!("Worker output stream closed with error: {}", e);
                break;
            }
        }
    }
}

async fn reap(mut child: Child, pid: Option<u32>, file: String) {
    match child.wait().await {
        Ok(status) if status.success() => {
            info!(target: "worker", pid = ?pid, file = %file, "✅ [worker] exited with {}", status)
        }
        Ok(status) => {
            warn!(target: "worker", pid = ?pid, file = %file, "⚠️  [worker] exited with {}", status)
        }
        Err(e) => {
            warn!(target: "worker", pid = ?pid, file = %file, "[worker] could not be awaited: {}", e)
        }
    }
}
