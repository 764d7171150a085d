// src/exec/job_runner.rs

//! Individual job process runner for the local backend.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::exec::backend::{JobHandle, JobStatus};
use crate::exec::job_table::JobTable;
use crate::types::OutputRef;

/// Environment variable carrying the rule name.
pub const ENV_RULE: &str = "RULEFLOW_RULE";
/// Environment variable carrying the job id.
pub const ENV_JOB: &str = "RULEFLOW_JOB";
/// Environment variable carrying the newline-separated input references.
pub const ENV_INPUTS: &str = "RULEFLOW_INPUTS";

/// What the runner needs to launch one job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub handle: JobHandle,
    pub cmd: String,
    pub inputs: Vec<OutputRef>,
    /// How long to keep reading stdout once the process has exited.
    pub drain_timeout: Duration,
}

/// Run a single job process and record its terminal status in `table`.
///
/// Every non-empty stdout line becomes an output reference. If the cancel
/// channel fires (kill or release), the child process is killed and the job
/// ends `Dead`.
///
/// A background process started by the command may keep stdout open after
/// the command itself exits. Outputs are then read for at most
/// `drain_timeout` before the job finishes with what was read so far.
pub async fn run_job(job: JobSpec, table: Arc<JobTable>, cancel_rx: oneshot::Receiver<()>) {
    let handle = job.handle.clone();
    match run_job_inner(job, cancel_rx).await {
        Ok((status, outputs)) => table.finish(&handle, status, outputs),
        Err(err) => {
            error!(
                rule = %handle.rule_name(),
                job = %handle,
                error = %err,
                "job execution error"
            );
            table.finish(&handle, JobStatus::Dead, Vec::new());
        }
    }
}

async fn run_job_inner(
    job: JobSpec,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<(JobStatus, Vec<OutputRef>)> {
    info!(
        rule = %job.handle.rule_name(),
        job = %job.handle,
        cmd = %job.cmd,
        inputs = job.inputs.len(),
        "starting job process"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&job.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&job.cmd);
        c
    };

    let inputs = job
        .inputs
        .iter()
        .map(OutputRef::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    cmd.env(ENV_RULE, job.handle.rule_name())
        .env(ENV_JOB, job.handle.id())
        .env(ENV_INPUTS, inputs)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for job '{}'", job.handle))?;

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    match child.stdout.take() {
        Some(stdout) => {
            tokio::spawn(forward_outputs(stdout, out_tx));
        }
        None => drop(out_tx),
    }

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let handle = job.handle.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(job = %handle, "stderr: {}", line);
            }
        });
    }

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process of job '{}'", job.handle))?;

            let outputs = drain_outputs(&mut out_rx, &job).await;

            let code = status.code().unwrap_or(-1);
            info!(
                rule = %job.handle.rule_name(),
                job = %job.handle,
                exit_code = code,
                success = status.success(),
                outputs = outputs.len(),
                "job process exited"
            );

            if status.success() {
                Ok((JobStatus::Ready, outputs))
            } else {
                Ok((JobStatus::Dead, Vec::new()))
            }
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => info!(job = %job.handle, "kill requested; stopping job process"),
                Err(_) => debug!(job = %job.handle, "job entry dropped; stopping job process"),
            }
            if let Err(e) = child.kill().await {
                warn!(job = %job.handle, error = %e, "failed to kill job process");
            }
            Ok((JobStatus::Dead, Vec::new()))
        }
    }
}

/// Send every non-empty stdout line as an output reference until EOF or
/// until the receiving side is gone.
async fn forward_outputs(stdout: ChildStdout, tx: mpsc::UnboundedSender<OutputRef>) {
    let mut lines = BufReader::new(stdout).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if tx.send(OutputRef::new(line)).is_err() {
            break;
        }
    }
}

async fn drain_outputs(
    rx: &mut mpsc::UnboundedReceiver<OutputRef>,
    job: &JobSpec,
) -> Vec<OutputRef> {
    let deadline = Instant::now() + job.drain_timeout;
    let mut outputs = Vec::new();

    loop {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Some(output)) => outputs.push(output),
            Ok(None) => break,
            Err(_) => {
                warn!(
                    job = %job.handle,
                    outputs = outputs.len(),
                    "stdout still open after the job process exited; keeping outputs read so far"
                );
                break;
            }
        }
    }

    outputs
}
