//! Execution ledger: records every oracle call so an interrupted run can be
//! restarted without repeating finished evaluations.
//!
//! Lifecycle: [`ExecutionLedger::initialize`] derives the file paths, then
//! either [`ExecutionLedger::start_fresh`] truncates the ledger or
//! [`ExecutionLedger::load_for_resume`] queues the recorded calls for replay.
//! While replaying, each requested call is compared with the next recorded
//! one. The first mismatch, or the last entry being consumed, switches the
//! ledger to fresh mode for the rest of the run.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use kf_types::{Invocation, KfResult, LedgerError};
use tracing::{debug, info, warn};

use crate::oracle::Oracle;
use crate::session::SessionLog;

/// Ledger of issued calls, one canonical invocation per line.
pub const LEDGER_FILE: &str = ".kfold_ledger";
/// Human-readable session messages.
pub const SESSION_FILE: &str = "kfold_sessions";

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerMode {
    /// Every call is recorded, then executed.
    Fresh,
    /// Replaying a previous run. `pending` holds the unconsumed entries with
    /// the oldest last, so they are consumed by popping.
    Replaying { pending: Vec<Invocation> },
}

/// What [`ExecutionLedger::invoke`] did with a call.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeOutcome {
    /// New call, recorded and executed.
    Executed(Invocation),
    /// Matched a recorded call; nothing was executed. Holds the recorded
    /// invocation.
    Replayed(Invocation),
    /// Matched the last recorded call; the oracle was asked to reconcile any
    /// work left unfinished by the interrupted run.
    Reconciled(Invocation),
    /// Did not match the next recorded call; resume was abandoned and the call
    /// was recorded and executed.
    Diverged(Invocation),
}

impl InvokeOutcome {
    /// The invocation whose results the caller should read.
    pub fn invocation(&self) -> &Invocation {
        match self {
            Self::Executed(invocation)
            | Self::Replayed(invocation)
            | Self::Reconciled(invocation)
            | Self::Diverged(invocation) => invocation,
        }
    }
}

#[derive(Debug)]
pub struct ExecutionLedger {
    ledger_path: PathBuf,
    session: SessionLog,
    mode: LedgerMode,
    /// Entries confirmed by the replay so far, in write order.
    replayed: Vec<Invocation>,
}

impl ExecutionLedger {
    /// Derive the ledger and session log paths inside `output_dir`, creating
    /// the directory if needed. The ledger file itself is not touched.
    pub fn initialize<P: AsRef<Path>>(output_dir: P) -> KfResult<Self> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;
        let session = SessionLog::open(output_dir.join(SESSION_FILE))?;

        Ok(Self {
            ledger_path: output_dir.join(LEDGER_FILE),
            session,
            mode: LedgerMode::Fresh,
            replayed: Vec::new(),
        })
    }

    /// Initialize and either load the previous ledger or start a new one.
    pub fn open<P: AsRef<Path>>(output_dir: P, resume: bool) -> KfResult<Self> {
        let mut ledger = Self::initialize(output_dir)?;
        if resume {
            ledger.load_for_resume()?;
        } else {
            ledger.start_fresh()?;
        }
        Ok(ledger)
    }

    /// Discard any previous ledger.
    pub fn start_fresh(&mut self) -> KfResult<()> {
        self.rewrite(&[])?;
        self.mode = LedgerMode::Fresh;
        self.replayed.clear();
        Ok(())
    }

    /// Queue the recorded calls for replay and return how many there are.
    /// A missing ledger means there is nothing to resume.
    pub fn load_for_resume(&mut self) -> KfResult<usize> {
        let contents = match fs::read_to_string(&self.ledger_path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(
                    "No ledger at {}; starting a fresh run",
                    self.ledger_path.display()
                );
                self.start_fresh()?;
                return Ok(0);
            }
            Err(err) => return Err(err.into()),
        };

        let mut pending = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let invocation =
                Invocation::from_canonical(line).map_err(|err| LedgerError::Corrupt {
                    line: index + 1,
                    message: err.to_string(),
                })?;
            pending.push(invocation);
        }
        pending.reverse();

        let count = pending.len();
        info!("Loaded {} recorded calls for replay", count);
        self.replayed.clear();
        self.mode = if pending.is_empty() {
            LedgerMode::Fresh
        } else {
            LedgerMode::Replaying { pending }
        };
        Ok(count)
    }

    pub fn mode(&self) -> &LedgerMode {
        &self.mode
    }

    pub fn is_resuming(&self) -> bool {
        matches!(self.mode, LedgerMode::Replaying { .. })
    }

    /// Number of recorded calls not yet replayed.
    pub fn pending(&self) -> usize {
        match &self.mode {
            LedgerMode::Fresh => 0,
            LedgerMode::Replaying { pending } => pending.len(),
        }
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn session_path(&self) -> &Path {
        self.session.path()
    }

    pub fn log_message(&mut self, message: &str) -> KfResult<()> {
        self.session.log(message)
    }

    /// Issue `invocation` through `oracle` unless the replay shows it was
    /// already made.
    pub fn invoke<O: Oracle + ?Sized>(
        &mut self,
        invocation: Invocation,
        oracle: &mut O,
    ) -> KfResult<InvokeOutcome> {
        let mut pending = match std::mem::replace(&mut self.mode, LedgerMode::Fresh) {
            LedgerMode::Fresh => {
                self.record(&invocation)?;
                oracle.execute(&invocation)?;
                return Ok(InvokeOutcome::Executed(invocation));
            }
            LedgerMode::Replaying { pending } => pending,
        };

        match pending.pop() {
            Some(recorded) if recorded.same_call(&invocation) => {
                debug!("Replaying recorded call: {}", recorded.configuration);
                self.replayed.push(recorded.clone());
                if pending.is_empty() {
                    info!("Ledger exhausted; reconciling the last recorded call");
                    oracle.reconcile()?;
                    Ok(InvokeOutcome::Reconciled(recorded))
                } else {
                    self.mode = LedgerMode::Replaying { pending };
                    Ok(InvokeOutcome::Replayed(recorded))
                }
            }
            next => {
                warn!(
                    "Resume diverged at {} (recorded: {})",
                    invocation.configuration,
                    next.as_ref()
                        .map(|recorded| recorded.configuration.to_string())
                        .unwrap_or_else(|| "nothing".to_string())
                );
                // Drop the unreplayed tail so the ledger stays a valid
                // history of this run.
                self.rewrite(&self.replayed.clone())?;
                self.session.log(&format!(
                    "Resumed run diverged after {} recorded calls; continuing fresh",
                    self.replayed.len()
                ))?;
                self.record(&invocation)?;
                oracle.execute(&invocation)?;
                Ok(InvokeOutcome::Diverged(invocation))
            }
        }
    }

    fn record(&self, invocation: &Invocation) -> KfResult<()> {
        let line = invocation.canonical()?;
        let write = || -> io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.ledger_path)?;
            writeln!(file, "{line}")?;
            file.flush()?;
            file.sync_data()
        };
        write().map_err(|err| self.write_failed(err))?;
        Ok(())
    }

    fn rewrite(&self, entries: &[Invocation]) -> KfResult<()> {
        let mut lines = String::new();
        for entry in entries {
            lines.push_str(&entry.canonical()?);
            lines.push('\n');
        }
        let write = || -> io::Result<()> {
            let mut file = File::create(&self.ledger_path)?;
            file.write_all(lines.as_bytes())?;
            file.sync_data()
        };
        write().map_err(|err| self.write_failed(err))?;
        Ok(())
    }

    fn write_failed(&self, err: io::Error) -> LedgerError {
        LedgerError::WriteFailed {
            path: self.ledger_path.clone(),
            message: err.to_string(),
        }
    }
}
