//! Session management
//!
//! A session is one execution of an executable. It owns a directory in which the log file and
//! telemetry are written, and the background thread which writes telemetry to disk so that the
//! control loop never blocks on file I/O.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Dropped telemetry is reported on the first drop and then every this many drops.
const DROP_WARN_INTERVAL: u64 = 100;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's telemetry files
    pub tm_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    tm_sender: SyncSender<TmMsg>,

    tm_dropped: Arc<AtomicU64>,

    tm_thread: Option<JoinHandle<()>>,
}

/// Non-blocking handle used to record telemetry into the session.
///
/// Records are serialised on the calling thread and queued to the session's writer thread. If the
/// queue is full the record is dropped and counted rather than blocking the caller.
#[derive(Clone)]
pub struct Telemetry {
    sender: Option<SyncSender<TmMsg>>,
    dropped: Arc<AtomicU64>,
}

/// A timestamped telemetry record as written to disk.
#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    time_s: f64,
    data: &'a T,
}

enum TmMsg {
    Record { channel: &'static str, line: String },
    Stop,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (TANK_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the\
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,

    #[error("Cannot start the telemetry thread: {0}")]
    CannotSpawnThread(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory, relative to the software root.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    pub fn new(
        exec_name: &str,
        sessions_dir: &str,
        tm_queue_len: usize
    ) -> Result<Self, SessionError> {
        let root = crate::params::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        Self::new_in(root, exec_name, sessions_dir, tm_queue_len)
    }

    /// Start a new session below an explicit root directory.
    pub fn new_in(
        root: PathBuf,
        exec_name: &str,
        sessions_dir: &str,
        tm_queue_len: usize
    ) -> Result<Self, SessionError> {
        // Set the session epoch
        match SESSION_EPOCH.try_init_once(Utc::now) {
            Ok(_) => (),
            Err(e) => return Err(SessionError::CannotInitEpoch(e)),
        };

        // Format the session epoch as a timestamp
        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        // Create the session path
        let mut path: PathBuf = root;
        path.push(sessions_dir);
        path.push(format!("{}_{}", exec_name, timestamp));

        // Create the telemetry dir, which also creates the session dir
        let tm_path = path.join("tm");
        fs::create_dir_all(&tm_path).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = path.join(format!("{}.log", exec_name));

        // Create the bounded queue and the writer thread
        let (tx, rx) = sync_channel(tm_queue_len.max(1));
        let thread_root = tm_path.clone();
        let tm_thread = thread::Builder::new()
            .name("tm_writer".into())
            .spawn(move || tm_thread(thread_root, rx))
            .map_err(SessionError::CannotSpawnThread)?;

        Ok(Session {
            session_root: path,
            tm_root: tm_path,
            log_file_path,
            tm_sender: tx,
            tm_dropped: Arc::new(AtomicU64::new(0)),
            tm_thread: Some(tm_thread),
        })
    }

    /// Get a telemetry handle which records into this session.
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            sender: Some(self.tm_sender.clone()),
            dropped: self.tm_dropped.clone(),
        }
    }

    /// Exit the session, waiting for the writer thread to flush everything already queued.
    pub fn exit(mut self) {
        info!("Stopping telemetry thread");

        if self.tm_sender.send(TmMsg::Stop).is_err() {
            warn!("Telemetry thread already stopped");
        }

        if let Some(jh) = self.tm_thread.take() {
            if jh.join().is_err() {
                warn!("Telemetry thread panicked");
            }
        }

        info!(
            "Telemetry thread exited ({} records dropped)",
            self.tm_dropped.load(Ordering::Relaxed)
        );
    }
}

impl Telemetry {
    /// A telemetry handle which discards everything.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a value onto the given channel without blocking.
    pub fn record<T: Serialize>(&self, channel: &'static str, data: &T) {
        let sender = match self.sender {
            Some(ref s) => s,
            None => return,
        };

        let line = match serde_json::to_string(&Record {
            time_s: get_elapsed_seconds_or_zero(),
            data,
        }) {
            Ok(l) => l,
            Err(e) => {
                warn!("Could not serialise telemetry for channel {}: {}", channel, e);
                return;
            }
        };

        match sender.try_send(TmMsg::Record { channel, line }) {
            Ok(_) => (),
            Err(TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if n == 1 || n % DROP_WARN_INTERVAL == 0 {
                    warn!("Telemetry queue full, {} records dropped so far", n);
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Telemetry thread has exited, record on {} discarded", channel);
            }
        }
    }

    /// Number of records dropped because the queue was full.
    pub fn num_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => {
            let elapsed = Utc::now() - *e;
            match time::duration_to_seconds(elapsed) {
                Some(s) => s,
                None => std::f64::NAN,
            }
        }
        None => panic!("Cannot get the session epoch!"),
    }
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn get_elapsed_seconds_or_zero() -> f64 {
    match SESSION_EPOCH.get() {
        Some(_) => get_elapsed_seconds(),
        None => 0.0,
    }
}

fn tm_thread(tm_root: PathBuf, receiver: Receiver<TmMsg>) {
    let mut files: HashMap<&'static str, BufWriter<File>> = HashMap::new();

    // The loop ends on an explicit stop or when every sender has been dropped
    while let Ok(msg) = receiver.recv() {
        let (channel, line) = match msg {
            TmMsg::Record { channel, line } => (channel, line),
            TmMsg::Stop => break,
        };

        if !files.contains_key(channel) {
            let path = tm_root.join(format!("{}.jsonl", channel));
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(f) => {
                    files.insert(channel, BufWriter::new(f));
                }
                Err(e) => {
                    warn!("Couldn't open telemetry file {:?}: {}", path, e);
                    continue;
                }
            }
        }

        if let Some(w) = files.get_mut(channel) {
            if let Err(e) = writeln!(w, "{}", line) {
                warn!("Couldn't write telemetry to channel {}: {}", channel, e);
            }
        }
    }

    for (channel, mut w) in files {
        if let Err(e) = w.flush() {
            warn!("Couldn't flush telemetry channel {}: {}", channel, e);
        }
    }
}
