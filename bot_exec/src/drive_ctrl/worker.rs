//! Background command worker
//!
//! Runs background timed commands on a dedicated thread so that slow actions don't stretch the
//! control tick. Commands run in the order they were dispatched.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle};

use super::DriveCtrlError;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

type Job = Box<dyn FnOnce() + Send + 'static>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Owns the worker thread. Dropping the worker waits for queued commands to finish.
pub struct CommandWorker {
    sender: Option<Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CommandWorker {
    pub fn new() -> Result<Self, DriveCtrlError> {
        let (tx, rx) = channel::<Job>();

        let thread = thread::Builder::new()
            .name("drive_cmd_worker".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
                debug!("Command worker exiting");
            })
            .map_err(DriveCtrlError::WorkerSpawn)?;

        Ok(Self {
            sender: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue a command without waiting for it to run.
    pub fn dispatch(&self, job: Job) -> Result<(), DriveCtrlError> {
        match self.sender {
            Some(ref s) => s.send(job).map_err(|_| DriveCtrlError::WorkerStopped),
            None => Err(DriveCtrlError::WorkerStopped),
        }
    }
}

impl Drop for CommandWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker's loop once the queue is empty
        self.sender.take();

        if let Some(jh) = self.thread.take() {
            if jh.join().is_err() {
                warn!("A background command panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_runs_in_order() {
        let (tx, rx) = mpsc::channel();
        let worker = CommandWorker::new().unwrap();

        for i in 0..5 {
            let tx = tx.clone();
            worker
                .dispatch(Box::new(move || tx.send(i).unwrap()))
                .unwrap();
        }

        let got: Vec<i32> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_drop_waits_for_queue() {
        let (tx, rx) = mpsc::channel();
        {
            let worker = CommandWorker::new().unwrap();
            worker
                .dispatch(Box::new(move || {
                    std::thread::sleep(Duration::from_millis(20));
                    tx.send(()).unwrap();
                }))
                .unwrap();
        }
        assert!(rx.try_recv().is_ok());
    }
}
