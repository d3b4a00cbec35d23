//! Bounded retries around device calls, and the lock recovery step that runs
//! between init attempts.

use std::os::raw::c_int;
use std::process::Command;
use std::time::Duration;

use crate::backend::Native;
use crate::config::Config;
use crate::sys;

/// Frees the device when another process holds it.
///
/// Called after a lock error, before init is attempted again. Failures are
/// logged by the implementation; the retry goes ahead regardless.
pub trait DeviceReleaser {
    /// Try to free the device.
    fn release(&self);
}

/// Runs an external command (normally the automounter's unmount) through the
/// shell and waits for the device to settle. Quoting in the command is
/// honoured.
#[derive(Debug, Clone)]
pub struct UnmountCommand {
    command: Option<String>,
    settle: Duration,
}

impl UnmountCommand {
    /// Command (if any) and how long to wait after it.
    pub fn new(command: Option<String>, settle: Duration) -> Self {
        UnmountCommand { command, settle }
    }

    /// Command and wait from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.unmount_command.clone(), config.unmount_settle)
    }
}

impl DeviceReleaser for UnmountCommand {
    fn release(&self) {
        if let Some(command) = self.command.as_deref().filter(|c| !c.trim().is_empty()) {
            tracing::info!("Running `{}` to release the camera", command);
            match shell(command).status() {
                Ok(status) if status.success() => {}
                Ok(status) => tracing::warn!("`{}` exited with {}", command, status),
                Err(err) => tracing::warn!("could not run `{}`: {}", command, err),
            }
        }
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Call `op` until it succeeds, fails with a code `should_retry` rejects, or
/// `retries` extra attempts are used up. `before_retry` runs only when another
/// attempt follows.
pub(crate) fn with_retry<T, Op, Pred, Hook>(
    what: &str,
    retries: u32,
    mut op: Op,
    should_retry: Pred,
    mut before_retry: Hook,
) -> Native<T>
where
    Op: FnMut() -> Native<T>,
    Pred: Fn(c_int) -> bool,
    Hook: FnMut(c_int),
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(code) if attempt < retries && should_retry(code) => {
                attempt += 1;
                tracing::warn!(
                    "{} failed with {}, retrying ({}/{})",
                    what,
                    code,
                    attempt,
                    retries
                );
                before_retry(code);
            }
            Err(code) => return Err(code),
        }
    }
}

/// Init policy: only a lock error is worth another attempt, after the
/// releaser has had a go at the device.
pub(crate) fn init_with_retry<Op>(
    retries: u32,
    releaser: &dyn DeviceReleaser,
    op: Op,
) -> Native<()>
where
    Op: FnMut() -> Native<()>,
{
    with_retry(
        "camera init",
        retries,
        op,
        |code| code == sys::GP_ERROR_IO_LOCK,
        |_| releaser.release(),
    )
}

/// Capture policy: retry on the configured transient codes, no recovery step.
pub(crate) fn capture_with_retry<T, Op>(what: &str, config: &Config, op: Op) -> Native<T>
where
    Op: FnMut() -> Native<T>,
{
    with_retry(
        what,
        config.retries,
        op,
        |code| config.is_capture_retryable(code),
        |_| {},
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingReleaser {
        calls: Cell<u32>,
    }

    impl DeviceReleaser for CountingReleaser {
        fn release(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    fn scripted(results: Vec<Native<()>>) -> impl FnMut() -> Native<()> {
        let mut results = results.into_iter();
        move || results.next().unwrap_or(Ok(()))
    }

    #[test]
    fn test_init_recovers_after_one_lock() {
        let releaser = CountingReleaser::default();
        let result = init_with_retry(1, &releaser, scripted(vec![Err(-60), Ok(())]));
        assert_eq!(result, Ok(()));
        assert_eq!(releaser.calls.get(), 1);
    }

    #[test]
    fn test_init_gives_up_after_budget() {
        let releaser = CountingReleaser::default();
        let result = init_with_retry(1, &releaser, scripted(vec![Err(-60), Err(-60), Ok(())]));
        assert_eq!(result, Err(-60));
        // Released between the two attempts only.
        assert_eq!(releaser.calls.get(), 1);
    }

    #[test]
    fn test_init_other_errors_are_immediate() {
        let releaser = CountingReleaser::default();
        let result = init_with_retry(3, &releaser, scripted(vec![Err(-7), Ok(())]));
        assert_eq!(result, Err(-7));
        assert_eq!(releaser.calls.get(), 0);
    }

    #[test]
    fn test_zero_retries() {
        let releaser = CountingReleaser::default();
        let result = init_with_retry(0, &releaser, scripted(vec![Err(-60)]));
        assert_eq!(result, Err(-60));
        assert_eq!(releaser.calls.get(), 0);
    }

    #[test]
    fn test_capture_retries_listed_codes_only() {
        let config = Config::default().with_retries(2);
        let attempts = Cell::new(0);
        let result = capture_with_retry("capture", &config, || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 3 {
                Err(sys::GP_ERROR_CAMERA_BUSY)
            } else {
                Ok(7)
            }
        });
        assert_eq!(result, Ok(7));
        assert_eq!(attempts.get(), 3);

        attempts.set(0);
        let result: Native<()> = capture_with_retry("capture", &config, || {
            attempts.set(attempts.get() + 1);
            Err(sys::GP_ERROR_FILE_NOT_FOUND)
        });
        assert_eq!(result, Err(sys::GP_ERROR_FILE_NOT_FOUND));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_unmount_without_command_only_sleeps() {
        let releaser = UnmountCommand::new(None, Duration::ZERO);
        releaser.release();
    }

    #[cfg(unix)]
    #[test]
    fn test_unmount_command_keeps_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("released");
        let command = format!("printf '%s' \"gphoto2://[usb:001,004]/ x\" > '{}'", out.display());
        UnmountCommand::new(Some(command), Duration::ZERO).release();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "gphoto2://[usb:001,004]/ x");
    }
}
