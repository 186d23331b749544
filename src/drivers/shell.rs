//! Driver running migration artifacts as shell scripts

use crate::migration::{Driver, DriverError};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread;

/// Environment variable carrying the connection URL into scripts
pub const URL_ENV: &str = "ANY_MIGRATE_URL";

/// Exit status a script uses to say it does not handle the requested phase
pub const NOT_IMPLEMENTED_EXIT_CODE: i32 = 78;

/// Runs each artifact through `<interpreter> -s -- <phase>` with the artifact
/// on stdin, where the phase is `up`, `down`, `pre-verify` or `post-verify`.
///
/// A script dispatches on `$1`:
///
/// ```sh
/// case "$1" in
///   up)   psql "$ANY_MIGRATE_URL" -c 'CREATE TABLE users (id int)' ;;
///   down) psql "$ANY_MIGRATE_URL" -c 'DROP TABLE users' ;;
///   *)    exit 78 ;;
/// esac
/// ```
#[derive(Debug)]
pub struct ShellDriver {
    extension: String,
    interpreter: String,
    url: Mutex<Option<String>>,
}

impl Default for ShellDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellDriver {
    /// `.sh` artifacts run by `sh`
    #[must_use]
    pub fn new() -> Self {
        Self::with_interpreter("sh", "sh")
    }

    /// Artifacts with `extension` run by `interpreter`, which must accept `-s`
    pub fn with_interpreter(extension: impl Into<String>, interpreter: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            interpreter: interpreter.into(),
            url: Mutex::new(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<String>>, DriverError> {
        self.url
            .lock()
            .map_err(|e| DriverError::Connection(format!("Failed to lock driver state: {e}")))
    }

    fn execute(&self, phase: &str, content: &mut dyn Read) -> Result<(), DriverError> {
        let url = self.lock()?.clone().ok_or_else(|| {
            DriverError::Connection("Shell driver used before initialize".to_string())
        })?;

        let mut script = Vec::new();
        content.read_to_end(&mut script)?;

        let mut child = Command::new(&self.interpreter)
            .args(["-s", "--", phase])
            .env(URL_ENV, &url)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from another thread so a chatty script cannot block on a full stdout pipe
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || stdin.write_all(&script))
        });
        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The script may exit without reading all of its input
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(DriverError::Execution(
                        "Script input writer panicked".to_string(),
                    ))
                }
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            log::debug!("{} {}: {}", self.interpreter, phase, stdout.trim_end());
        }

        match output.status.code() {
            Some(0) => Ok(()),
            Some(NOT_IMPLEMENTED_EXIT_CODE) => Err(DriverError::NotImplemented),
            _ => Err(DriverError::Execution(format!(
                "`{phase}` exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            ))),
        }
    }
}

impl Driver for ShellDriver {
    /// Check that the interpreter can be started and remember `url` for the scripts
    fn initialize(&self, url: &str) -> Result<(), DriverError> {
        let status = Command::new(&self.interpreter)
            .args(["-c", "exit 0"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                DriverError::Connection(format!("Cannot start '{}': {e}", self.interpreter))
            })?;
        if !status.success() {
            return Err(DriverError::Connection(format!(
                "'{}' exited with {status}",
                self.interpreter
            )));
        }

        *self.lock()? = Some(url.to_string());
        Ok(())
    }

    fn close(&self) -> Result<(), DriverError> {
        *self.lock()? = None;
        Ok(())
    }

    fn filename_extension(&self) -> &str {
        &self.extension
    }

    fn upgrade(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        self.execute("up", content)
    }

    fn downgrade(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        self.execute("down", content)
    }

    fn pre_verify(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        self.execute("pre-verify", content)
    }

    fn post_verify(&self, content: &mut dyn Read) -> Result<(), DriverError> {
        self.execute("post-verify", content)
    }
}
