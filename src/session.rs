// src/session.rs
// The session orchestrator: one editor round trip from scratch-file
// creation to the final response. All timing and concurrency lives in a
// single tokio::select! loop; the detector state machine is fed from its
// branches, so transitions are serialized and nothing needs a lock.

use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::AsyncWrite;
use tokio::process::Command;
use tokio::time::{Sleep, sleep};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::editor::EditorCommand;
use crate::error::SessionError;
use crate::protocol;
use crate::scratch::ScratchFile;
use crate::watch::{ChangeSource, Detector, DetectorAction, DetectorEvent, Timings};

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub timings: Timings,
    pub force_poll: bool,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timings: config.timings(),
            force_poll: config.force_poll,
        }
    }
}

/// One editor round trip. Owns the scratch file, the child process and the
/// detector; every exit path removes the scratch file.
pub struct Session {
    command: EditorCommand,
    scratch: ScratchFile,
    options: SessionOptions,
}

impl Session {
    /// Creates the scratch file and writes the initial text. On failure
    /// nothing is left behind.
    pub fn new(
        command: EditorCommand,
        text: &str,
        ext: Option<&str>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let scratch = ScratchFile::create(text, ext)?;
        Ok(Self {
            command,
            scratch,
            options,
        })
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Runs the session to completion, writing response frames to `out`.
    /// The scratch file is removed whether this succeeds or fails.
    pub async fn run<W>(mut self, out: &mut W) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        let result = self.drive(out).await;
        self.scratch.remove();
        result
    }

    async fn drive<W>(&mut self, out: &mut W) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        let timings = self.options.timings;

        // The source starts alongside the arming timer; events that arrive
        // during the grace period are swallowed by the detector.
        let mut source =
            ChangeSource::spawn(self.scratch.path(), &timings, self.options.force_poll);
        let mut detector = Detector::new();

        info!(
            editor = %self.command.program.display(),
            scratch = %self.scratch.path().display(),
            watch = ?source.kind(),
            "starting editor session"
        );

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(self.scratch.path())
            // The protocol channel must not leak into the editor.
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SessionError::Spawn {
                program: self.command.program.display().to_string(),
                source,
            })?;

        let arming = sleep(timings.arming_delay);
        tokio::pin!(arming);
        let mut armed = false;
        let mut debounce: Option<Pin<Box<Sleep>>> = None;
        let mut last_emitted: Option<String> = None;

        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(SessionError::Wait)?;
                    // Any exit, success or failure, ends the session.
                    debug!(?status, "editor exited");
                    detector.on_event(DetectorEvent::Stop);
                    break;
                }
                _ = &mut arming, if !armed => {
                    armed = true;
                    detector.on_event(DetectorEvent::ArmingElapsed);
                }
                Some(()) = source.recv() => {
                    if detector.on_event(DetectorEvent::FileChanged)
                        == Some(DetectorAction::StartDebounce)
                    {
                        debounce = Some(Box::pin(sleep(timings.debounce)));
                    }
                }
                _ = async { debounce.as_mut().expect("guarded by is_some").await },
                    if debounce.is_some() =>
                {
                    debounce = None;
                    if detector.on_event(DetectorEvent::DebounceElapsed)
                        == Some(DetectorAction::EmitSave)
                    {
                        // Stable save while the editor is still running
                        // (GUI editors keep going after save).
                        self.emit_current(out, &mut last_emitted).await?;
                    }
                }
            }
        }

        // The detector is stopped; in-flight timers die with the loop and
        // the change source shuts down when dropped.
        drop(debounce);
        drop(source);

        if !self.scratch.path().exists() {
            return Err(SessionError::FileMissingAfterExit {
                path: self.scratch.path().to_path_buf(),
            });
        }

        let text = self.read_scratch().await?;
        if last_emitted.as_deref() != Some(text.as_str()) {
            protocol::write_response(out, &text)
                .await
                .map_err(SessionError::Respond)?;
            debug!(bytes = text.len(), "emitted final response");
        } else {
            debug!("final content already emitted, skipping duplicate response");
        }

        Ok(())
    }

    /// Reads the file and emits a response unless the content matches the
    /// previous emission.
    async fn emit_current<W>(
        &self,
        out: &mut W,
        last_emitted: &mut Option<String>,
    ) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        let text = match self.read_scratch().await {
            Ok(text) => text,
            Err(e) => {
                // The file can be briefly unreadable mid-replace; the next
                // save or the exit path will pick the content up.
                warn!(error = %e, "could not read scratch file on save, skipping emission");
                return Ok(());
            }
        };

        if last_emitted.as_deref() == Some(text.as_str()) {
            return Ok(());
        }

        protocol::write_response(out, &text)
            .await
            .map_err(SessionError::Respond)?;
        debug!(bytes = text.len(), "emitted save response");
        *last_emitted = Some(text);
        Ok(())
    }

    async fn read_scratch(&self) -> Result<String, SessionError> {
        let bytes =
            tokio::fs::read(self.scratch.path())
                .await
                .map_err(|source| SessionError::Read {
                    path: self.scratch.path().to_path_buf(),
                    source,
                })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
