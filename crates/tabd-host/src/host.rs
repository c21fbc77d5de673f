use std::io::{Read, Write};

use color_eyre::Result;
use tabd_core::clipboard::{ClipboardData, ClipboardRepository, Response};
use tracing::{error, info, warn};

use crate::messaging::{read_message, skip_payload, write_message, FrameError};

/// Serves one browser connection: every frame is a clipboard snapshot to persist.
pub struct NativeHost<R: ClipboardRepository> {
    repo: R,
}

impl<R: ClipboardRepository> NativeHost<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Process frames until the browser closes the pipe.
    pub fn run<I: Read, O: Write>(&self, input: &mut I, output: &mut O) -> Result<()> {
        info!("native host started");
        loop {
            let message = match read_message(input) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!("browser extension disconnected");
                    return Ok(());
                }
                Err(FrameError::InvalidLength(0)) => {
                    warn!("skipping empty frame");
                    continue;
                }
                Err(FrameError::InvalidLength(len)) => {
                    warn!(len, "skipping oversized frame");
                    skip_payload(input, len)?;
                    let response = Response::error(format!("Invalid message length: {len}"));
                    self.reply(output, &response)?;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let response = self.handle_message(&message);
            self.reply(output, &response)?;
        }
    }

    fn reply<O: Write>(&self, output: &mut O, response: &Response) -> Result<()> {
        let body = serde_json::to_vec(response)?;
        write_message(output, &body)?;
        Ok(())
    }

    /// Persist one snapshot and build the reply for it.
    pub fn handle_message(&self, message: &[u8]) -> Response {
        let data: ClipboardData = match serde_json::from_slice(message) {
            Ok(data) => data,
            Err(err) => {
                warn!(%err, "failed to parse message");
                return Response::error(format!("Failed to parse message: {err}"));
            }
        };

        match self.repo.save_latest(&data) {
            Ok(()) => Response::success("Clipboard data saved successfully"),
            Err(err) => {
                error!(%err, "error saving clipboard data");
                Response::error(format!("Failed to save clipboard data: {err}"))
            }
        }
    }
}
