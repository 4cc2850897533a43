//! Human-in-the-loop input.
//!
//! A [`UserChannel`] shows an assistant-authored message and blocks until
//! the human answers or the channel goes away. The terminal implementation
//! reads one line per reply; chat backends can implement the same trait as
//! an await on the next inbound message.

use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

/// Errors raised by a [`UserChannel`].
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Input ended before a reply was supplied.
    #[error("User channel closed before a reply was received")]
    Closed,

    /// Reading or writing the underlying stream failed.
    #[error("User channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability for synchronous human interaction.
#[async_trait]
pub trait UserChannel: Send + Sync {
    /// Display `message` and wait for the human's raw reply.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if no reply can ever arrive.
    async fn prompt_user(&self, message: &str) -> Result<String, ChannelError>;
}

/// Line-oriented channel over a reader and a writer.
///
/// Prints `Assistant: <message>` followed by a `User: ` prompt, then reads
/// one line. End of input is reported as [`ChannelError::Closed`]; an empty
/// line is a valid (empty) reply.
pub struct TerminalChannel<R = BufReader<Stdin>, W = std::io::Stdout> {
    io: Mutex<(R, W)>,
}

impl TerminalChannel {
    /// Channel over the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), std::io::stdout())
    }
}

impl<R, W> TerminalChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Channel over arbitrary streams.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    /// Recover the underlying streams.
    pub fn into_parts(self) -> (R, W) {
        self.io.into_inner()
    }
}

#[async_trait]
impl<R, W> UserChannel for TerminalChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn prompt_user(&self, message: &str) -> Result<String, ChannelError> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        writeln!(writer, "\n{} {}", "Assistant:".cyan().bold(), message)?;
        write!(writer, "\n{} ", "User:".green().bold())?;
        writer.flush()?;

        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            debug!("prompt_user: end of input");
            return Err(ChannelError::Closed);
        }

        let reply = line.trim_end_matches(['\n', '\r']).to_string();
        debug!("prompt_user: received {} chars", reply.len());
        Ok(reply)
    }
}
