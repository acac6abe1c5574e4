//! Typed input, one line per turn.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::{InputError, InputSource};
use crate::handoff::Signal;
use crate::pipeline::TurnInput;

/// Reads lines from any async buffered reader, stdin by default.
///
/// A prompt (`"> "` for stdin) is printed before every read once the
/// previous reply has been delivered.
pub struct ConsoleInput<R = BufReader<tokio::io::Stdin>> {
    reader: Mutex<R>,
    prompt: Option<&'static str>,
}

impl ConsoleInput {
    pub fn stdin() -> Self {
        Self {
            reader: Mutex::new(BufReader::new(tokio::io::stdin())),
            prompt: Some("> "),
        }
    }
}

impl<R> ConsoleInput<R> {
    /// Read from `reader` without printing a prompt.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
            prompt: None,
        }
    }
}

#[async_trait]
impl<R> InputSource for ConsoleInput<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn receive(&self, ready: &Signal) -> Result<Option<TurnInput>, InputError> {
        ready.wait().await;

        if let Some(prompt) = self.prompt {
            let mut out = tokio::io::stdout();
            out.write_all(prompt.as_bytes()).await?;
            out.flush().await?;
        }

        let mut line = String::new();
        let n = self.reader.lock().await.read_line(&mut line).await?;
        if n == 0 {
            return Err(InputError::Closed);
        }

        let text = line.trim();
        if text.is_empty() {
            // Leave `ready` raised so the caller re-prompts straight away.
            return Ok(None);
        }

        ready.clear();
        Ok(Some(TurnInput::Text(text.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn source(text: &'static str) -> ConsoleInput<&'static [u8]> {
        ConsoleInput::from_reader(text.as_bytes())
    }

    #[tokio::test]
    async fn reads_one_trimmed_line_per_call() {
        let input = source("  hello \nsecond\n");
        let ready = Signal::raised();

        let first = input.receive(&ready).await.unwrap();
        assert_eq!(first, Some(TurnInput::Text("hello".into())));
        assert!(!ready.is_set(), "ready is consumed by a real line");

        ready.set();
        let second = input.receive(&ready).await.unwrap();
        assert_eq!(second, Some(TurnInput::Text("second".into())));
    }

    #[tokio::test]
    async fn blank_line_yields_none_and_keeps_ready() {
        let input = source("   \n");
        let ready = Signal::raised();
        assert_eq!(input.receive(&ready).await.unwrap(), None);
        assert!(ready.is_set());
    }

    #[tokio::test]
    async fn eof_is_closed() {
        let input = source("");
        let ready = Signal::raised();
        assert!(matches!(
            input.receive(&ready).await,
            Err(InputError::Closed)
        ));
    }

    #[tokio::test]
    async fn waits_for_ready() {
        let input = source("hi\n");
        let ready = Signal::new();
        let pending = tokio::time::timeout(Duration::from_millis(30), input.receive(&ready)).await;
        assert!(pending.is_err(), "must not read before ready is raised");
    }
}
