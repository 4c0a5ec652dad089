//! Prompt input for the interactive session.
//!
//! Lines are read with a plain blocking `read_line` on a dedicated thread
//! and handed over a channel. Leaving the prompt never leaves a read pending
//! inside the runtime, so Ctrl-C at the prompt exits right away.

use std::future::Future;
use std::io::{self, BufRead};

use tokio::sync::mpsc;

/// What the prompt produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Lines read so far, in order. The reader thread stops at EOF, on a read
/// error, or once the receiver is gone.
pub struct LineReader {
    lines: mpsc::Receiver<io::Result<String>>,
}

impl LineReader {
    pub fn stdin() -> Self {
        let (tx, lines) = mpsc::channel(1);
        std::thread::spawn(move || pump(io::stdin().lock(), tx));
        Self { lines }
    }

    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, lines) = mpsc::channel(1);
        std::thread::spawn(move || pump(reader, tx));
        Self { lines }
    }

    /// Wait for the next line, or for `interrupt` to fire first.
    pub async fn next(&mut self, interrupt: impl Future<Output = ()>) -> io::Result<Input> {
        tokio::select! {
            line = self.lines.recv() => match line {
                Some(Ok(line)) => Ok(Input::Line(line)),
                Some(Err(e)) => Err(e),
                None => Ok(Input::Eof),
            },
            () = interrupt => Ok(Input::Interrupted),
        }
    }
}

fn pump<R: BufRead>(mut reader: R, tx: mpsc::Sender<io::Result<String>>) {
    loop {
        let mut line = String::new();
        let read = match reader.read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => Ok(line),
            Err(e) => Err(e),
        };
        let failed = read.is_err();
        if tx.blocking_send(read).is_err() || failed {
            return;
        }
    }
}

/// Resolves on the first Ctrl-C.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
