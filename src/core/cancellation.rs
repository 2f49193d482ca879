// src/core/cancellation.rs

//! The single cancellation signal shared by the control loop, the retry
//! harness, and the interactive hotkey listener.

use tokio_util::sync::CancellationToken as TokioCancellationToken;
use tracing::info;

/// A cheap, cloneable handle around `tokio_util`'s cancellation primitive.
/// Checked between ticks and between phases of a tick; in-flight I/O is never
/// forcibly aborted; callers observe it cooperatively.
#[derive(Clone, Default)]
pub struct CancellationToken(TokioCancellationToken);

impl CancellationToken {
    pub fn new() -> Self {
        Self(TokioCancellationToken::new())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}

/// Listens for the `q` hotkey on the controlling terminal and cancels `token`
/// when pressed, initiating orderly shutdown. Runs until cancellation,
/// either from the hotkey itself or from elsewhere (e.g. a process signal).
///
/// Puts the terminal into raw mode for the duration of the listener so a
/// bare `q` is delivered immediately instead of waiting on the line
/// discipline to flush a newline; raw mode is always disabled again before
/// returning, on every exit path.
pub async fn run_hotkey_listener(token: CancellationToken) {
    use crossterm::event::{Event, KeyCode};
    use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

    if enable_raw_mode().is_err() {
        return;
    }

    loop {
        if token.is_cancelled() {
            break;
        }

        let poll_result = tokio::task::spawn_blocking(|| {
            crossterm::event::poll(std::time::Duration::from_millis(200))
                .ok()
                .filter(|&ready| ready)
                .and_then(|_| crossterm::event::read().ok())
        })
        .await;

        match poll_result {
            Ok(Some(Event::Key(key))) if key.code == KeyCode::Char('q') => {
                info!("shutdown hotkey pressed, initiating orderly shutdown");
                token.cancel();
                break;
            }
            Ok(_) => continue,
            Err(_) => break,
        }
    }

    let _ = disable_raw_mode();
}
