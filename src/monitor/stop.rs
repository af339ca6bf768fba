use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};

/// Cooperative cancellation flag shared between the loop and its watchers.
///
/// Watchers only ever set the flag. The loop observes it once per tick.
#[derive(Clone, Debug, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout`, then report whether a stop was requested.
    pub fn poll(&self, timeout: Duration) -> bool {
        if !timeout.is_zero() && !self.is_stop_requested() {
            std::thread::sleep(timeout);
        }
        self.is_stop_requested()
    }
}

/// Route Ctrl-C into `token`. Can only be installed once per process.
pub fn install_ctrlc(token: &StopToken) -> Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, stopping after the current frame");
        token.request_stop();
    })
    .context("error setting Ctrl-C handler")
}

/// Watch `input` line by line and request a stop when a line starts with
/// `key`. The thread exits on stop or when the input closes.
pub fn spawn_key_watcher<R>(token: &StopToken, input: R, key: char) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    let token = token.clone();
    std::thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else { break };
            if line.trim_start().starts_with(key) {
                log::info!("'{}' pressed, stopping after the current frame", key);
                token.request_stop();
                break;
            }
            if token.is_stop_requested() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn clones_share_the_flag() {
        let token = StopToken::new();
        let other = token.clone();
        assert!(!token.poll(Duration::ZERO));
        other.request_stop();
        assert!(token.is_stop_requested());
        assert!(token.poll(Duration::from_millis(1)));
    }

    #[test]
    fn key_watcher_stops_on_key() {
        let token = StopToken::new();
        let handle = spawn_key_watcher(&token, Cursor::new("x\n\nq\n"), 'q');
        handle.join().unwrap();
        assert!(token.is_stop_requested());
    }

    #[test]
    fn key_watcher_ignores_other_input() {
        let token = StopToken::new();
        let handle = spawn_key_watcher(&token, Cursor::new("quit later? no\nw\n"), 'w');
        handle.join().unwrap();
        assert!(token.is_stop_requested());

        let token = StopToken::new();
        let handle = spawn_key_watcher(&token, Cursor::new("a\nb\n"), 'q');
        handle.join().unwrap();
        assert!(!token.is_stop_requested());
    }
}
