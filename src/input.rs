use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event};

use crate::msg::Msg;

/// How long one poll may block before the stop flag is checked again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Terminal input forwarded as [`Msg`]. The thread stops and is joined when
/// this handle is dropped, so nothing keeps reading the terminal afterwards.
pub struct InputThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputThread {
    pub fn spawn(tx: Sender<Msg>) -> Self {
        Self::spawn_with(tx, |timeout| {
            if event::poll(timeout)? {
                event::read().map(Some)
            } else {
                Ok(None)
            }
        })
    }

    /// `next_event` waits at most the given timeout and yields `None` when
    /// nothing arrived.
    pub fn spawn_with<F>(tx: Sender<Msg>, mut next_event: F) -> Self
    where
        F: FnMut(Duration) -> io::Result<Option<Event>> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                let event = match next_event(POLL_INTERVAL) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(err) => {
                        tracing::warn!("terminal input failed: {err}");
                        break;
                    }
                };

                let msg = match event {
                    Event::Key(k) => Msg::Key(k),
                    Event::Resize(w, h) => Msg::Resize(w, h),
                    _ => continue,
                };
                if tx.send(msg).is_err() {
                    break;
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for InputThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("input thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    use crossterm::event::{KeyCode, KeyEvent};

    use super::*;

    #[test]
    fn events_are_forwarded_as_messages() {
        let (tx, rx) = mpsc::channel();
        let mut pending = vec![
            Event::Resize(80, 24),
            Event::FocusGained,
            Event::Key(KeyEvent::from(KeyCode::Char('q'))),
        ];
        let _input = InputThread::spawn_with(tx, move |timeout| {
            match pending.pop() {
                Some(event) => Ok(Some(event)),
                None => {
                    thread::sleep(timeout);
                    Ok(None)
                }
            }
        });

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();

        assert!(matches!(first, Msg::Key(key) if key.code == KeyCode::Char('q')));
        assert!(matches!(second, Msg::Resize(80, 24)));
    }

    #[test]
    fn dropping_the_handle_stops_reading_input() {
        let (tx, _rx) = mpsc::channel();
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let input = InputThread::spawn_with(tx, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            Ok(None)
        });
        thread::sleep(Duration::from_millis(20));

        drop(input);
        let after_drop = polls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));

        assert!(after_drop > 0);
        assert_eq!(polls.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn read_error_ends_the_thread() {
        let (tx, rx) = mpsc::channel();
        let input = InputThread::spawn_with(tx, |_| Err(io::Error::other("tty closed")));

        drop(input);

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
