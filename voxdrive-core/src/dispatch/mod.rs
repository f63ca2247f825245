//! Command dispatch over the serial transport.
//!
//! One decision, one byte, fire-and-forget. The dispatcher owns the link
//! for the process lifetime and guarantees the release sequence on every
//! exit path: send the stop byte, give the controller time to act on it,
//! close the port. [`Dispatcher::shutdown`] is idempotent and also runs
//! from `Drop` as a last resort, so an early return or a panic unwinding
//! through the caller still halts the vehicle.

pub mod serial;

pub use serial::SerialLink;

use std::time::Duration;

use tracing::{info, warn};

use crate::vocab::Vocabulary;

/// Contract for the byte transport to the motor controller.
pub trait CommandLink: Send {
    /// Blocking write of one protocol byte.
    fn send(&mut self, code: u8) -> crate::error::Result<()>;
}

/// How long the controller gets to act on the stop byte before the port
/// closes underneath it.
const SHUTDOWN_SETTLE: Duration = Duration::from_millis(500);

/// What happened to one decision at the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The decision's byte went out.
    Sent(u8),
    /// No decision this cycle; nothing written.
    NoDecision,
    /// No link is connected; reported, not an error.
    NotConnected,
    /// The write failed; the loop carries on.
    Failed,
}

pub struct Dispatcher {
    link: Option<Box<dyn CommandLink>>,
    stop_code: u8,
    shut_down: bool,
}

impl Dispatcher {
    /// `link` may be absent: decisions are then reported but not sent,
    /// which is how bench runs without hardware work.
    pub fn new(link: Option<Box<dyn CommandLink>>, stop_code: u8) -> Self {
        Self {
            link,
            stop_code,
            shut_down: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Map a decision to its wire code and write it.
    pub fn dispatch(&mut self, decision: Option<usize>, vocab: &Vocabulary) -> DispatchOutcome {
        let Some(index) = decision else {
            return DispatchOutcome::NoDecision;
        };
        let Some(code) = vocab.code(index) else {
            warn!(index, "decision index outside the vocabulary, dropping");
            return DispatchOutcome::Failed;
        };
        let Some(link) = self.link.as_mut() else {
            info!(code = %(code as char), "no transport connected, command not sent");
            return DispatchOutcome::NotConnected;
        };
        match link.send(code) {
            Ok(()) => {
                info!(code = %(code as char), "command byte sent");
                DispatchOutcome::Sent(code)
            }
            Err(e) => {
                warn!(error = %e, "transport write failed, continuing");
                DispatchOutcome::Failed
            }
        }
    }

    /// Send the stop command, wait for the controller, release the link.
    ///
    /// Safe to call any number of times; only the first does anything.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(mut link) = self.link.take() {
            match link.send(self.stop_code) {
                Ok(()) => info!(code = %(self.stop_code as char), "stop command sent, closing transport"),
                Err(e) => warn!(error = %e, "could not send the stop command during shutdown"),
            }
            std::thread::sleep(SHUTDOWN_SETTLE);
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoxdriveError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        fn bytes(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl CommandLink for SharedSink {
        fn send(&mut self, code: u8) -> crate::error::Result<()> {
            self.0.lock().unwrap().push(code);
            Ok(())
        }
    }

    struct FailingLink;

    impl CommandLink for FailingLink {
        fn send(&mut self, _code: u8) -> crate::error::Result<()> {
            Err(VoxdriveError::Serial("synthetic write failure".into()))
        }
    }

    #[test]
    fn a_decision_becomes_exactly_one_byte() {
        let sink = SharedSink::default();
        let vocab = Vocabulary::default();
        let mut dispatcher = Dispatcher::new(Some(Box::new(sink.clone())), vocab.stop_code());

        let outcome = dispatcher.dispatch(Some(0), &vocab);
        assert_eq!(outcome, DispatchOutcome::Sent(b'0'));
        assert_eq!(sink.bytes(), vec![b'0']);
    }

    #[test]
    fn no_decision_writes_nothing() {
        let sink = SharedSink::default();
        let vocab = Vocabulary::default();
        let mut dispatcher = Dispatcher::new(Some(Box::new(sink.clone())), vocab.stop_code());

        assert_eq!(dispatcher.dispatch(None, &vocab), DispatchOutcome::NoDecision);
        assert!(sink.bytes().is_empty());
    }

    #[test]
    fn absent_link_reports_without_failing() {
        let vocab = Vocabulary::default();
        let mut dispatcher = Dispatcher::new(None, vocab.stop_code());
        assert!(!dispatcher.is_connected());
        assert_eq!(dispatcher.dispatch(Some(2), &vocab), DispatchOutcome::NotConnected);
    }

    #[test]
    fn write_failure_does_not_poison_the_dispatcher() {
        let vocab = Vocabulary::default();
        let mut dispatcher = Dispatcher::new(Some(Box::new(FailingLink)), vocab.stop_code());
        assert_eq!(dispatcher.dispatch(Some(1), &vocab), DispatchOutcome::Failed);
        // The next cycle proceeds normally.
        assert_eq!(dispatcher.dispatch(None, &vocab), DispatchOutcome::NoDecision);
    }

    #[test]
    fn shutdown_sends_the_stop_byte_exactly_once() {
        let sink = SharedSink::default();
        let vocab = Vocabulary::default();
        let mut dispatcher = Dispatcher::new(Some(Box::new(sink.clone())), vocab.stop_code());

        dispatcher.shutdown();
        dispatcher.shutdown();
        assert_eq!(sink.bytes(), vec![b'4']);
        // After release the transport is gone.
        assert_eq!(dispatcher.dispatch(Some(0), &vocab), DispatchOutcome::NotConnected);
    }

    #[test]
    fn dropping_the_dispatcher_halts_the_vehicle() {
        let sink = SharedSink::default();
        let vocab = Vocabulary::default();
        {
            let mut dispatcher = Dispatcher::new(Some(Box::new(sink.clone())), vocab.stop_code());
            dispatcher.dispatch(Some(0), &vocab);
        }
        assert_eq!(sink.bytes(), vec![b'0', b'4']);
    }
}
