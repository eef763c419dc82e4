use midir::SendError;

/// A message taken off an input, with the backend's timestamp when it
/// provided one (microseconds, arbitrary origin).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub stamp: Option<u64>,
    pub bytes: Vec<u8>,
}

/// The sending half of a loopback.
pub trait MessageSink {
    fn send(&mut self, message: &[u8]) -> Result<(), SendError>;
}

/// The receiving half of a loopback. Never blocks.
pub trait MessageSource {
    /// Next available message, or `None` if nothing is waiting.
    fn get_message(&mut self) -> Option<Incoming>;

    /// Messages lost before they could be fetched.
    fn dropped(&self) -> usize {
        0
    }
}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn send(&mut self, message: &[u8]) -> Result<(), SendError> {
        (**self).send(message)
    }
}

impl<S: MessageSource + ?Sized> MessageSource for &mut S {
    fn get_message(&mut self) -> Option<Incoming> {
        (**self).get_message()
    }

    fn dropped(&self) -> usize {
        (**self).dropped()
    }
}
