//! Error payload produced when a panic is caught at a Result boundary.

use std::any::Any;

use thiserror::Error;

/// A panic captured by one of the catching constructors
/// (`from_execution`, `map_catch_error`, `from_promise`).
///
/// Domain error enums that travel through those constructors implement
/// `From<Panicked>` so the caught panic lands in their own error channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("computation panicked: {message}")]
pub struct Panicked {
    message: String,
}

impl Panicked {
    /// Creates a new `Panicked` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a `Panicked` from the payload returned by `catch_unwind`.
    ///
    /// `panic!` payloads are either a `&'static str` or a `String`; anything
    /// else is reported generically.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<String>() {
            Ok(message) => Self { message: *message },
            Err(payload) => Self::describe(&*payload),
        }
    }

    /// Like [`Panicked::from_payload`], leaving the payload to the caller so
    /// the panic can be resumed afterwards.
    pub(crate) fn describe(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| {
                payload
                    .downcast_ref::<&'static str>()
                    .map(|message| (*message).to_string())
            })
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message }
    }

    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_payload() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(Panicked::from_payload(payload).message(), "boom");
    }

    #[test]
    fn test_from_string_payload() {
        let code = 42;
        let payload = std::panic::catch_unwind(|| panic!("failed with {code}")).unwrap_err();
        assert_eq!(Panicked::from_payload(payload).message(), "failed with 42");
    }

    #[test]
    fn test_from_opaque_payload() {
        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert_eq!(
            Panicked::from_payload(payload).message(),
            "non-string panic payload"
        );
    }

    #[test]
    fn test_describe_leaves_payload_usable() {
        let payload = std::panic::catch_unwind(|| panic!("kept")).unwrap_err();
        assert_eq!(Panicked::describe(&*payload).message(), "kept");
        assert_eq!(Panicked::from_payload(payload).message(), "kept");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Panicked::new("oops").to_string(),
            "computation panicked: oops"
        );
    }
}
