use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum ScopeError {
    /// `read_latest` asked for more samples than the buffer holds.
    OutOfRange { requested: usize, capacity: usize },
    ZeroCapacity,
    InvalidSampleRate(f64),
    InvalidTiming { duration: f64, interval: f64 },
    AlreadyRunning,
    Spawn(String),
    /// The generation thread exited by panicking; carries the panic message.
    GeneratorPanicked(String),
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::OutOfRange {
                requested,
                capacity,
            } => write!(
                f,
                "requested {requested} samples from a buffer of capacity {capacity}"
            ),
            ScopeError::ZeroCapacity => write!(f, "buffer capacity must be positive"),
            ScopeError::InvalidSampleRate(rate) => {
                write!(f, "sample rate must be a positive number, got {rate}")
            }
            ScopeError::InvalidTiming { duration, interval } => write!(
                f,
                "duration and interval must be positive, got duration={duration} interval={interval}"
            ),
            ScopeError::AlreadyRunning => write!(f, "generator is already running"),
            ScopeError::Spawn(msg) => write!(f, "could not spawn generator thread: {msg}"),
            ScopeError::GeneratorPanicked(msg) => write!(f, "generator thread panicked: {msg}"),
        }
    }
}

impl std::error::Error for ScopeError {}

pub type Result<T> = std::result::Result<T, ScopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_both_sizes() {
        let err = ScopeError::OutOfRange {
            requested: 5,
            capacity: 4,
        };
        assert_eq!(
            err.to_string(),
            "requested 5 samples from a buffer of capacity 4"
        );
    }
}
