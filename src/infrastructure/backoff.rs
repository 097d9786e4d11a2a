use crate::types::{RECONNECT_INTERVALS, Result, SocketError};
use std::time::Duration;

/// Reconnect delay table.
///
/// Intervals must be non-decreasing so that repeated failures never retry faster
/// than earlier ones. Attempts past the end of the table reuse its last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    intervals: Vec<u64>,
}

impl Backoff {
    pub fn new(intervals: Vec<u64>) -> Result<Self> {
        if intervals.is_empty() {
            return Err(SocketError::InvalidConfig(
                "reconnect intervals must not be empty".to_string(),
            ));
        }
        if intervals.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(SocketError::InvalidConfig(format!(
                "reconnect intervals must be non-decreasing, got {:?}",
                intervals
            )));
        }
        Ok(Self { intervals })
    }

    /// Delay to wait before the retry that follows `attempt` consecutive failures.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt.saturating_sub(1) as usize).min(self.intervals.len() - 1);
        Duration::from_millis(self.intervals[index])
    }

    pub fn intervals(&self) -> &[u64] {
        &self.intervals
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            intervals: RECONNECT_INTERVALS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delays() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay_for(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(5000));
        assert_eq!(backoff.delay_for(9), Duration::from_millis(5000));
    }

    #[test]
    fn test_delays_never_decrease() {
        let backoff = Backoff::default();
        let delays: Vec<_> = (0..12).map(|attempt| backoff.delay_for(attempt)).collect();
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_rejects_decreasing_table() {
        let err = Backoff::new(vec![1000, 500]).unwrap_err();
        assert!(matches!(err, SocketError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_empty_table() {
        assert!(Backoff::new(Vec::new()).is_err());
    }
}
