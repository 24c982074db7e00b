/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Sequence number management.
//!
//! Both counters only move forward. Lowering either one through a reset is a
//! protocol violation reported as [`SessionError::SequenceResetDecrement`].
//! Counters saturate at `u64::MAX`.

use fixline_core::error::SessionError;

/// Next-to-send and next-expected sequence numbers of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceManager {
    /// Next outgoing sequence number.
    next_outgoing: u64,
    /// Next expected incoming sequence number.
    next_incoming: u64,
}

impl SequenceManager {
    /// Creates a sequence manager with the given starting values.
    ///
    /// # Arguments
    /// * `outgoing` - Initial outgoing sequence number
    /// * `incoming` - Initial expected incoming sequence number
    #[must_use]
    pub const fn new(outgoing: u64, incoming: u64) -> Self {
        Self {
            next_outgoing: outgoing,
            next_incoming: incoming,
        }
    }

    /// Returns the next outgoing sequence number without incrementing.
    #[inline]
    #[must_use]
    pub const fn next_outgoing(&self) -> u64 {
        self.next_outgoing
    }

    /// Returns the next expected incoming sequence number.
    #[inline]
    #[must_use]
    pub const fn next_incoming(&self) -> u64 {
        self.next_incoming
    }

    /// Allocates and returns the next outgoing sequence number.
    #[inline]
    pub fn allocate_outgoing(&mut self) -> u64 {
        let seq = self.next_outgoing;
        self.next_outgoing = self.next_outgoing.saturating_add(1);
        seq
    }

    /// Advances the expected incoming sequence number by one.
    #[inline]
    pub fn increment_incoming(&mut self) {
        self.next_incoming = self.next_incoming.saturating_add(1);
    }

    /// Moves the expected incoming sequence number to `new_seq`.
    ///
    /// # Errors
    /// Returns `SessionError::SequenceResetDecrement` if `new_seq` is lower
    /// than the current value; the counter is left untouched.
    pub fn reset_incoming(&mut self, new_seq: u64) -> Result<(), SessionError> {
        if new_seq < self.next_incoming {
            return Err(SessionError::SequenceResetDecrement {
                current: self.next_incoming,
                requested: new_seq,
            });
        }
        self.next_incoming = new_seq;
        Ok(())
    }

    /// Raises the counters to follow the highest persisted sequence numbers.
    ///
    /// Values at or below the current counters are ignored.
    pub fn recover(&mut self, last_outgoing: Option<u64>, last_incoming: Option<u64>) {
        if let Some(seq) = last_outgoing {
            self.next_outgoing = self.next_outgoing.max(seq.saturating_add(1));
        }
        if let Some(seq) = last_incoming {
            self.next_incoming = self.next_incoming.max(seq.saturating_add(1));
        }
    }

    /// Validates an incoming sequence number.
    ///
    /// # Arguments
    /// * `received` - The received sequence number
    #[must_use]
    pub const fn validate_incoming(&self, received: u64) -> SequenceResult {
        let expected = self.next_incoming;

        if received == expected {
            SequenceResult::Ok
        } else if received < expected {
            SequenceResult::TooLow { expected, received }
        } else {
            SequenceResult::Gap { expected, received }
        }
    }
}

impl Default for SequenceManager {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Result of sequence number validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceResult {
    /// Sequence number is as expected.
    Ok,
    /// Sequence number is lower than expected (possible duplicate).
    TooLow {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
    /// Sequence number is higher than expected (gap detected).
    Gap {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
}

impl SequenceResult {
    /// Returns true if the sequence is valid.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns true if there's a gap.
    #[must_use]
    pub const fn is_gap(&self) -> bool {
        matches!(self, Self::Gap { .. })
    }

    /// Returns true if the sequence is too low.
    #[must_use]
    pub const fn is_too_low(&self) -> bool {
        matches!(self, Self::TooLow { .. })
    }
}
