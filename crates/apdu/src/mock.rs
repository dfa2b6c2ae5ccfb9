//! Test doubles for transports and randomness

use std::collections::VecDeque;

use bytes::Bytes;

use crate::{CardTransport, RandomSource, TransportError};

/// Transport replaying scripted responses and recording every command
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: VecDeque<Bytes>,
    sent: Vec<Bytes>,
    resets: usize,
}

impl MockTransport {
    /// Create a transport answering with `responses` in order
    pub fn with_responses<I, B>(responses: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self {
            responses: responses
                .into_iter()
                .map(|r| Bytes::copy_from_slice(r.as_ref()))
                .collect(),
            ..Default::default()
        }
    }

    /// Queue another response
    pub fn push_response(&mut self, response: impl AsRef<[u8]>) {
        self.responses
            .push_back(Bytes::copy_from_slice(response.as_ref()));
    }

    /// Commands transmitted so far
    pub fn sent(&self) -> &[Bytes] {
        &self.sent
    }

    /// Number of scripted responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.responses.len()
    }

    /// Number of resets requested
    pub const fn resets(&self) -> usize {
        self.resets
    }
}

impl CardTransport for MockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.sent.push(Bytes::copy_from_slice(command));
        self.responses
            .pop_front()
            .ok_or_else(|| TransportError::Transmission("no scripted response left".into()))
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.resets += 1;
        Ok(())
    }
}

/// Deterministic randomness: a counter starting at a seed byte
#[derive(Debug, Clone)]
pub struct StaticRandom {
    next: u8,
}

impl StaticRandom {
    /// Start the sequence at `seed`
    pub const fn new(seed: u8) -> Self {
        Self { next: seed }
    }
}

impl Default for StaticRandom {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RandomSource for StaticRandom {
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest {
            *byte = self.next;
            self.next = self.next.wrapping_add(1);
        }
    }
}

/// Randomness replaying a fixed script, then falling back to a counter
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    script: VecDeque<u8>,
    fallback: StaticRandom,
}

impl ScriptedRandom {
    /// Replay `bytes` before generating counter bytes
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            script: bytes.as_ref().iter().copied().collect(),
            fallback: StaticRandom::default(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest {
            match self.script.pop_front() {
                Some(b) => *byte = b,
                None => self.fallback.fill_bytes(std::slice::from_mut(byte)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_transport_records() {
        let mut transport = MockTransport::with_responses([[0x90, 0x00]]);
        assert_eq!(transport.transmit_raw(&[0x00, 0xA4]).unwrap().as_ref(), &[0x90, 0x00]);
        assert!(transport.transmit_raw(&[0x00]).is_err());
        assert_eq!(transport.sent().len(), 2);
    }

    #[test]
    fn test_scripted_random() {
        let mut rng = ScriptedRandom::new([0xAA, 0xBB]);
        assert_eq!(rng.random_bytes(4), vec![0xAA, 0xBB, 0x01, 0x02]);
    }
}
