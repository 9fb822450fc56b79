//! Query Forwarder: scans a floating shell's output for Device Attribute
//! and Device Status Report queries, replays them verbatim to the user
//! terminal, and arms a one-shot flag so the next matching stdin response
//! is rerouted to that floating PTY instead of being read as a keystroke.
//! `spec.md` §4.F.
//!
//! No direct precedent for DA/DSR forwarding exists in the teacher corpus;
//! the byte-scanning shape follows `agent/notification.rs`'s OSC scanner
//! (walk the buffer, recognize a fixed escape prefix, act, skip past it).

/// Recognized DA/DSR query sequences, forwarded byte-for-byte (`spec.md`
/// §4.F). Order matters only in that longer prefixes must be checked before
/// their shorter counterparts where one is a prefix of another.
const QUERIES: &[&[u8]] = &[
    b"\x1b[c",
    b"\x1b[0c",
    b"\x1b[>c",
    b"\x1b[>0c",
    b"\x1b[5n",
    b"\x1b[6n",
];

/// One-shot router remembering which floating window last issued a query
/// awaiting its terminal response.
#[derive(Debug, Default)]
pub struct QueryForwarder {
    armed: Option<usize>,
}

impl QueryForwarder {
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Scan `data` (floating shell output) for recognized queries. Each
    /// match is appended verbatim to `forwarded` (to be written to the user
    /// terminal) and arms the one-shot flag with `floating_index`.
    pub fn scan(&mut self, data: &[u8], floating_index: usize, forwarded: &mut Vec<u8>) {
        let mut i = 0;
        while i < data.len() {
            if data[i] != 0x1b {
                i += 1;
                continue;
            }
            let mut matched_len = 0;
            for query in QUERIES {
                if data[i..].starts_with(query) && query.len() > matched_len {
                    matched_len = query.len();
                }
            }
            if matched_len > 0 {
                forwarded.extend_from_slice(&data[i..i + matched_len]);
                self.armed = Some(floating_index);
                i += matched_len;
            } else {
                i += 1;
            }
        }
    }

    /// If the one-shot flag is armed and `input` looks like a DA/DSR
    /// response (`ESC [` ..., last byte in `{c, n, R}`, length >= 3),
    /// return the remembered floating window index and clear the flag. The
    /// caller must write `input` to that window's PTY and must not
    /// interpret it as a keystroke.
    pub fn try_claim_response(&mut self, input: &[u8]) -> Option<usize> {
        let armed = self.armed?;
        if looks_like_response(input) {
            self.armed = None;
            Some(armed)
        } else {
            None
        }
    }
}

fn looks_like_response(input: &[u8]) -> bool {
    input.len() >= 3
        && input.starts_with(b"\x1b[")
        && matches!(input.last(), Some(b'c' | b'n' | b'R'))
}
