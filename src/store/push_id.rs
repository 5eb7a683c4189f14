//! Push keys
//!
//! 20-character keys: 8 characters of millisecond timestamp followed by 12
//! random characters, drawn from a 64-character alphabet whose byte order
//! matches its value order. Keys therefore sort by creation time. Keys made
//! within the same millisecond increment the random part instead of
//! re-rolling it, so they still sort in generation order.

use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIMESTAMP_LEN: usize = 8;
const RANDOM_LEN: usize = 12;

/// Length of every generated key
pub const PUSH_ID_LEN: usize = TIMESTAMP_LEN + RANDOM_LEN;

#[derive(Debug, Default)]
struct PushIdState {
    last_timestamp: i64,
    last_random: [u8; RANDOM_LEN],
}

/// Generator of chronologically sortable, collision-resistant keys
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<PushIdState>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next key for the current time
    pub fn next_id(&self) -> String {
        self.next_id_at(Utc::now().timestamp_millis())
    }

    fn next_id_at(&self, now_millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // A clock stepping backwards must not break ordering
        let timestamp = now_millis.max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            increment(&mut state.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for slot in state.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }
        state.last_timestamp = timestamp;

        let mut id = [0u8; PUSH_ID_LEN];
        let mut remaining = timestamp.max(0) as u64;
        for slot in id[..TIMESTAMP_LEN].iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        for (slot, value) in id[TIMESTAMP_LEN..].iter_mut().zip(state.last_random.iter()) {
            *slot = PUSH_CHARS[*value as usize];
        }

        id.iter().map(|b| *b as char).collect()
    }
}

/// Add one to a base-64 digit string, carrying leftwards
fn increment(digits: &mut [u8; RANDOM_LEN]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
