/// Cell id generator
/// Produces ids of the form `prefix + counter + postfix`, e.g. "c12" or "7".
/// The counter only moves forward: numeric ids seen on insertion push it past
/// themselves so generated ids never repeat one that was ever in use.

#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    prefix: String,
    postfix: String,
    /// Counter for next ID
    next_id: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_affixes(prefix: impl Into<String>, postfix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            postfix: postfix.into(),
            next_id: 0,
        }
    }

    /// Generate the next ID
    pub fn next(&mut self) -> String {
        let id = format!("{}{}{}", self.prefix, self.next_id, self.postfix);
        self.next_id += 1;
        id
    }

    /// Advance the counter past a purely numeric id
    pub fn observe(&mut self, id: &str) {
        if let Some(n) = Self::decode(id) {
            self.next_id = self.next_id.max(n.saturating_add(1));
        }
    }

    /// Restart numbering, used when the whole tree is replaced
    pub fn reset(&mut self) {
        self.next_id = 0;
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Decode a numeric ID back to its counter value
    fn decode(id: &str) -> Option<u64> {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        id.parse().ok()
    }
}
