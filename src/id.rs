/// Monotonic ID generator for engine-created records.
///
/// Convoys, listings, market transactions, scheduled attacks and news items all
/// draw from the same sequence, so an id is unique across record types. Player
/// ids are not generated here: they are the identity supplied by the front end.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Resume a sequence after restoring a snapshot.
    pub fn starting_from(start: u64) -> Self {
        Self { next: start.max(1) }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call to `next_id` will hand out.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
