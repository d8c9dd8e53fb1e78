//! Queued shift commands.
//!
//! Clients and reactive event handlers push commands here; the shift drains
//! the queue at the start of the next step so every mutation lands on a
//! tick boundary.

use crate::id::{IngredientId, TrayId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Buy stock with wallet money.
    Purchase { ingredient: IngredientId, quantity: u32 },
    /// Add stock for free (rewards, tooling).
    Restock { ingredient: IngredientId, quantity: u32 },
    OpenStore,
    CloseStore,
    Deliver { tray: TrayId },
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// Executed commands: (tick, command).
    history: Vec<(u64, Command)>,
    /// 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Take every pending command in submission order, recording them in
    /// history under `tick`.
    pub fn drain(&mut self, tick: u64) -> Vec<Command> {
        let commands = std::mem::take(&mut self.pending);

        if self.max_history > 0 {
            self.history
                .extend(commands.iter().cloned().map(|cmd| (tick, cmd)));
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(u64, Command)] {
        &self.history
    }

    /// Drop pending commands without running them (restart).
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase(n: u32) -> Command {
        Command::Purchase {
            ingredient: IngredientId(0),
            quantity: n,
        }
    }

    #[test]
    fn drain_preserves_submission_order() {
        let mut queue = CommandQueue::new();
        queue.push(Command::OpenStore);
        queue.push_batch([purchase(1), Command::CloseStore]);
        assert_eq!(queue.pending_count(), 3);

        let drained = queue.drain(0);
        assert_eq!(drained, vec![Command::OpenStore, purchase(1), Command::CloseStore]);
        assert!(queue.is_empty());
    }

    #[test]
    fn no_history_by_default() {
        let mut queue = CommandQueue::new();
        queue.push(Command::OpenStore);
        queue.drain(4);
        assert!(queue.history().is_empty());
    }

    #[test]
    fn history_is_trimmed_to_limit() {
        let mut queue = CommandQueue::with_max_history(2);
        for tick in 0..4 {
            queue.push(purchase(tick as u32));
            queue.drain(tick);
        }
        let history = queue.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], (2, purchase(2)));
        assert_eq!(history[1], (3, purchase(3)));
    }

    #[test]
    fn clear_pending_discards_without_history() {
        let mut queue = CommandQueue::with_max_history(8);
        queue.push(Command::CloseStore);
        queue.clear_pending();
        assert!(queue.drain(1).is_empty());
        assert!(queue.history().is_empty());
    }
}
