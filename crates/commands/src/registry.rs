use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::debug;

use crate::command::Command;

/// Name-keyed command table. Registering a name twice keeps the later command.
///
/// Lookups return owned `Arc`s so no lock is held while a command runs.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<dyn Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C>(&self, command: C) -> Option<Arc<dyn Command>>
    where
        C: Command + 'static,
    {
        self.register_shared(Arc::new(command))
    }

    pub fn register_shared(&self, command: Arc<dyn Command>) -> Option<Arc<dyn Command>> {
        let name = command.name().to_owned();
        let replaced = self
            .commands
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), command);
        if replaced.is_some() {
            debug!(command = %name, "replaced previously registered command");
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.commands.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of `(name, help)` pairs in the map's iteration order, which is
    /// arbitrary.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|command| (command.name().to_owned(), command.help().to_owned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::CommandRegistry;
    use crate::test_support::StaticCommand;

    #[test]
    fn duplicate_registration_keeps_the_last_command() {
        let registry = CommandRegistry::new();
        assert!(registry.register(StaticCommand::new("stocks", "first")).is_none());

        let replaced = registry.register(StaticCommand::new("stocks", "second"));

        assert_eq!(replaced.map(|command| command.help().to_owned()).as_deref(), Some("first"));
        assert_eq!(registry.len(), 1);
        let current = registry.get("stocks").expect("registered");
        assert_eq!(current.help(), "second");
        assert_eq!(registry.describe(), vec![("stocks".to_owned(), "second".to_owned())]);
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let registry = CommandRegistry::new();
        registry.register(StaticCommand::new("help", "this"));

        assert!(registry.get("help").is_some());
        assert!(registry.get("HELP").is_none());
        assert!(registry.get("hel").is_none());
        assert!(!registry.is_empty());
    }
}
