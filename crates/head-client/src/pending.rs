//! Correlation of outgoing commands with their eventual responses.
//!
//! Entries are keyed by `(CommandKind, Option<id>)`. Registering a key that is already in flight
//! does not create a second request; the caller is attached to the existing one instead, and every
//! attached caller receives a clone of the same outcome.

use std::collections::HashMap;

use hydra_bridge_primitives::types::UtxoSet;
use tokio::sync::oneshot;

use crate::errors::Rejection;

/// The kinds of command that expect a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `Init`, answered by `HeadIsInitializing`.
    Init,

    /// `NewTx`, answered by `TxValid` or `TxInvalid`.
    NewTx,

    /// `GetUTxO`, answered by `GetUTxOResponse`.
    GetUtxo,
}

impl CommandKind {
    /// Maps the tag echoed by `CommandFailed` back to a command kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Init" => Some(CommandKind::Init),
            "NewTx" => Some(CommandKind::NewTx),
            "GetUTxO" => Some(CommandKind::GetUtxo),
            _ => None,
        }
    }
}

/// Successful outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The head started initializing.
    Initializing,

    /// The transaction with this hash was applied.
    TxValid(String),

    /// The node's current UTxO set.
    Utxos(UtxoSet),
}

/// Outcome delivered to every waiter of a command.
pub type Outcome = Result<Resolution, Rejection>;

type Key = (CommandKind, Option<String>);

/// Table of in-flight commands.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<Key, Vec<oneshot::Sender<Outcome>>>,
}

impl PendingTable {
    /// Attaches a waiter to `(kind, id)`.
    ///
    /// Returns the waiter's receiver and whether this call created the entry, in which case the
    /// caller is responsible for actually sending the command.
    pub fn register(
        &mut self,
        kind: CommandKind,
        id: Option<String>,
    ) -> (oneshot::Receiver<Outcome>, bool) {
        let (send, recv) = oneshot::channel();
        let waiters = self.entries.entry((kind, id)).or_default();
        let is_new = waiters.is_empty();
        waiters.push(send);
        (recv, is_new)
    }

    /// Completes the entry for `(kind, id)` with `outcome`. Returns how many waiters were notified.
    pub fn complete(&mut self, kind: CommandKind, id: Option<&str>, outcome: Outcome) -> usize {
        let Some(waiters) = self.entries.remove(&(kind, id.map(str::to_string))) else {
            return 0;
        };

        let count = waiters.len();
        for waiter in waiters {
            // A waiter that stopped listening is not an error.
            let _ = waiter.send(outcome.clone());
        }
        count
    }

    /// Rejects every entry of `kind`, whatever its id. Returns how many waiters were notified.
    pub fn reject_kind(&mut self, kind: CommandKind, rejection: Rejection) -> usize {
        let keys: Vec<Key> = self
            .entries
            .keys()
            .filter(|(k, _)| *k == kind)
            .cloned()
            .collect();

        keys.into_iter()
            .map(|(k, id)| self.complete(k, id.as_deref(), Err(rejection.clone())))
            .sum()
    }

    /// Whether `(kind, id)` is in flight.
    pub fn contains(&self, kind: CommandKind, id: Option<&str>) -> bool {
        self.entries.contains_key(&(kind, id.map(str::to_string)))
    }

    /// Number of distinct in-flight commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_registration_shares_the_first() {
        let mut table = PendingTable::default();
        let (a, a_new) = table.register(CommandKind::NewTx, Some("h".into()));
        let (b, b_new) = table.register(CommandKind::NewTx, Some("h".into()));
        assert!(a_new);
        assert!(!b_new);
        assert_eq!(table.len(), 1);

        let notified = table.complete(
            CommandKind::NewTx,
            Some("h"),
            Ok(Resolution::TxValid("h".into())),
        );
        assert_eq!(notified, 2);
        assert!(table.is_empty());

        assert_eq!(a.await.unwrap(), Ok(Resolution::TxValid("h".into())));
        assert_eq!(b.await.unwrap(), Ok(Resolution::TxValid("h".into())));
    }

    #[test]
    fn completion_does_not_double_resolve() {
        let mut table = PendingTable::default();
        let _rx = table.register(CommandKind::Init, None);

        assert_eq!(
            table.complete(CommandKind::Init, None, Ok(Resolution::Initializing)),
            1
        );
        assert_eq!(
            table.complete(CommandKind::Init, None, Ok(Resolution::Initializing)),
            0
        );
    }

    #[test]
    fn ids_are_matched_exactly() {
        let mut table = PendingTable::default();
        let _rx = table.register(CommandKind::NewTx, Some("a".into()));

        assert_eq!(
            table.complete(
                CommandKind::NewTx,
                Some("b"),
                Ok(Resolution::TxValid("b".into()))
            ),
            0
        );
        assert!(table.contains(CommandKind::NewTx, Some("a")));
    }

    #[tokio::test]
    async fn reject_kind_ignores_ids_and_other_kinds() {
        let mut table = PendingTable::default();
        let (a, _) = table.register(CommandKind::NewTx, Some("a".into()));
        let (b, _) = table.register(CommandKind::NewTx, Some("b".into()));
        let (_init, _) = table.register(CommandKind::Init, None);

        let rejection = Rejection::CommandFailed {
            tag: "NewTx".into(),
            detail: "{}".into(),
        };
        assert_eq!(table.reject_kind(CommandKind::NewTx, rejection.clone()), 2);
        assert_eq!(table.len(), 1);

        assert_eq!(a.await.unwrap(), Err(rejection.clone()));
        assert_eq!(b.await.unwrap(), Err(rejection));
    }

    #[test]
    fn maps_failed_command_tags() {
        assert_eq!(CommandKind::from_tag("GetUTxO"), Some(CommandKind::GetUtxo));
        assert_eq!(CommandKind::from_tag("Close"), None);
    }
}
