//! Behaviour every [`OperationDb`] must have.

use hydra_bridge_primitives::{
    operation::{LedgerKind, NewBridgeOperation, OperationState},
    types::Asset,
};

use crate::{errors::DbError, operations::OperationDb};

fn deposit(tx_hash: &str, output_index: u32) -> NewBridgeOperation {
    NewBridgeOperation {
        origin: LedgerKind::Cardano,
        origin_address: "addr_test1sender".into(),
        origin_tx_hash: tx_hash.into(),
        origin_output_index: output_index,
        amount: vec![Asset::lovelace(10_000_000)],
        destination_address: "addr_test1receiver".into(),
    }
}

pub(crate) async fn exercise(db: &impl OperationDb) {
    let created = db
        .create_operation(&deposit("abc", 0))
        .await
        .unwrap()
        .expect("first insert must create");
    assert_eq!(created.state, OperationState::Pending);
    assert_eq!(created.destination, LedgerKind::Hydra);
    assert_eq!(created.amount, vec![Asset::lovelace(10_000_000)]);
    assert_eq!(created.destination_tx_hash, None);

    assert!(
        db.create_operation(&deposit("abc", 0))
            .await
            .unwrap()
            .is_none(),
        "the same origin must not be recorded twice"
    );

    let mut burn = deposit("abc", 0);
    burn.origin = LedgerKind::Hydra;
    let burn = db.create_operation(&burn).await.unwrap().unwrap();
    assert_ne!(burn.id, created.id);
    assert_eq!(burn.destination, LedgerKind::Cardano);

    let second = db
        .create_operation(&deposit("abc", 1))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        db.find_by_origin(LedgerKind::Cardano, "abc", 0)
            .await
            .unwrap(),
        Some(created.clone())
    );
    assert_eq!(
        db.find_by_origin(LedgerKind::Cardano, "abc", 7)
            .await
            .unwrap(),
        None
    );

    let pending: Vec<i64> = db
        .operations_in_state(OperationState::Pending)
        .await
        .unwrap()
        .into_iter()
        .map(|op| op.id)
        .collect();
    assert_eq!(pending, vec![created.id, burn.id, second.id]);

    db.update_state(created.id, OperationState::Processing)
        .await
        .unwrap();
    db.update_state(created.id, OperationState::Submitting)
        .await
        .unwrap();
    let submitted = db.mark_submitted(created.id, "def", 2).await.unwrap();
    assert_eq!(submitted.state, OperationState::Submitted);
    assert_eq!(submitted.destination_tx_hash.as_deref(), Some("def"));
    assert_eq!(submitted.destination_output_index, 2);

    let confirmed = db
        .update_state(created.id, OperationState::Confirmed)
        .await
        .unwrap();
    assert_eq!(
        db.get_operation(created.id).await.unwrap(),
        Some(confirmed)
    );

    let err = db
        .update_state(created.id, OperationState::Failed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidTransition {
            from: OperationState::Confirmed,
            to: OperationState::Failed,
            ..
        }
    ));

    let err = db
        .update_state(second.id, OperationState::Submitted)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidTransition { .. }));

    db.update_state(second.id, OperationState::Processing)
        .await
        .unwrap();
    db.update_state(second.id, OperationState::Failed)
        .await
        .unwrap();
    assert!(db
        .update_state(second.id, OperationState::Pending)
        .await
        .is_err());

    assert!(matches!(
        db.update_state(9_999, OperationState::Processing).await,
        Err(DbError::NotFound(9_999))
    ));
    assert_eq!(db.get_operation(9_999).await.unwrap(), None);
}
