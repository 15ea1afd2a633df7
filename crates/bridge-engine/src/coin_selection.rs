//! Input selection for releases.

use hydra_bridge_primitives::types::Utxo;

use crate::errors::BridgeError;

/// Picks outputs largest first until their lovelace covers `target`.
///
/// Outputs holding native assets are skipped so releases never move tokens out of the treasury.
pub fn select_largest_first(utxos: &[Utxo], target: u64) -> Result<Vec<Utxo>, BridgeError> {
    let mut candidates: Vec<&Utxo> = utxos
        .iter()
        .filter(|utxo| utxo.output.is_lovelace_only())
        .collect();
    candidates.sort_by(|a, b| {
        b.output
            .lovelace()
            .cmp(&a.output.lovelace())
            .then_with(|| a.input.cmp(&b.input))
    });

    let mut selected = Vec::new();
    let mut total = 0u64;
    for utxo in candidates {
        if total >= target {
            break;
        }
        total = total.saturating_add(utxo.output.lovelace());
        selected.push(utxo.clone());
    }

    if total < target {
        return Err(BridgeError::InsufficientFunds {
            needed: target,
            available: total,
        });
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use hydra_bridge_primitives::types::{Asset, TxIn, TxOut};

    use super::*;

    fn utxo(index: u32, lovelace: u64) -> Utxo {
        Utxo {
            input: TxIn::new("aa", index),
            output: TxOut::new("treasury", vec![Asset::lovelace(lovelace)]),
        }
    }

    fn indices(selected: &[Utxo]) -> Vec<u32> {
        selected.iter().map(|u| u.input.output_index).collect()
    }

    #[test]
    fn takes_the_largest_outputs_first() {
        let utxos = vec![utxo(0, 2), utxo(1, 10), utxo(2, 5), utxo(3, 7)];

        assert_eq!(indices(&select_largest_first(&utxos, 9).unwrap()), vec![1]);
        assert_eq!(indices(&select_largest_first(&utxos, 11).unwrap()), vec![1, 3]);
        assert_eq!(
            indices(&select_largest_first(&utxos, 24).unwrap()),
            vec![1, 3, 2, 0]
        );
    }

    #[test]
    fn skips_outputs_holding_tokens() {
        let mut with_token = utxo(0, 100);
        with_token.output.amount.push(Asset::new("ff".repeat(28), 1));
        let utxos = vec![with_token, utxo(1, 3)];

        assert_eq!(indices(&select_largest_first(&utxos, 3).unwrap()), vec![1]);
        assert!(matches!(
            select_largest_first(&utxos, 4),
            Err(BridgeError::InsufficientFunds {
                needed: 4,
                available: 3
            })
        ));
    }
}
