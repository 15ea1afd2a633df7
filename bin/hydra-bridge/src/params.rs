use hydra_bridge_engine::config::{WrappedAsset, DEFAULT_MINT_OUTPUTS};
use hydra_bridge_primitives::address::Network;
use hydra_head_engine::config::DEFAULT_CONTESTATION_PERIOD;
use serde::{Deserialize, Serialize};

/// The parameters every party to the bridge must agree on.
///
/// A node running with different params derives different addresses, mints a different asset or
/// withholds a different fee, so its operations will not match those of the rest of the
/// deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Params {
    /// The network the bridge operates on.
    pub network: Network,

    /// The asset minted in the head for bridged lovelace.
    pub wrapped: WrappedAsset,

    /// Lovelace withheld from every release.
    pub bridge_fee: u64,

    /// Contestation period of heads we initialize, in seconds.
    #[serde(default = "default_contestation_period")]
    pub contestation_period: u64,

    /// Lovelace outputs paid to the recipient alongside every mint.
    #[serde(default = "default_mint_outputs")]
    pub mint_outputs: Vec<u64>,
}

const fn default_contestation_period() -> u64 {
    DEFAULT_CONTESTATION_PERIOD
}

fn default_mint_outputs() -> Vec<u64> {
    DEFAULT_MINT_OUTPUTS.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_serde_toml() {
        let params = r#"
            network = "testnet"
            bridge_fee = 1000000

            [wrapped]
            policy_id = "d47ea75b975baa070978b1acd882029d2f95541d678d06bd63b4b9aa"
            asset_name = "48796472414441"
        "#;

        let params = toml::from_str::<Params>(params);
        assert!(
            params.is_ok(),
            "must be able to deserialize params from toml but got: {}",
            params.unwrap_err()
        );

        let params = params.unwrap();
        assert_eq!(params.network, Network::Testnet);
        assert_eq!(params.contestation_period, DEFAULT_CONTESTATION_PERIOD);
        assert_eq!(params.mint_outputs, DEFAULT_MINT_OUTPUTS.to_vec());

        let serialized = toml::to_string(&params).unwrap();
        let deserialized = toml::from_str::<Params>(&serialized).unwrap();
        assert_eq!(
            deserialized, params,
            "must be able to serialize and deserialize params to toml"
        );
    }
}
