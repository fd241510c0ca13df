/*!
# Hydra Mint Testing

Fixtures for exercising the Head client and the mint pipeline without a
node, a chain or `cardano-cli`:

- [`MockHeadNode`]: scripted node behind an in-memory transport
- [`StaticQueryApi`]: fixed snapshot and commit-draft side channel
- [`RecordingBuilder`]: deterministic transaction builder that records calls
- [`TestFixture`]: all of the above, connected
*/

mod mock_builder;
mod mock_node;
mod static_query;
mod test_fixture;

pub use mock_builder::{tx_id_for, BuilderCall, RecordingBuilder};
pub use mock_node::{MockHeadNode, MockNodeHandle, Verdict};
pub use static_query::StaticQueryApi;
pub use test_fixture::{TestFixture, MOCK_HEAD_URL};

use hydra_mint_sdk::{AssetId, Coin, TxIn, TxOut, Value};

/// Standard test constants
pub const TEST_POLICY_ID: &str = "b7d525b149829894aa5fa73087d7758c2163c55520c8715652cb8515";
pub const TEST_ADDRESS: &str = "addr_test1vrmintfuelowner0000000000000000000000000000000000";

/// A pure-lovelace coin owned by [`TEST_ADDRESS`]
pub fn test_coin(seed: u8, index: u32, lovelace: u64) -> Coin {
    Coin::new(
        TxIn::new(format!("{seed:02x}").repeat(32), index),
        TxOut::new(TEST_ADDRESS, Value::lovelace(lovelace)),
    )
}

/// A coin owned by [`TEST_ADDRESS`] that also holds one unit of
/// `asset_name` under [`TEST_POLICY_ID`]
pub fn test_asset_coin(seed: u8, index: u32, lovelace: u64, asset_name: &str) -> Coin {
    let mut value = Value::lovelace(lovelace);
    value.add_asset(&AssetId::new(TEST_POLICY_ID, asset_name), 1);
    Coin::new(
        TxIn::new(format!("{seed:02x}").repeat(32), index),
        TxOut::new(TEST_ADDRESS, value),
    )
}
