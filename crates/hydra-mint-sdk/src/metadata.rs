//! CIP-25 (label 721) metadata for minted NFTs.

use serde_json::{json, Map, Value};

pub const NFT_METADATA_LABEL: &str = "721";
pub const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// Build the `{"721": {policy: {name: {...}}}}` document for one batch
pub fn nft_metadata(policy_id: &str, asset_names: &[String], image_uri: &str) -> Value {
    let assets: Map<String, Value> = asset_names
        .iter()
        .map(|name| {
            (
                name.clone(),
                json!({
                    "name": name,
                    "image": image_uri,
                    "mediaType": DEFAULT_MEDIA_TYPE,
                }),
            )
        })
        .collect();

    json!({ NFT_METADATA_LABEL: { policy_id: assets } })
}
