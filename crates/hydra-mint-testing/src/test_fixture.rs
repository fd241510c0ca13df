use crate::{MockHeadNode, MockNodeHandle, RecordingBuilder, StaticQueryApi, TEST_POLICY_ID};
use hydra_mint_batch_tx::{ChainedMintPipeline, MintConfig};
use hydra_mint_client::{ChannelConnector, HeadClient, HeadClientConfig};
use std::sync::Arc;

pub const MOCK_HEAD_URL: &str = "ws://mock-head:4001";

/// A connected client wired to a scripted node, side channel and builder
pub struct TestFixture {
    pub client: HeadClient,
    pub node: MockNodeHandle,
    pub query: Arc<StaticQueryApi>,
    pub builder: Arc<RecordingBuilder>,
}

impl TestFixture {
    pub async fn start(node: MockHeadNode, query: StaticQueryApi, builder: RecordingBuilder) -> Self {
        Self::start_with_config(node, query, builder, HeadClientConfig::new(MOCK_HEAD_URL)).await
    }

    pub async fn start_with_config(
        node: MockHeadNode,
        query: StaticQueryApi,
        builder: RecordingBuilder,
        config: HeadClientConfig,
    ) -> Self {
        let (connector, peer) = ChannelConnector::single();
        let query = Arc::new(query);

        let mut client = HeadClient::with_parts(config, Arc::new(connector), query.clone());
        client
            .connect()
            .await
            .unwrap_or_else(|e| panic!("Failed to connect to the mock node: {e}"));

        Self {
            client,
            node: node.spawn(peer),
            query,
            builder: Arc::new(builder),
        }
    }

    pub fn mint_config() -> MintConfig {
        MintConfig::with_policy(TEST_POLICY_ID)
    }

    pub fn pipeline(&self) -> ChainedMintPipeline {
        self.pipeline_with(Self::mint_config())
    }

    pub fn pipeline_with(&self, config: MintConfig) -> ChainedMintPipeline {
        ChainedMintPipeline::new(config, self.builder.clone())
            .unwrap_or_else(|e| panic!("Invalid test mint config: {e}"))
    }
}
