/*!
# cardano-cli Builder

[`TxBuilder`] backed by the `cardano-cli` binary, run as a subprocess (often
inside the node's container). Envelopes and metadata are exchanged through
short-lived files in the configured work directory.
*/

use crate::{
    builder::{BuildRequest, TxBuilder},
    config::CardanoCliConfig,
    error::{BuilderError, BuilderResult},
};
use async_trait::async_trait;
use hydra_mint_sdk::{AssetId, OutputSpec, TxEnvelope};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

pub struct CardanoCliBuilder {
    config: CardanoCliConfig,
}

impl CardanoCliBuilder {
    pub fn new(config: CardanoCliConfig) -> BuilderResult<Self> {
        if config.command.is_empty() {
            return Err(BuilderError::Config("empty tool command".to_string()));
        }
        std::fs::create_dir_all(&config.work_dir)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CardanoCliConfig {
        &self.config
    }

    /// Fresh work file and its path as seen by the tool
    fn work_file(&self, suffix: &str) -> BuilderResult<(NamedTempFile, String)> {
        let file = tempfile::Builder::new()
            .prefix("hydra-mint-")
            .suffix(suffix)
            .tempfile_in(&self.config.work_dir)?;

        let tool_path = match (&self.config.tool_work_dir, file.path().file_name()) {
            (Some(dir), Some(name)) => dir.join(name),
            _ => PathBuf::from(file.path()),
        };
        Ok((file, tool_path.to_string_lossy().into_owned()))
    }

    fn write_envelope(&self, envelope: &TxEnvelope, suffix: &str) -> BuilderResult<(NamedTempFile, String)> {
        let (file, tool_path) = self.work_file(suffix)?;
        std::fs::write(file.path(), serde_json::to_vec_pretty(envelope)?)?;
        Ok((file, tool_path))
    }

    fn read_envelope(file: &NamedTempFile) -> BuilderResult<TxEnvelope> {
        let bytes = std::fs::read(file.path())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn transaction_args(&self, subcommand: &str) -> Vec<String> {
        let mut args = Vec::new();
        if !self.config.era.is_empty() {
            args.push(self.config.era.clone());
        }
        args.push("transaction".to_string());
        args.push(subcommand.to_string());
        args
    }

    fn network_args(&self) -> Vec<String> {
        vec![
            "--testnet-magic".to_string(),
            self.config.testnet_magic.to_string(),
        ]
    }

    /// Run the tool and return its stdout
    async fn run_tool(&self, args: Vec<String>) -> BuilderResult<String> {
        let (program, prefix) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| BuilderError::Config("empty tool command".to_string()))?;

        let rendered = format!("{} {}", self.config.command.join(" "), args.join(" "));
        debug!("Running {}", rendered);

        let output = Command::new(program)
            .args(prefix)
            .args(&args)
            .output()
            .await
            .map_err(|source| BuilderError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuilderError::ToolFailed {
                command: rendered,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TxBuilder for CardanoCliBuilder {
    async fn build(&self, request: &BuildRequest) -> BuilderResult<TxEnvelope> {
        let (out_file, out_path) = self.work_file(".raw")?;
        let mut args = self.transaction_args("build-raw");

        for input in &request.inputs {
            args.push("--tx-in".to_string());
            args.push(input.to_string());
        }
        for output in &request.outputs {
            args.push("--tx-out".to_string());
            args.push(format_tx_out(output));
        }
        if !request.mint.is_empty() {
            args.push("--mint".to_string());
            args.push(format_assets(&request.mint));
            args.push("--mint-script-file".to_string());
            args.push(self.config.policy_script_file.clone());
        }

        // kept alive until the tool has read it
        let metadata_file = match &request.metadata {
            Some(metadata) => {
                let (file, path) = self.work_file(".metadata.json")?;
                std::fs::write(file.path(), serde_json::to_vec(metadata)?)?;
                args.push("--metadata-json-file".to_string());
                args.push(path);
                Some(file)
            }
            None => None,
        };

        args.push("--fee".to_string());
        args.push(request.fee.to_string());
        if let Some(slot) = self.config.invalid_hereafter {
            args.push("--invalid-hereafter".to_string());
            args.push(slot.to_string());
        }
        args.push("--out-file".to_string());
        args.push(out_path);

        self.run_tool(args).await?;
        drop(metadata_file);
        Self::read_envelope(&out_file)
    }

    async fn sign(&self, raw: &TxEnvelope) -> BuilderResult<TxEnvelope> {
        let (_raw_file, raw_path) = self.write_envelope(raw, ".raw")?;
        let (out_file, out_path) = self.work_file(".signed")?;

        let mut args = self.transaction_args("sign");
        args.extend([
            "--tx-body-file".to_string(),
            raw_path,
            "--signing-key-file".to_string(),
            self.config.signing_key_file.clone(),
        ]);
        args.extend(self.network_args());
        args.extend(["--out-file".to_string(), out_path]);

        self.run_tool(args).await?;
        Self::read_envelope(&out_file)
    }

    async fn identify(&self, signed: &TxEnvelope) -> BuilderResult<String> {
        let (_signed_file, signed_path) = self.write_envelope(signed, ".signed")?;

        let mut args = self.transaction_args("txid");
        args.extend(["--tx-file".to_string(), signed_path]);

        let stdout = self.run_tool(args).await?;
        extract_tx_id(&stdout).ok_or(BuilderError::NoTxId(stdout))
    }

    async fn submit_to_base_ledger(&self, signed: &TxEnvelope) -> BuilderResult<()> {
        let (_signed_file, signed_path) = self.write_envelope(signed, ".signed")?;

        let mut args = self.transaction_args("submit");
        args.extend(["--tx-file".to_string(), signed_path]);
        args.extend(self.network_args());
        if let Some(socket) = &self.config.socket_path {
            args.extend(["--socket-path".to_string(), socket.clone()]);
        }

        let stdout = self.run_tool(args).await?;
        info!("Base ledger accepted transaction: {}", stdout.trim());
        Ok(())
    }
}

// ================================================================================================
// Argument formatting
// ================================================================================================

/// `1 policy.hexname+1 policy.hexname`
pub fn format_assets(assets: &[(AssetId, u64)]) -> String {
    assets
        .iter()
        .map(|(asset, quantity)| format!("{quantity} {asset}"))
        .collect::<Vec<_>>()
        .join("+")
}

/// `address+lovelace[+assets]`
pub fn format_tx_out(output: &OutputSpec) -> String {
    if output.assets.is_empty() {
        format!("{}+{}", output.address, output.lovelace)
    } else {
        format!(
            "{}+{}+{}",
            output.address,
            output.lovelace,
            format_assets(&output.assets)
        )
    }
}

/// First 64-character hex token in tool output
///
/// Handles both the plain form and the `{"txhash": "..."}` JSON form.
pub fn extract_tx_id(output: &str) -> Option<String> {
    output
        .split(|c: char| !c.is_ascii_hexdigit())
        .find(|token| token.len() == 64)
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX_ID: &str = "8f3a5c1d2e4b6a7980f1e2d3c4b5a69788f9e0d1c2b3a4958677a8b9c0d1e2f3";

    #[test]
    fn test_extract_tx_id_plain_and_json() {
        assert_eq!(extract_tx_id(&format!("{TX_ID}\n")).as_deref(), Some(TX_ID));
        assert_eq!(
            extract_tx_id(&format!("{{\"txhash\": \"{TX_ID}\"}}")).as_deref(),
            Some(TX_ID)
        );
        assert_eq!(
            extract_tx_id(&format!("Warning: era deprecated\n{}\n", TX_ID.to_uppercase()))
                .as_deref(),
            Some(TX_ID)
        );
    }

    #[test]
    fn test_extract_tx_id_missing() {
        assert_eq!(extract_tx_id(""), None);
        assert_eq!(extract_tx_id("Command failed: transaction txid"), None);
        // a 128-char run is not a transaction id
        assert_eq!(extract_tx_id(&TX_ID.repeat(2)), None);
    }

    #[test]
    fn test_format_tx_out() {
        let policy = "b7d525b149829894aa5fa73087d7758c2163c55520c8715652cb8515";
        let mut output = OutputSpec::lovelace_only("addr_test1xyz", 3_000_000);
        assert_eq!(format_tx_out(&output), "addr_test1xyz+3000000");

        output.assets = vec![
            (AssetId::new(policy, "A_0"), 1),
            (AssetId::new(policy, "A_1"), 1),
        ];
        assert_eq!(
            format_tx_out(&output),
            format!("addr_test1xyz+3000000+1 {policy}.415f30+1 {policy}.415f31")
        );
    }

    #[test]
    fn test_builder_rejects_empty_command() {
        let config = CardanoCliConfig {
            command: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            CardanoCliBuilder::new(config),
            Err(BuilderError::Config(_))
        ));
    }

    #[test]
    fn test_work_file_maps_tool_path() {
        let dir = tempfile::tempdir().unwrap();
        let builder = CardanoCliBuilder::new(CardanoCliConfig {
            work_dir: dir.path().to_path_buf(),
            tool_work_dir: Some(PathBuf::from("/work")),
            ..Default::default()
        })
        .unwrap();

        let (file, tool_path) = builder.work_file(".raw").unwrap();
        assert!(file.path().starts_with(dir.path()));
        assert!(tool_path.starts_with("/work/hydra-mint-"));
        assert!(tool_path.ends_with(".raw"));
    }

    #[tokio::test]
    async fn test_tool_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let builder = CardanoCliBuilder::new(CardanoCliConfig {
            command: vec!["sh".to_string(), "-c".to_string(), "echo boom >&2; exit 3".to_string()],
            era: String::new(),
            work_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let result = builder.identify(&TxEnvelope::signed("84")).await;
        match result {
            Err(BuilderError::ToolFailed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected ToolFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_identify_parses_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let builder = CardanoCliBuilder::new(CardanoCliConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("echo '{{\"txhash\": \"{TX_ID}\"}}'"),
            ],
            era: String::new(),
            work_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let tx_id = builder.identify(&TxEnvelope::signed("84")).await.unwrap();
        assert_eq!(tx_id, TX_ID);
    }
}
