//! 部署检查
//!
//! 部署脚本把四个合约串联，并将 CommitNFT 所有权转移给 minter 账户。
//! 这里只读地验证链 ID、合约代码是否存在以及 CommitNFT 的 owner。

use lightcommit_shared::config::ChainConfig;
use serde::Serialize;

use super::abi;
use super::rpc::JsonRpcClient;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStatus {
    pub name: &'static str,
    pub address: Option<String>,
    pub deployed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReport {
    pub rpc_url: String,
    pub chain_id: u64,
    pub expected_chain_id: Option<u64>,
    pub contracts: Vec<ContractStatus>,
    pub commit_nft_owner: Option<String>,
    pub expected_owner: String,
    pub nft_name: String,
    pub nft_symbol: String,
    pub base_token_uri: String,
}

impl DeploymentReport {
    pub fn chain_id_matches(&self) -> bool {
        self.expected_chain_id.is_none_or(|id| id == self.chain_id)
    }

    pub fn owner_matches(&self) -> bool {
        self.commit_nft_owner
            .as_deref()
            .is_some_and(|owner| owner.eq_ignore_ascii_case(&self.expected_owner))
    }

    pub fn is_healthy(&self) -> bool {
        self.chain_id_matches()
            && self.owner_matches()
            && self.contracts.iter().all(|c| c.deployed)
    }
}

pub struct DeploymentInspector {
    rpc: JsonRpcClient,
    config: ChainConfig,
}

impl DeploymentInspector {
    pub fn new(config: ChainConfig) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(config.rpc_url.clone())?,
            config,
        })
    }

    fn configured_contracts(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("AgentIdentityRegistry", self.config.identity_registry_address.as_deref()),
            ("ReputationRegistry", self.config.reputation_registry_address.as_deref()),
            ("CommitNFT", Some(self.config.commit_nft_address.as_str())),
            ("ValidationRegistry", self.config.validation_registry_address.as_deref()),
        ]
    }

    async fn contract_status(&self, name: &'static str, address: Option<&str>) -> ContractStatus {
        let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) else {
            return ContractStatus {
                name,
                address: None,
                deployed: false,
                error: Some("address not configured".to_string()),
            };
        };

        let (deployed, error) = match abi::parse_address(address) {
            Err(e) => (false, Some(e.to_string())),
            Ok(parsed) => match self.rpc.get_code(&parsed.to_hex()).await {
                Ok(code) => (code.len() > 2, None),
                Err(e) => (false, Some(e.to_string())),
            },
        };

        ContractStatus {
            name,
            address: Some(address.to_string()),
            deployed,
            error,
        }
    }

    async fn commit_nft_owner(&self) -> Result<String> {
        let contract = abi::parse_address(&self.config.commit_nft_address)?;
        let raw = self
            .rpc
            .eth_call(&contract.to_hex(), &abi::encode_call(abi::OWNER_SELECTOR))
            .await?;
        Ok(abi::decode_address_word(&raw)?.to_hex())
    }

    pub async fn report(&self) -> Result<DeploymentReport> {
        let chain_id = self.rpc.chain_id().await?;

        let mut contracts = Vec::with_capacity(4);
        for (name, address) in self.configured_contracts() {
            contracts.push(self.contract_status(name, address).await);
        }

        let commit_nft_owner = match self.commit_nft_owner().await {
            Ok(owner) => Some(owner),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read CommitNFT owner");
                None
            }
        };

        Ok(DeploymentReport {
            rpc_url: self.rpc.url().to_string(),
            chain_id,
            expected_chain_id: self.config.chain_id,
            contracts,
            commit_nft_owner,
            expected_owner: self.config.minter_address.to_ascii_lowercase(),
            nft_name: self.config.nft_name.clone(),
            nft_symbol: self.config.nft_symbol.clone(),
            base_token_uri: self.config.base_token_uri.clone(),
        })
    }
}
