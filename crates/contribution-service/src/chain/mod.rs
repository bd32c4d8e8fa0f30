//! 链上集成：ABI 编码、JSON-RPC、CommitNFT 铸造与部署检查

pub mod abi;
pub mod inspector;
pub mod minter;
pub mod rpc;

pub use inspector::{DeploymentInspector, DeploymentReport};
pub use minter::{MintReceipt, MintRequest, NftMinter, RpcNftMinter};
pub use rpc::JsonRpcClient;

#[cfg(any(test, feature = "mocks"))]
pub use minter::MockNftMinter;
