//! 最小 ABI 编解码
//!
//! 只覆盖 CommitNFT 用到的调用：`safeMint(address,string)`、`owner()` 与 `Transfer` 事件。

use serde::Deserialize;

use crate::error::{ContributionError, Result};

/// keccak256("safeMint(address,string)")[..4]
pub const SAFE_MINT_SELECTOR: [u8; 4] = [0xd2, 0x04, 0xc4, 0x5e];
/// keccak256("owner()")[..4]
pub const OWNER_SELECTOR: [u8; 4] = [0x8d, 0xa5, 0xcb, 0x5b];
/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

const WORD: usize = 32;

/// 20 字节地址
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// 小写 `0x` 形式
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub fn parse_address(raw: &str) -> Result<Address> {
    let hex_part = strip_0x(raw.trim());
    if hex_part.len() != 40 {
        return Err(ContributionError::Validation(format!("invalid address: {raw}")));
    }
    let bytes = hex::decode(hex_part)
        .map_err(|_| ContributionError::Validation(format!("invalid address: {raw}")))?;

    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(Address(out))
}

/// `safeMint(to, tokenURI)` 的 calldata，返回 `0x` 前缀的 hex
pub fn encode_safe_mint(to: &Address, token_uri: &str) -> String {
    let uri = token_uri.as_bytes();
    let padded_len = uri.len().div_ceil(WORD) * WORD;

    let mut data = Vec::with_capacity(4 + WORD * 3 + padded_len);
    data.extend_from_slice(&SAFE_MINT_SELECTOR);
    // head: address + 动态参数偏移（两个 head 槽之后）
    data.extend_from_slice(&address_word(to));
    data.extend_from_slice(&usize_word(2 * WORD));
    // tail: 长度 + 右补零的内容
    data.extend_from_slice(&usize_word(uri.len()));
    data.extend_from_slice(uri);
    data.resize(4 + WORD * 3 + padded_len, 0);

    format!("0x{}", hex::encode(data))
}

pub fn encode_call(selector: [u8; 4]) -> String {
    format!("0x{}", hex::encode(selector))
}

/// 从 32 字节返回值中取出地址（取低 20 字节）
pub fn decode_address_word(raw: &str) -> Result<Address> {
    let bytes = hex::decode(strip_0x(raw))
        .map_err(|e| ContributionError::Chain(format!("invalid abi word: {e}")))?;
    if bytes.len() < WORD {
        return Err(ContributionError::Chain(format!(
            "abi word too short: {} bytes",
            bytes.len()
        )));
    }

    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes[12..WORD]);
    Ok(Address(out))
}

/// 交易回执中的日志
#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
}

/// 找到合约从零地址发出的 Transfer 日志，返回十进制 tokenId
pub fn minted_token_id(logs: &[Log], contract: &Address) -> Option<String> {
    let zero_topic = format!("0x{}", "0".repeat(64));
    logs.iter()
        .filter(|log| {
            parse_address(&log.address).is_ok_and(|addr| addr == *contract)
        })
        .find(|log| {
            log.topics.len() == 4
                && log.topics[0].eq_ignore_ascii_case(TRANSFER_TOPIC)
                && log.topics[1].eq_ignore_ascii_case(&zero_topic)
        })
        .and_then(|log| hex_word_to_decimal(&log.topics[3]))
}

/// 把 32 字节大端整数转成十进制字符串
pub fn hex_word_to_decimal(raw: &str) -> Option<String> {
    let bytes = hex::decode(strip_0x(raw)).ok()?;
    if bytes.is_empty() || bytes.len() > WORD {
        return None;
    }

    // 以 u32 为基的大数除法，逐位求余
    let mut limbs: Vec<u32> = bytes
        .rchunks(4)
        .rev()
        .map(|chunk| chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
        .collect();

    let mut digits = Vec::new();
    while limbs.iter().any(|l| *l != 0) {
        let mut remainder: u64 = 0;
        for limb in limbs.iter_mut() {
            let acc = (remainder << 32) | u64::from(*limb);
            *limb = (acc / 10) as u32;
            remainder = acc % 10;
        }
        digits.push(char::from(b'0' + remainder as u8));
    }

    if digits.is_empty() {
        return Some("0".to_string());
    }
    Some(digits.into_iter().rev().collect())
}

/// `0x1a` 形式的 quantity 转 u64
pub fn parse_quantity(raw: &str) -> Result<u64> {
    u64::from_str_radix(strip_0x(raw), 16)
        .map_err(|e| ContributionError::Chain(format!("invalid quantity {raw}: {e}")))
}

fn strip_0x(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}
