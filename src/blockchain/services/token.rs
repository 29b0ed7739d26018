// src/blockchain/services/token.rs

use ethers::signers::LocalWallet;
use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use ethers_core::utils::keccak256;
use tracing::info;

use crate::blockchain::{client::ChainClient, models::ChainError};

/// Creation bytecode of the ERC-20 template with `burn(uint256)`.
/// Constructor: `(string name, string symbol, uint256 initialSupply)`; the whole
/// supply is minted to the deployer and `decimals()` is 18.
const ERC20_BURNABLE_BYTECODE_HEX: &str = include_str!("erc20_burnable.bin.hex");

fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

pub fn encode_call(sig: &str, tokens: Vec<Token>) -> Bytes {
    let mut out = selector(sig).to_vec();
    let mut tail = encode(&tokens);
    out.append(&mut tail);
    Bytes::from(out)
}

pub fn decode_u256(raw: &[u8]) -> Option<U256> {
    match decode(&[ParamType::Uint(256)], raw).ok()?.first() {
        Some(Token::Uint(n)) => Some(*n),
        _ => None,
    }
}

pub fn balance_of_call(owner: Address) -> Bytes {
    encode_call("balanceOf(address)", vec![Token::Address(owner)])
}

pub fn transfer_tx(token: Address, to: Address, amount: U256) -> TransactionRequest {
    let data = encode_call(
        "transfer(address,uint256)",
        vec![Token::Address(to), Token::Uint(amount)],
    );
    TransactionRequest::new().to(token).data(data)
}

/// Creation bytecode followed by the ABI-encoded constructor arguments.
pub fn deployment_data(bytecode: &Bytes, constructor_args: &[Token]) -> Bytes {
    let mut data = bytecode.to_vec();
    data.extend(encode(constructor_args));
    Bytes::from(data)
}

pub fn template_bytecode() -> Result<Bytes, ChainError> {
    hex::decode(ERC20_BURNABLE_BYTECODE_HEX.trim())
        .map(Bytes::from)
        .map_err(|e| ChainError::Rpc(format!("corrupt token template bytecode: {}", e)))
}

/// Deploys the burnable ERC-20 template. `supply` is already in base units.
pub async fn deploy_token(
    chain: &dyn ChainClient,
    signer: &LocalWallet,
    name: &str,
    symbol: &str,
    supply: U256,
) -> Result<Address, ChainError> {
    let bytecode = template_bytecode()?;
    let args = vec![
        Token::String(name.to_string()),
        Token::String(symbol.to_string()),
        Token::Uint(supply),
    ];
    let address = chain.deploy_contract(signer, bytecode, args).await?;
    info!("Token {} ({}) deployed at {:?}", name, symbol, address);
    Ok(address)
}
