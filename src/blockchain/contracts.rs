//! Contract interfaces used by the writer and Aave tools.

use alloy::network::TransactionBuilder;
use alloy::primitives::{address, Address, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

sol! {
    /// Minimal ERC-20 surface.
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Aave V3 pool entry points.
    interface IAavePool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function withdraw(address asset, uint256 amount, address to) external returns (uint256);
        function borrow(address asset, uint256 amount, uint256 interestRateMode, uint16 referralCode, address onBehalfOf) external;
        function repay(address asset, uint256 amount, uint256 interestRateMode, address onBehalfOf) external returns (uint256);
        function setUserUseReserveAsCollateral(address asset, bool useAsCollateral) external;
    }
}

/// Aave variable interest rate mode.
pub const VARIABLE_RATE_MODE: u64 = 2;

/// Mento stablecoins, both with 18 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableToken {
    CUsd,
    CEur,
}

impl StableToken {
    /// Parse a user-facing symbol, case-insensitively.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.to_ascii_lowercase().as_str() {
            "cusd" => Some(Self::CUsd),
            "ceur" => Some(Self::CEur),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::CUsd => "cUSD",
            Self::CEur => "cEUR",
        }
    }

    /// Token contract on the given chain, if deployed there.
    pub fn address(&self, chain_id: u64) -> Option<Address> {
        match (self, chain_id) {
            (Self::CUsd, 42220) => Some(address!("765DE816845861e75A25fCA122bb6898B8B1282a")),
            (Self::CEur, 42220) => Some(address!("D8763CBa276a3738E6DE85b4b3bF5FDed6D6cA73")),
            (Self::CUsd, 44787) => Some(address!("874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1")),
            (Self::CEur, 44787) => Some(address!("10c892A6EC43a53E45D0B916B4b7D383B1b78C0F")),
            _ => None,
        }
    }
}

/// A token listed by `get_celo_token_list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownToken {
    pub name: &'static str,
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
}

const fn token(name: &'static str, symbol: &'static str, address: Address) -> KnownToken {
    KnownToken {
        name,
        symbol,
        address,
        decimals: 18,
    }
}

/// ERC-20 tokens worth checking on a chain. Empty for unknown chains.
pub fn known_tokens(chain_id: u64) -> &'static [KnownToken] {
    const MAINNET: &[KnownToken] = &[
        token("Celo", "CELO", address!("471EcE3750Da237f93B8E339c536989b8978a438")),
        token("Celo Dollar", "cUSD", address!("765DE816845861e75A25fCA122bb6898B8B1282a")),
        token("Celo Euro", "cEUR", address!("D8763CBa276a3738E6DE85b4b3bF5FDed6D6cA73")),
    ];
    const ALFAJORES: &[KnownToken] = &[
        token("Celo", "CELO", address!("F194afDf50B03e69Bd7D057c1Aa9e10c9954E4C9")),
        token("Celo Dollar", "cUSD", address!("874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1")),
        token("Celo Euro", "cEUR", address!("10c892A6EC43a53E45D0B916B4b7D383B1b78C0F")),
        token("Celo Brazilian Real", "cREAL", address!("E4D517785D091D3c54818832dB6094bcc2744545")),
        token("USD Coin", "USDC", address!("2F25deB3848C207fc8E0c34035B3Ba7fC157602B")),
    ];

    match chain_id {
        42220 => MAINNET,
        44787 => ALFAJORES,
        _ => &[],
    }
}

/// Read an ERC-20 balance via `eth_call`.
pub async fn erc20_balance(
    client: &BlockchainClient,
    token: Address,
    owner: Address,
) -> BlockchainResult<U256> {
    let call = IERC20::balanceOfCall { owner };
    let tx = TransactionRequest::default()
        .with_to(token)
        .with_input(call.abi_encode());

    let output = client.call(tx).await?;
    IERC20::balanceOfCall::abi_decode_returns(&output)
        .map_err(|e| BlockchainError::Contract(format!("balanceOf decode failed: {}", e)))
}
