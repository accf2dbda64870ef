//! Writer and reader tools against a mock JSON-RPC node.

use alloy::primitives::U256;
use serde_json::{json, Value};
use std::sync::Arc;

use celo_mcp::tools::build_tools;
use celo_mcp::{McpServer, ToolContext};

mod common;
use common::{
    canned_tx_hash, config_for, manual_context, start_mock_rpc, tool_call, tool_payload, MockChain,
    BLOCK_TIMESTAMP, LATEST_BLOCK, RECIPIENT, TEST_ADDRESS, TEST_PRIVATE_KEY,
};

const ONE_CELO: u128 = 1_000_000_000_000_000_000;

async fn setup(chain: MockChain) -> (McpServer, Arc<ToolContext>) {
    let url = start_mock_rpc(chain).await;
    let (ctx, _) = manual_context(config_for(&url));
    (McpServer::new(build_tools(ctx.clone())), ctx)
}

async fn call(server: &McpServer, name: &str, args: Value) -> (Value, bool) {
    let response = server.handle_message(&tool_call(1, name, args)).await.unwrap();
    tool_payload(&response)
}

/// Create and arm a session in the given namespace.
async fn armed_session(server: &McpServer, create: &str, add_key: &str) -> String {
    let (created, _) = call(server, create, json!({ "address": TEST_ADDRESS })).await;
    let session_id = created["session_id"].as_str().unwrap().to_string();
    let (_, is_error) = call(
        server,
        add_key,
        json!({ "session_id": session_id, "private_key": TEST_PRIVATE_KEY }),
    )
    .await;
    assert!(!is_error);
    session_id
}

#[tokio::test]
async fn test_send_celo_broadcasts_and_clears() {
    let chain = MockChain::new(U256::from(5 * ONE_CELO), U256::ZERO);
    let (server, ctx) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_transaction_session", "add_private_key").await;

    let (sent, is_error) = call(
        &server,
        "send_celo",
        json!({ "session_id": session_id, "to_address": RECIPIENT, "amount": 1.5, "network": "alfajores" }),
    )
    .await;

    assert!(!is_error, "{}", sent);
    assert_eq!(sent["from"], TEST_ADDRESS);
    assert_eq!(sent["to"], RECIPIENT);
    assert_eq!(sent["network"], "alfajores");
    assert_eq!(sent["session_cleared"], true);
    let hash = sent["transaction_hash"].as_str().unwrap();
    assert_eq!(
        sent["explorer_url"],
        format!("https://explorer.celo.org/alfajores/tx/{}", hash)
    );

    assert_eq!(chain.count("eth_sendRawTransaction"), 1);
    assert!(ctx.transactions().manager.get_session(&session_id).is_none());
}

#[tokio::test]
async fn test_send_celo_insufficient_balance_never_broadcasts() {
    let chain = MockChain::new(U256::from(ONE_CELO), U256::ZERO);
    let (server, ctx) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_transaction_session", "add_private_key").await;

    let (result, is_error) = call(
        &server,
        "send_celo",
        json!({ "session_id": session_id, "to_address": RECIPIENT, "amount": 2.0, "network": "alfajores" }),
    )
    .await;

    assert!(is_error);
    assert!(result["error"].as_str().unwrap().starts_with("Insufficient balance: 1 CELO available"));
    assert_eq!(result["session_cleared"], true);
    assert_eq!(chain.count("eth_sendRawTransaction"), 0);
    assert!(ctx.transactions().manager.get_session(&session_id).is_none());
}

#[tokio::test]
async fn test_send_token_reads_erc20_balance() {
    let chain = MockChain::new(U256::ZERO, U256::from(10 * ONE_CELO));
    let (server, _) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_transaction_session", "add_private_key").await;

    let (sent, is_error) = call(
        &server,
        "send_celo_token",
        json!({
            "session_id": session_id,
            "to_address": RECIPIENT,
            "amount": 3,
            "token_type": "cEUR",
            "network": "alfajores"
        }),
    )
    .await;

    assert!(!is_error, "{}", sent);
    assert_eq!(sent["token"], "cEUR");
    assert!(chain.count("eth_call") >= 1);
    assert_eq!(chain.count("eth_sendRawTransaction"), 1);
}

#[tokio::test]
async fn test_aave_collateral_waits_for_receipt() {
    let chain = MockChain::new(U256::from(ONE_CELO), U256::ZERO);
    let (server, ctx) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_aave_session", "add_aave_private_key").await;

    let (result, is_error) = call(
        &server,
        "set_celo_collateral",
        json!({ "session_id": session_id, "use_as_collateral": false }),
    )
    .await;

    assert!(!is_error, "{}", result);
    assert_eq!(result["use_as_collateral"], false);
    assert!(result["explorer_url"].as_str().unwrap().starts_with("https://celoscan.io/tx/0x"));
    assert!(chain.count("eth_getTransactionReceipt") >= 1);
    assert!(ctx.aave().manager.get_session(&session_id).is_none());
}

#[tokio::test]
async fn test_aave_borrow_reverted() {
    let mut chain = MockChain::new(U256::from(ONE_CELO), U256::ZERO);
    chain.receipt_status = false;
    let (server, ctx) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_aave_session", "add_aave_private_key").await;

    let (result, is_error) = call(&server, "borrow_usdc", json!({ "session_id": session_id, "amount": 25.0 })).await;

    assert!(is_error);
    assert_eq!(result["error"], "Borrow transaction failed");
    assert_eq!(result["session_cleared"], true);
    assert!(result["transaction_hash"].is_string());
    assert!(ctx.aave().manager.get_session(&session_id).is_none());
}

#[tokio::test]
async fn test_aave_supply_approves_then_supplies() {
    let chain = MockChain::new(U256::from(ONE_CELO), U256::from(5 * ONE_CELO));
    let (server, ctx) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_aave_session", "add_aave_private_key").await;

    let (result, is_error) = call(&server, "supply_celo", json!({ "session_id": session_id, "amount": 2.0 })).await;

    assert!(!is_error, "{}", result);
    assert_eq!(result["amount"], 2.0);
    assert_eq!(result["message"], "Successfully supplied 2 CELO to Aave on Celo mainnet.");
    assert_eq!(result["session_cleared"], true);
    assert_eq!(chain.count("eth_sendRawTransaction"), 2);
    assert!(ctx.aave().manager.get_session(&session_id).is_none());
}

#[tokio::test]
async fn test_aave_withdraw_explicit_amount() {
    let chain = MockChain::new(U256::from(ONE_CELO), U256::ZERO);
    let (server, _) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_aave_session", "add_aave_private_key").await;

    let (result, is_error) = call(&server, "withdraw_celo", json!({ "session_id": session_id, "amount": 0.5 })).await;

    assert!(!is_error, "{}", result);
    assert_eq!(result["amount"], 0.5);
    assert_eq!(result["message"], "Successfully withdrew 0.5 CELO from Aave on Celo mainnet.");
    assert_eq!(chain.count("eth_sendRawTransaction"), 1);
}

#[tokio::test]
async fn test_aave_repay_explicit_amount() {
    let chain = MockChain::new(U256::from(ONE_CELO), U256::from(100_000_000u64));
    let (server, _) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_aave_session", "add_aave_private_key").await;

    let (result, is_error) = call(&server, "repay_usdc", json!({ "session_id": session_id, "amount": 25.0 })).await;

    assert!(!is_error, "{}", result);
    assert_eq!(result["amount"], 25.0);
    assert_eq!(result["message"], "Successfully repaid 25 USDC on Aave.");
    assert_eq!(chain.count("eth_sendRawTransaction"), 2);
}

#[tokio::test]
async fn test_aave_reverted_approval_stops_before_supply() {
    let chain = MockChain::new(U256::from(ONE_CELO), U256::from(5 * ONE_CELO)).with_receipt_plan(&[false]);
    let (server, ctx) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_aave_session", "add_aave_private_key").await;

    let (result, is_error) = call(&server, "supply_celo", json!({ "session_id": session_id, "amount": 1.0 })).await;

    assert!(is_error);
    assert_eq!(result["error"], "Approval transaction failed");
    assert_eq!(result["session_cleared"], true);
    assert!(result["transaction_hash"].is_string());
    assert_eq!(chain.count("eth_sendRawTransaction"), 1);
    assert!(ctx.aave().manager.get_session(&session_id).is_none());
}

#[tokio::test]
async fn test_aave_repay_all_without_balance() {
    let chain = MockChain::new(U256::from(ONE_CELO), U256::ZERO);
    let (server, _) = setup(chain.clone()).await;
    let session_id = armed_session(&server, "create_aave_session", "add_aave_private_key").await;

    let (result, is_error) = call(&server, "repay_usdc", json!({ "session_id": session_id })).await;

    assert!(is_error);
    assert_eq!(result["error"], "No USDC balance to repay with");
    assert_eq!(chain.count("eth_sendRawTransaction"), 0);
}

#[tokio::test]
async fn test_readers_do_not_need_sessions() {
    let chain = MockChain::new(U256::from(ONE_CELO / 2), U256::ZERO);
    let (server, _) = setup(chain).await;

    let (block, is_error) = call(&server, "get_celo_block_number", json!({ "network": "alfajores" })).await;
    assert!(!is_error);
    assert_eq!(block["block_number"], 16);

    let (balance, is_error) = call(&server, "get_celo_balance", json!({ "address": RECIPIENT })).await;
    assert!(!is_error);
    assert_eq!(balance["balance"], "0.5");
    assert_eq!(balance["symbol"], "CELO");
}

#[tokio::test]
async fn test_balances_include_stablecoins() {
    let chain = MockChain::new(U256::from(2 * ONE_CELO), U256::from(ONE_CELO / 4));
    let (server, _) = setup(chain).await;

    let (result, is_error) = call(
        &server,
        "get_celo_balances",
        json!({ "address": RECIPIENT, "network": "alfajores" }),
    )
    .await;

    assert!(!is_error, "{}", result);
    assert_eq!(result["CELO"], "2");
    assert_eq!(result["cUSD"], "0.25");
    assert_eq!(result["cEUR"], "0.25");
    assert_eq!(
        result["block_explorer_url"],
        format!("https://explorer.celo.org/alfajores/address/{}", RECIPIENT)
    );
}

#[tokio::test]
async fn test_token_list_covers_known_tokens() {
    let chain = MockChain::new(U256::ZERO, U256::from(3 * ONE_CELO));
    let (server, _) = setup(chain).await;

    let (result, is_error) = call(
        &server,
        "get_celo_token_list",
        json!({ "address": TEST_ADDRESS, "network": "alfajores" }),
    )
    .await;

    assert!(!is_error, "{}", result);
    assert_eq!(result["token_count"], 5);
    let tokens = result["tokens"].as_array().unwrap();
    let symbols: Vec<&str> = tokens.iter().map(|t| t["symbol"].as_str().unwrap()).collect();
    assert_eq!(symbols, ["CELO", "cUSD", "cEUR", "cREAL", "USDC"]);
    assert_eq!(tokens[0]["balance"], "3");
    assert_eq!(tokens[0]["balance_raw"], (3 * ONE_CELO).to_string());
}

#[tokio::test]
async fn test_transactions_scan_finds_transfer() {
    let chain = MockChain::new(U256::ZERO, U256::ZERO);
    let (server, _) = setup(chain.clone()).await;

    let (result, is_error) = call(
        &server,
        "get_celo_transactions",
        json!({ "address": RECIPIENT, "blocks_to_scan": 5, "network": "alfajores" }),
    )
    .await;

    assert!(!is_error, "{}", result);
    assert_eq!(result["latest_block"], LATEST_BLOCK);
    assert_eq!(result["blocks_scanned"], 5);
    assert_eq!(result["transactions_found"], 1);
    let tx = &result["transactions"][0];
    assert_eq!(tx["from"], TEST_ADDRESS);
    assert_eq!(tx["to"], RECIPIENT);
    assert_eq!(tx["value"], "1");
    assert_eq!(tx["block_number"], LATEST_BLOCK);
    assert_eq!(tx["timestamp"], BLOCK_TIMESTAMP);
    assert_eq!(tx["status"], "Success");
    assert_eq!(tx["gas_used"], 21000);
    assert!(tx["tx_explorer_url"]
        .as_str()
        .unwrap()
        .starts_with("https://explorer.celo.org/alfajores/tx/0x"));
    assert_eq!(chain.count("eth_getBlockByNumber"), 5);
}

#[tokio::test]
async fn test_transactions_scan_ignores_unrelated_address() {
    let chain = MockChain::new(U256::ZERO, U256::ZERO);
    let (server, _) = setup(chain).await;
    let stranger = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

    let (result, is_error) = call(&server, "get_celo_transactions", json!({ "address": stranger })).await;

    assert!(!is_error, "{}", result);
    assert_eq!(result["blocks_scanned"], LATEST_BLOCK);
    assert_eq!(result["transactions_found"], 0);
}

#[tokio::test]
async fn test_block_info_latest_and_missing() {
    let chain = MockChain::new(U256::ZERO, U256::ZERO);
    let (server, _) = setup(chain).await;

    let (block, is_error) = call(&server, "get_celo_block_info", json!({})).await;
    assert!(!is_error, "{}", block);
    assert_eq!(block["number"], LATEST_BLOCK);
    assert_eq!(block["timestamp"], BLOCK_TIMESTAMP);
    assert_eq!(block["gas_used"], 21000);
    assert_eq!(block["transaction_count"], 1);
    assert_eq!(block["miner"], RECIPIENT);

    let (missing, is_error) = call(&server, "get_celo_block_info", json!({ "block_number": 99 })).await;
    assert!(is_error);
    assert_eq!(missing["error"], "Block not found: 99");
}

#[tokio::test]
async fn test_transaction_lookup() {
    let chain = MockChain::new(U256::ZERO, U256::ZERO);
    let (server, _) = setup(chain).await;
    let hash = canned_tx_hash();

    let (tx, is_error) = call(
        &server,
        "get_celo_transaction",
        json!({ "tx_hash": hash, "network": "alfajores" }),
    )
    .await;
    assert!(!is_error, "{}", tx);
    assert_eq!(tx["from"], TEST_ADDRESS);
    assert_eq!(tx["to"], RECIPIENT);
    assert_eq!(tx["value"], ONE_CELO.to_string());
    assert_eq!(tx["value_celo"], "1");
    assert_eq!(tx["nonce"], 7);
    assert_eq!(tx["gas"], 21000);
    assert_eq!(tx["block_number"], LATEST_BLOCK);
    assert_eq!(tx["explorer_url"], format!("https://explorer.celo.org/alfajores/tx/{}", hash));

    let unknown = format!("0x{}", "cd".repeat(32));
    let (missing, is_error) = call(&server, "get_celo_transaction", json!({ "tx_hash": unknown })).await;
    assert!(is_error);
    assert_eq!(missing["error"], format!("Transaction not found: {}", unknown));
}
