//! Transaction Redis operations.
//!
//! Redis key patterns:
//! - `tx:{nanoid}` — transaction data (JSON)
//! - `tx_receipt:{receipt}` — receipt number lookup to tx id (STRING)
//! - `user_txs:{user_id}` — set of the user's transaction ids (SET)
//!
//! Transactions are passive ledger records: the external payments service
//! creates them and moves their status. This layer enforces the one
//! invariant the records carry: the receipt number, when present, is
//! unique across all transactions (sparse uniqueness), while any number of
//! records may have no receipt at all.

use crate::models::StoredTransaction;
use crate::storage::json_error;
use redis::AsyncCommands;

/// Atomically store a transaction, claiming the receipt index when a
/// receipt is present.
///
/// Returns `Ok(false)` without writing anything if another transaction
/// already holds the receipt number.
pub async fn create_transaction<C>(
    con: &mut C,
    tx: &StoredTransaction,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let tx_key = format!("tx:{}", tx.id);
    let user_txs_key = format!("user_txs:{}", tx.user_id);

    let json = serde_json::to_string(tx).map_err(|e| json_error("JSON serialize", e))?;

    match &tx.receipt {
        Some(receipt) => {
            let receipt_key = format!("tx_receipt:{}", receipt);

            // Same claim-then-write script shape as user creation: the
            // receipt index is the uniqueness guard.
            let script = redis::Script::new(
                r"
                if redis.call('EXISTS', KEYS[1]) == 1 then
                    return 0
                end
                redis.call('SET', KEYS[1], ARGV[1])
                redis.call('SET', KEYS[2], ARGV[2])
                redis.call('SADD', KEYS[3], ARGV[1])
                return 1
                ",
            );

            let created: i32 = script
                .key(&receipt_key)
                .key(&tx_key)
                .key(&user_txs_key)
                .arg(&tx.id)
                .arg(json)
                .invoke_async(con)
                .await?;

            Ok(created == 1)
        }
        None => {
            // No receipt, nothing to claim
            con.set::<_, _, ()>(&tx_key, json).await?;
            con.sadd::<_, _, ()>(&user_txs_key, &tx.id).await?;
            Ok(true)
        }
    }
}

/// Get a transaction by ID.
pub async fn get_transaction<C>(
    con: &mut C,
    id: &str,
) -> Result<Option<StoredTransaction>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("tx:{}", id);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            let tx =
                serde_json::from_str(&data).map_err(|e| json_error("JSON deserialize", e))?;
            Ok(Some(tx))
        }
        None => Ok(None),
    }
}

/// List all transactions belonging to a user.
pub async fn list_user_transactions<C>(
    con: &mut C,
    user_id: &str,
) -> Result<Vec<StoredTransaction>, redis::RedisError>
where
    C: AsyncCommands,
{
    let user_txs_key = format!("user_txs:{}", user_id);
    let ids: Vec<String> = con.smembers(&user_txs_key).await?;

    let mut txs = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(tx) = get_transaction(con, &id).await? {
            txs.push(tx);
        }
    }

    Ok(txs)
}
