use std::collections::HashMap;

use async_trait::async_trait;
use canopy_core::{Client, MatrixKey, Server, ServerStatus};
use redis::{AsyncCommands, Script, aio::ConnectionManager};

use crate::{InsertOutcome, RegistrySnapshot, RegistryStore, StoreError};

const INSERT_SERVER: &str = r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then return 0 end
if redis.call('HEXISTS', KEYS[3], ARGV[2]) == 1 then return -1 end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
redis.call('RPUSH', KEYS[2], ARGV[1])
redis.call('HSET', KEYS[3], ARGV[2], ARGV[1])
for i = 4, #ARGV, 2 do
  redis.call('HSET', KEYS[4], ARGV[i], ARGV[i + 1])
end
return 1
";

const REMOVE_SERVER: &str = r"
local record = redis.call('HGET', KEYS[1], ARGV[1])
if not record then return false end
redis.call('HDEL', KEYS[1], ARGV[1])
redis.call('LREM', KEYS[2], 0, ARGV[1])
redis.call('HDEL', KEYS[3], cjson.decode(record).name)
for _, field in ipairs(redis.call('HKEYS', KEYS[4])) do
  if string.match(field, '^[^/]+/([^/]+)') == ARGV[1] then
    redis.call('HDEL', KEYS[4], field)
  end
end
return record
";

const REPLACE_SERVER: &str = r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 0 then return 0 end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
return 1
";

const INSERT_CLIENT: &str = r"
if redis.call('HSETNX', KEYS[1], ARGV[1], ARGV[2]) == 0 then return 0 end
redis.call('RPUSH', KEYS[2], ARGV[1])
return 1
";

const TOGGLE_ENTRY: &str = r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 0 or redis.call('HEXISTS', KEYS[2], ARGV[2]) == 0 then
  return -1
end
local current = redis.call('HGET', KEYS[3], ARGV[3])
if not current then current = ARGV[4] end
local flipped = '1'
if current == '1' then flipped = '0' end
redis.call('HSET', KEYS[3], ARGV[3], flipped)
return tonumber(flipped)
";

/// Key layout under a configurable prefix
#[derive(Debug, Clone)]
struct Keys {
    /// Hash: server id -> JSON record
    servers: String,
    /// List: server ids in registration order
    server_order: String,
    /// Hash: server name -> server id
    server_names: String,
    /// Hash: client name -> JSON record
    clients: String,
    /// List: client names in insertion order
    client_order: String,
    /// Hash: `client/server[/tool]` -> "1" or "0"
    matrix: String,
}

impl Keys {
    fn new(prefix: &str) -> Self {
        Self {
            servers: format!("{prefix}:servers"),
            server_order: format!("{prefix}:server_order"),
            server_names: format!("{prefix}:server_names"),
            clients: format!("{prefix}:clients"),
            client_order: format!("{prefix}:client_order"),
            matrix: format!("{prefix}:matrix"),
        }
    }
}

const fn encode_flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn decode_flag(raw: &str) -> bool {
    raw == "1"
}

/// Collect JSON records following an order list, skipping ids without a record
fn ordered<T: serde::de::DeserializeOwned>(
    order: &[String],
    records: &HashMap<String, String>,
) -> Result<Vec<T>, StoreError> {
    order
        .iter()
        .filter_map(|id| records.get(id))
        .map(|json| serde_json::from_str(json).map_err(StoreError::from))
        .collect()
}

/// Redis-backed registry store
///
/// Multi-key writes run as Lua scripts and snapshots as a `MULTI`
/// pipeline, so every operation is atomic on the server side.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    keys: Keys,
    insert_server: Script,
    remove_server: Script,
    replace_server: Script,
    insert_client: Script,
    toggle_entry: Script,
}

impl RedisStore {
    /// Connect to Redis and prepare the store scripts
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Backend(format!("failed to open Redis client: {e}")))?;

        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect to Redis: {e}")))?;

        Ok(Self {
            conn,
            keys: Keys::new(key_prefix),
            insert_server: Script::new(INSERT_SERVER),
            remove_server: Script::new(REMOVE_SERVER),
            replace_server: Script::new(REPLACE_SERVER),
            insert_client: Script::new(INSERT_CLIENT),
            toggle_entry: Script::new(TOGGLE_ENTRY),
        })
    }
}

#[async_trait]
impl RegistryStore for RedisStore {
    async fn insert_server(&self, server: &Server, seeds: &[(MatrixKey, bool)]) -> Result<InsertOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let record = serde_json::to_string(server)?;

        let mut invocation = self.insert_server.prepare_invoke();
        invocation
            .key(&self.keys.servers)
            .key(&self.keys.server_order)
            .key(&self.keys.server_names)
            .key(&self.keys.matrix)
            .arg(&server.id)
            .arg(&server.name)
            .arg(record);

        for (key, value) in seeds {
            invocation.arg(key.to_string()).arg(encode_flag(*value));
        }

        let outcome: i64 = invocation.invoke_async(&mut conn).await?;

        Ok(match outcome {
            0 => InsertOutcome::DuplicateId,
            -1 => InsertOutcome::DuplicateName,
            _ => InsertOutcome::Inserted,
        })
    }

    async fn remove_server(&self, id: &str) -> Result<Option<Server>, StoreError> {
        let mut conn = self.conn.clone();

        let record: Option<String> = self
            .remove_server
            .key(&self.keys.servers)
            .key(&self.keys.server_order)
            .key(&self.keys.server_names)
            .key(&self.keys.matrix)
            .arg(id)
            .invoke_async(&mut conn)
            .await?;

        record.map(|json| serde_json::from_str(&json).map_err(StoreError::from)).transpose()
    }

    async fn get_server(&self, id: &str) -> Result<Option<Server>, StoreError> {
        let mut conn = self.conn.clone();

        let record: Option<String> = conn.hget(&self.keys.servers, id).await?;

        record.map(|json| serde_json::from_str(&json).map_err(StoreError::from)).transpose()
    }

    async fn list_servers(&self) -> Result<Vec<Server>, StoreError> {
        let mut conn = self.conn.clone();

        let (order, records): (Vec<String>, HashMap<String, String>) = redis::pipe()
            .atomic()
            .lrange(&self.keys.server_order, 0, -1)
            .hgetall(&self.keys.servers)
            .query_async(&mut conn)
            .await?;

        ordered(&order, &records)
    }

    async fn set_server_status(&self, id: &str, status: ServerStatus) -> Result<Option<Server>, StoreError> {
        let Some(mut server) = self.get_server(id).await? else {
            return Ok(None);
        };
        server.status = status;

        let mut conn = self.conn.clone();
        let replaced: i64 = self
            .replace_server
            .key(&self.keys.servers)
            .arg(id)
            .arg(serde_json::to_string(&server)?)
            .invoke_async(&mut conn)
            .await?;

        // Removed between the read and the write
        Ok((replaced == 1).then_some(server))
    }

    async fn insert_client(&self, client: &Client) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();

        let inserted: i64 = self
            .insert_client
            .key(&self.keys.clients)
            .key(&self.keys.client_order)
            .arg(&client.name)
            .arg(serde_json::to_string(client)?)
            .invoke_async(&mut conn)
            .await?;

        Ok(inserted == 1)
    }

    async fn get_client(&self, name: &str) -> Result<Option<Client>, StoreError> {
        let mut conn = self.conn.clone();

        let record: Option<String> = conn.hget(&self.keys.clients, name).await?;

        record.map(|json| serde_json::from_str(&json).map_err(StoreError::from)).transpose()
    }

    async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        let mut conn = self.conn.clone();

        let (order, records): (Vec<String>, HashMap<String, String>) = redis::pipe()
            .atomic()
            .lrange(&self.keys.client_order, 0, -1)
            .hgetall(&self.keys.clients)
            .query_async(&mut conn)
            .await?;

        ordered(&order, &records)
    }

    async fn get_entry(&self, key: &MatrixKey) -> Result<Option<bool>, StoreError> {
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn.hget(&self.keys.matrix, key.to_string()).await?;

        Ok(raw.as_deref().map(decode_flag))
    }

    async fn toggle_entry(&self, key: &MatrixKey, default: bool) -> Result<Option<bool>, StoreError> {
        let mut conn = self.conn.clone();

        let flipped: i64 = self
            .toggle_entry
            .key(&self.keys.servers)
            .key(&self.keys.clients)
            .key(&self.keys.matrix)
            .arg(key.server_id())
            .arg(key.client())
            .arg(key.to_string())
            .arg(encode_flag(default))
            .invoke_async(&mut conn)
            .await?;

        Ok(match flipped {
            -1 => None,
            value => Some(value == 1),
        })
    }

    async fn snapshot(&self) -> Result<RegistrySnapshot, StoreError> {
        let mut conn = self.conn.clone();

        #[allow(clippy::type_complexity)]
        let (server_order, servers, client_order, clients, matrix): (
            Vec<String>,
            HashMap<String, String>,
            Vec<String>,
            HashMap<String, String>,
            HashMap<String, String>,
        ) = redis::pipe()
            .atomic()
            .lrange(&self.keys.server_order, 0, -1)
            .hgetall(&self.keys.servers)
            .lrange(&self.keys.client_order, 0, -1)
            .hgetall(&self.keys.clients)
            .hgetall(&self.keys.matrix)
            .query_async(&mut conn)
            .await?;

        let mut entries = HashMap::with_capacity(matrix.len());
        for (field, raw) in matrix {
            match MatrixKey::parse(&field) {
                Some(key) => {
                    entries.insert(key, decode_flag(&raw));
                }
                None => tracing::warn!(field = %field, "ignoring malformed matrix field"),
            }
        }

        Ok(RegistrySnapshot {
            servers: ordered(&server_order, &servers)?,
            clients: ordered(&client_order, &clients)?,
            entries,
        })
    }
}
