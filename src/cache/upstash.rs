//! Upstash-compatible Redis REST client.
//!
//! Each command is a JSON array POSTed to the base URL with a bearer token;
//! the reply is `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use super::store::{KvStore, StoreError};

/// Capped `SADD` plus `EXPIRE` in one atomic round trip.
///
/// `KEYS[1]` index, `ARGV[1]` member, `ARGV[2]` ttl seconds, `ARGV[3]` cap.
const ADD_TO_INDEX_SCRIPT: &str = r#"
if redis.call('SISMEMBER', KEYS[1], ARGV[1]) == 0 then
  if redis.call('SCARD', KEYS[1]) >= tonumber(ARGV[3]) then
    return 0
  end
  redis.call('SADD', KEYS[1], ARGV[1])
end
redis.call('EXPIRE', KEYS[1], ARGV[2])
return 1
"#;

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct UpstashStore {
    client: Client,
    url: Url,
    token: String,
}

impl UpstashStore {
    pub fn new(url: &str, token: impl Into<String>) -> Result<Self, StoreError> {
        let url = Url::parse(url).map_err(|err| StoreError::Transport(err.to_string()))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            url,
            token: token.into(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("jobboard/", env!("CARGO_PKG_VERSION"))
    }

    async fn command(&self, args: &[&str]) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        let reply: Reply = serde_json::from_slice(&bytes).map_err(|err| {
            StoreError::Protocol(format!(
                "status {status}: {err}: {}",
                String::from_utf8_lossy(&bytes)
            ))
        })?;
        decode_reply(reply)
    }
}

fn decode_reply(reply: Reply) -> Result<Value, StoreError> {
    match reply.error {
        Some(error) => Err(StoreError::Command(error)),
        None => Ok(reply.result),
    }
}

fn ttl_seconds(ttl: Duration) -> String {
    ttl.as_secs().max(1).to_string()
}

fn expect_text(value: Value) -> Result<Option<String>, StoreError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        other => Err(StoreError::Protocol(format!(
            "expected string or null, got {other}"
        ))),
    }
}

fn add_to_index_command<'a>(
    index: &'a str,
    member: &'a str,
    ttl: &'a str,
    max_members: &'a str,
) -> [&'a str; 7] {
    [
        "EVAL",
        ADD_TO_INDEX_SCRIPT,
        "1",
        index,
        member,
        ttl,
        max_members,
    ]
}

fn expect_flag(value: Value) -> Result<bool, StoreError> {
    match value.as_i64() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(StoreError::Protocol(format!("expected 0 or 1, got {value}"))),
    }
}

fn expect_members(value: Value) -> Result<Vec<String>, StoreError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                other => Err(StoreError::Protocol(format!(
                    "expected set member string, got {other}"
                ))),
            })
            .collect(),
        other => Err(StoreError::Protocol(format!("expected array, got {other}"))),
    }
}

#[async_trait]
impl KvStore for UpstashStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        expect_text(self.command(&["GET", key]).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let ttl = ttl_seconds(ttl);
        self.command(&["SET", key, value, "EX", &ttl]).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push("DEL");
        args.extend(keys.iter().map(String::as_str));
        self.command(&args).await?;
        Ok(())
    }

    async fn add_to_index(
        &self,
        index: &str,
        member: &str,
        ttl: Duration,
        max_members: u64,
    ) -> Result<bool, StoreError> {
        let ttl = ttl_seconds(ttl);
        let max_members = max_members.to_string();
        let reply = self
            .command(&add_to_index_command(index, member, &ttl, &max_members))
            .await?;
        expect_flag(reply)
    }

    async fn index_members(&self, index: &str) -> Result<Vec<String>, StoreError> {
        expect_members(self.command(&["SMEMBERS", index]).await?)
    }

    async fn remove_from_index(&self, index: &str, members: &[String]) -> Result<(), StoreError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut args = Vec::with_capacity(members.len() + 2);
        args.push("SREM");
        args.push(index);
        args.extend(members.iter().map(String::as_str));
        self.command(&args).await?;
        Ok(())
    }
}
