//! Attestation cache
//!
//! Attestations are written with `SETEX` so that expiry is the only way an
//! entry leaves the cache. The Redis connection fails fast: while it is
//! down, writes return an error immediately instead of queuing, and a new
//! connection is attempted at most once per reconnect interval.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use crate::config::RedisArgs;
use crate::types::{OobError, Result};

/// How long an attestation stays in the cache
pub const ATTESTATION_TTL: Duration = Duration::from_secs(60);

/// Fixed wait between reconnect attempts
pub const RECONNECT_WAIT: Duration = Duration::from_secs(1);

/// Upper bound on a connect, handshake or write before it counts as failed
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Key/value store with per-key expiry
#[async_trait]
pub trait AttestationCache: Send {
    /// Store `value` under `key`, replacing any previous value and expiry
    async fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
}

/// Redis-backed [`AttestationCache`]
pub struct RedisCache {
    client: redis::Client,
    connection: Option<MultiplexedConnection>,
    next_attempt: Instant,
    command_timeout: Duration,
}

impl RedisCache {
    /// Connect and wait until Redis answers `PING`.
    ///
    /// Retries with a fixed wait until Redis is ready, so the caller can rely
    /// on a live cache before it starts consuming attestations.
    pub async fn connect(args: &RedisArgs) -> Result<Self> {
        let client = redis::Client::open(args.redis_url.as_str())
            .map_err(|e| OobError::Config(format!("Invalid Redis URL: {e}")))?;

        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match open_connection(&client, COMMAND_TIMEOUT).await {
                Ok(connection) => {
                    info!(url = %redact_url(&args.redis_url), "Redis ready");
                    return Ok(Self {
                        client,
                        connection: Some(connection),
                        next_attempt: Instant::now(),
                        command_timeout: COMMAND_TIMEOUT,
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Redis not ready, retrying");
                    tokio::time::sleep(RECONNECT_WAIT).await;
                }
            }
        }
    }

    /// Current connection, reconnecting if the last one was lost and the
    /// reconnect interval has passed
    async fn connection(&mut self) -> Result<&mut MultiplexedConnection> {
        if self.connection.is_none() {
            if Instant::now() < self.next_attempt {
                return Err(OobError::Cache("Redis offline, waiting to reconnect".into()));
            }
            self.next_attempt = Instant::now() + RECONNECT_WAIT;

            let connection = open_connection(&self.client, self.command_timeout).await?;
            info!("Redis reconnected");
            self.connection = Some(connection);
        }

        self.connection
            .as_mut()
            .ok_or_else(|| OobError::Internal("Redis connection missing".into()))
    }
}

#[async_trait]
impl AttestationCache for RedisCache {
    async fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let command_timeout = self.command_timeout;
        let connection = self.connection().await?;

        let mut cmd = redis::cmd("SETEX");
        cmd.arg(key).arg(ttl.as_secs()).arg(value);
        let outcome = timeout(command_timeout, cmd.query_async::<_, ()>(connection)).await;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                if e.is_connection_dropped() || e.is_io_error() || e.is_timeout() {
                    self.drop_connection();
                }
                Err(OobError::from(e))
            }
            Err(_) => {
                self.drop_connection();
                Err(OobError::Cache(format!("SETEX {key} timed out")))
            }
        }
    }
}

impl RedisCache {
    fn drop_connection(&mut self) {
        if self.connection.take().is_some() {
            warn!("Redis connection lost");
        }
        self.next_attempt = Instant::now() + RECONNECT_WAIT;
    }
}

/// Connect and `PING`, both within `limit`
async fn open_connection(
    client: &redis::Client,
    limit: Duration,
) -> Result<MultiplexedConnection> {
    let handshake = async {
        let mut connection = client.get_multiplexed_tokio_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok::<_, OobError>(connection)
    };

    timeout(limit, handshake).await.map_err(|_| {
        OobError::Cache(format!("Redis did not answer PING within {}ms", limit.as_millis()))
    })?
}

/// Hide the password part of a Redis URL for logging
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
