//! Attestation relay loop
//!
//! Takes attestations off the bus one at a time and writes each body to the
//! cache under its number-pair key. A message is fully handled (parsed,
//! keyed, written) before the next one is taken, so cache writes follow
//! arrival order. Later messages for the same number pair overwrite earlier
//! ones and restart the expiry.
//!
//! Bad subjects and failed writes are logged and the message is dropped.
//! Neither is retried, and neither stops the loop.

use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use super::bus::AttestationMessage;
use super::cache::{AttestationCache, ATTESTATION_TTL};
use super::subject::RoutingKey;

/// What happened to one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Body written under `key`
    Stored { key: String },
    /// Subject was not an attestation routing key
    Malformed { subject: String, reason: String },
    /// Cache write failed; the message is gone
    CacheFailed { key: String, error: String },
}

/// Running totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub received: u64,
    pub stored: u64,
    pub malformed: u64,
    pub cache_failures: u64,
}

impl RelayStats {
    fn record(&mut self, outcome: &RelayOutcome) {
        self.received += 1;
        match outcome {
            RelayOutcome::Stored { .. } => self.stored += 1,
            RelayOutcome::Malformed { .. } => self.malformed += 1,
            RelayOutcome::CacheFailed { .. } => self.cache_failures += 1,
        }
    }
}

/// Moves attestations from the bus into an [`AttestationCache`]
pub struct Relay<C: AttestationCache> {
    cache: C,
    stats: RelayStats,
}

impl<C: AttestationCache> Relay<C> {
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            stats: RelayStats::default(),
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Handle one message
    pub async fn handle(&mut self, message: &AttestationMessage) -> RelayOutcome {
        let outcome = match RoutingKey::parse(&message.subject) {
            Err(e) => {
                warn!(
                    subject = %message.subject,
                    reason = %e,
                    "Discarding attestation with malformed subject"
                );
                RelayOutcome::Malformed {
                    subject: message.subject.clone(),
                    reason: e.to_string(),
                }
            }
            Ok(routing_key) => {
                let key = routing_key.cache_key();
                match self
                    .cache
                    .set_with_expiry(&key, &message.payload, ATTESTATION_TTL)
                    .await
                {
                    Ok(()) => {
                        debug!(key = %key, bytes = message.payload.len(), "Attestation cached");
                        RelayOutcome::Stored { key }
                    }
                    Err(e) => {
                        error!(key = %key, error = %e, "Dropping attestation, cache write failed");
                        RelayOutcome::CacheFailed {
                            key,
                            error: e.to_string(),
                        }
                    }
                }
            }
        };

        self.stats.record(&outcome);
        outcome
    }

    /// Handle messages until the stream ends
    pub async fn run<S>(&mut self, mut messages: S) -> RelayStats
    where
        S: Stream<Item = AttestationMessage> + Unpin,
    {
        info!(ttl_secs = ATTESTATION_TTL.as_secs(), "Relaying attestations");

        while let Some(message) = messages.next().await {
            self.handle(&message).await;
        }

        info!(
            received = self.stats.received,
            stored = self.stats.stored,
            malformed = self.stats.malformed,
            cache_failures = self.stats.cache_failures,
            "Attestation stream ended"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OobError, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::Instant;

    /// In-memory cache that honours expiry against tokio's clock
    #[derive(Default)]
    struct MemoryCache {
        entries: HashMap<String, (Vec<u8>, Instant)>,
        writes: Vec<(String, Duration)>,
        fail_next: usize,
    }

    impl MemoryCache {
        fn get(&self, key: &str) -> Option<&[u8]> {
            self.entries
                .get(key)
                .filter(|(_, expires_at)| *expires_at > Instant::now())
                .map(|(value, _)| value.as_slice())
        }
    }

    #[async_trait]
    impl AttestationCache for MemoryCache {
        async fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
            if self.fail_next > 0 {
                self.fail_next -= 1;
                return Err(OobError::Cache("connection refused".into()));
            }
            self.writes.push((key.to_string(), ttl));
            self.entries
                .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
            Ok(())
        }
    }

    fn message(subject: &str, body: &'static [u8]) -> AttestationMessage {
        AttestationMessage::new(subject, body)
    }

    #[tokio::test]
    async fn test_stores_body_under_number_pair() {
        let mut relay = Relay::new(MemoryCache::default());
        let outcome = relay
            .handle(&message("ABCD.2025551234.EFGH.2025555678", b"{\"identity\":\"x\"}"))
            .await;

        assert_eq!(
            outcome,
            RelayOutcome::Stored {
                key: "oob:2025551234:2025555678".to_string()
            }
        );
        assert_eq!(
            relay.cache().get("oob:2025551234:2025555678"),
            Some(&b"{\"identity\":\"x\"}"[..])
        );
        assert_eq!(
            relay.cache().writes,
            vec![("oob:2025551234:2025555678".to_string(), Duration::from_secs(60))]
        );
    }

    #[tokio::test]
    async fn test_malformed_subject_is_not_written() {
        let mut relay = Relay::new(MemoryCache::default());
        let outcome = relay.handle(&message("ABCD.2025551234.EFGH", b"x")).await;

        assert!(matches!(outcome, RelayOutcome::Malformed { .. }));
        assert!(relay.cache().writes.is_empty());
        assert_eq!(relay.stats().malformed, 1);
    }

    #[tokio::test]
    async fn test_body_is_stored_verbatim() {
        let mut relay = Relay::new(MemoryCache::default());
        let body: &'static [u8] = &[0x00, 0xff, 0x10, b'\n'];
        relay.handle(&message("A.1.B.2", body)).await;
        assert_eq!(relay.cache().get("oob:1:2"), Some(body));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_pair_overwrites_and_resets_expiry() {
        let mut relay = Relay::new(MemoryCache::default());
        relay.handle(&message("ABCD.100.EFGH.200", b"first")).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        relay.handle(&message("WXYZ.100.QRST.200", b"second")).await;

        // 75s after the first write, 45s after the second
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(relay.cache().get("oob:100:200"), Some(&b"second"[..]));

        tokio::time::advance(Duration::from_secs(16)).await;
        assert_eq!(relay.cache().get("oob:100:200"), None);
    }

    #[tokio::test]
    async fn test_cache_failure_drops_message_only() {
        let cache = MemoryCache {
            fail_next: 1,
            ..Default::default()
        };
        let mut relay = Relay::new(cache);

        let first = relay.handle(&message("A.1.B.2", b"lost")).await;
        assert!(matches!(first, RelayOutcome::CacheFailed { ref key, .. } if key == "oob:1:2"));

        let second = relay.handle(&message("A.3.B.4", b"kept")).await;
        assert!(matches!(second, RelayOutcome::Stored { .. }));
        assert_eq!(relay.cache().get("oob:1:2"), None);
        assert_eq!(relay.cache().get("oob:3:4"), Some(&b"kept"[..]));
    }

    #[tokio::test]
    async fn test_run_survives_bad_messages() {
        let messages = futures::stream::iter(vec![
            message("garbage", b"x"),
            message("A.1.B.2", b"one"),
            message("A.1.B", b"x"),
            message("A.1.B.2", b"two"),
            message("A.3.B.4", b"three"),
        ]);
        let mut relay = Relay::new(MemoryCache::default());

        let stats = relay.run(messages).await;
        assert_eq!(
            stats,
            RelayStats {
                received: 5,
                stored: 3,
                malformed: 2,
                cache_failures: 0
            }
        );
        assert_eq!(relay.cache().get("oob:1:2"), Some(&b"two"[..]));
        assert_eq!(relay.cache().get("oob:3:4"), Some(&b"three"[..]));
    }
}
