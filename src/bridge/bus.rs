//! NATS connection for the attestation feed
//!
//! Authenticates with the user JWT and nkey seed from the `.creds` envelope,
//! signing the server nonce with the user key. The connection reconnects
//! forever with a fixed delay; async-nats does not buffer a backlog of
//! missed messages, so delivery is at most once.

use std::sync::Arc;
use std::time::Duration;

use async_nats::{Client, ConnectOptions, Event, Subscriber};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::config::NatsArgs;
use crate::credentials::{decode_user_jwt, CredentialEnvelope};
use crate::types::{OobError, Result};

/// Subject matching every attestation
pub const ALL_SUBJECTS: &str = ">";

/// Keep-alive ping interval
const PING_INTERVAL: Duration = Duration::from_secs(15);

/// Fixed wait between reconnect attempts
const RECONNECT_WAIT: Duration = Duration::from_secs(1);

/// Initial connection timeout
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// One attestation as delivered by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationMessage {
    pub subject: String,
    pub payload: Bytes,
}

impl AttestationMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }
}

impl From<async_nats::Message> for AttestationMessage {
    fn from(message: async_nats::Message) -> Self {
        Self {
            subject: message.subject.to_string(),
            payload: message.payload,
        }
    }
}

/// NATS client authenticated as the relay's user
pub struct BusClient {
    client: Client,
}

impl BusClient {
    /// Connect using the JWT and seed from a credentials envelope
    pub async fn connect(
        args: &NatsArgs,
        envelope: &CredentialEnvelope,
        name: &str,
    ) -> Result<Self> {
        let jwt = decode_user_jwt(&envelope.jwt)?;
        let key_pair = Arc::new(
            nkeys::KeyPair::from_seed(&envelope.seed)
                .map_err(|e| OobError::InvalidCredentials(format!("user seed: {e}")))?,
        );
        if key_pair.public_key() != jwt.claims.sub {
            return Err(OobError::InvalidCredentials(
                "user seed does not match the JWT subject".to_string(),
            ));
        }

        info!(
            url = %args.nats_url,
            user = %jwt.claims.sub,
            account = %jwt.claims.iss,
            "Connecting to NATS"
        );

        let options = ConnectOptions::with_jwt(envelope.jwt.clone(), move |nonce| {
            let key_pair = key_pair.clone();
            async move { key_pair.sign(&nonce).map_err(async_nats::AuthError::new) }
        })
        .name(name)
        .require_tls(args.require_tls)
        .ping_interval(PING_INTERVAL)
        .connection_timeout(CONNECTION_TIMEOUT)
        .max_reconnects(None)
        .reconnect_delay_callback(|_attempts| RECONNECT_WAIT)
        .subscription_capacity(args.subscription_capacity)
        .event_callback(|event| async move { log_event(event) });

        let client = options
            .connect(&args.nats_url)
            .await
            .map_err(|e| OobError::Nats(format!("Failed to connect: {e}")))?;

        info!(url = %args.nats_url, "Connected to NATS");
        Ok(Self { client })
    }

    /// Subscribe to a subject
    pub async fn subscribe(&self, subject: &str) -> Result<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| OobError::Nats(format!("Subscribe failed: {e}")))?;
        info!(subject = %subject, "Subscribed. Listening...");
        Ok(subscriber)
    }

    /// Every attestation on the bus, in delivery order
    pub async fn attestations(&self) -> Result<impl Stream<Item = AttestationMessage> + Unpin> {
        Ok(self.subscribe(ALL_SUBJECTS).await?.map(AttestationMessage::from))
    }
}

fn log_event(event: Event) {
    match event {
        Event::Connected => info!("NATS connected"),
        Event::Disconnected => warn!("NATS disconnected, reconnecting"),
        Event::SlowConsumer(sid) => {
            warn!(sid, "NATS slow consumer, attestations dropped")
        }
        Event::ServerError(e) => error!(error = %e, "NATS server error"),
        Event::ClientError(e) => error!(error = %e, "NATS client error"),
        other => info!(event = %other, "NATS event"),
    }
}
