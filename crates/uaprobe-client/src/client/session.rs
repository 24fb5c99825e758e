// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Secured session bootstrap and the session handle.

use std::fmt;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::certificate::ClientCertificate;
use crate::channel::{ChannelSettings, SecureChannel};
use crate::codec::{MessageContext, RequestBody, ResponseBody, UserIdentity};
use crate::dispatch::ChannelFactory;
use crate::error::{ChannelError, ProbeError, ProbeResult, SessionError};
use crate::types::{ClientConfig, EndpointDescription, StatusCode};

// =============================================================================
// SessionState
// =============================================================================

/// State of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// CreateSession in progress.
    #[default]
    Creating,

    /// ActivateSession in progress.
    Activating,

    /// Session is active and ready for use.
    Active,

    /// Session is being closed.
    Closing,

    /// Session is closed.
    Closed,

    /// A transport or protocol failure invalidated the session.
    Failed,
}

impl SessionState {
    /// Returns `true` if the session can carry requests.
    #[inline]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if the session has failed.
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => write!(f, "Creating"),
            Self::Activating => write!(f, "Activating"),
            Self::Active => write!(f, "Active"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// An activated session bound to its secured channel.
///
/// The handle is owned by one workflow run. It is invalidated by
/// [`close`](Self::close) or by any fatal failure on its channel.
pub struct Session {
    id: String,
    endpoint: EndpointDescription,
    channel: Mutex<Box<dyn SecureChannel>>,
    state: RwLock<SessionState>,
    revised_timeout: Duration,
    context: MessageContext,
}

impl Session {
    /// Returns the server-assigned session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the endpoint the session was opened on.
    pub fn endpoint(&self) -> &EndpointDescription {
        &self.endpoint
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Returns `true` if the session can carry requests.
    pub fn is_usable(&self) -> bool {
        self.state().is_usable()
    }

    /// Returns the timeout granted by the server.
    pub fn revised_timeout(&self) -> Duration {
        self.revised_timeout
    }

    /// Returns the message context negotiated on the session's channel.
    pub fn context(&self) -> &MessageContext {
        &self.context
    }

    /// Marks the session unusable.
    pub fn invalidate(&self) {
        *self.state.write() = SessionState::Failed;
    }

    /// Sends a request on the session's channel.
    pub(crate) async fn call(&self, body: RequestBody) -> Result<ResponseBody, ChannelError> {
        let mut channel = self.channel.lock().await;
        let result = channel.request(body).await;

        if let Err(e) = &result {
            let session_gone = matches!(
                e,
                ChannelError::ServiceFault { status }
                    if *status == StatusCode::BAD_SESSION_ID_INVALID
                        || *status == StatusCode::BAD_SESSION_CLOSED
            );
            if e.is_fatal() || session_gone {
                tracing::warn!(session_id = %self.id, error = %e, "Session invalidated");
                self.invalidate();
            }
        }
        result
    }

    /// Closes the session and its channel.
    pub async fn close(self) {
        let was_usable = self.is_usable();
        *self.state.write() = SessionState::Closing;

        let mut channel = self.channel.lock().await;
        if was_usable {
            let result = channel
                .request(RequestBody::CloseSession {
                    delete_subscriptions: true,
                })
                .await;
            if let Err(e) = result {
                tracing::debug!(session_id = %self.id, error = %e, "CloseSession failed");
            }
        }
        channel.close().await;
        drop(channel);

        *self.state.write() = SessionState::Closed;
        tracing::info!(session_id = %self.id, "Session closed");
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint.endpoint_url)
            .field("state", &self.state())
            .field("revised_timeout", &self.revised_timeout)
            .finish()
    }
}

// =============================================================================
// SessionBootstrap
// =============================================================================

/// Opens the secured channel and the session on the selected endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionBootstrap;

impl SessionBootstrap {
    /// Opens a channel with the endpoint's security, then creates and
    /// activates an anonymous session.
    ///
    /// The channel is closed before returning on every failure after it
    /// was created.
    pub async fn open(
        config: &ClientConfig,
        endpoint: &EndpointDescription,
        factory: &dyn ChannelFactory,
        certificate: Option<&ClientCertificate>,
    ) -> ProbeResult<Session> {
        let url = endpoint.endpoint_url.as_str();
        let settings = ChannelSettings::secured(config, endpoint, certificate.cloned());
        settings
            .context
            .check_string("endpoint_url", url)
            .and_then(|()| {
                settings
                    .context
                    .check_string("session_name", &config.session_name())
            })
            .map_err(|e| ProbeError::channel_establishment(url, e))?;

        let mut channel = factory
            .create(url, settings)
            .map_err(|e| ProbeError::channel_establishment(url, e))?;

        tracing::info!(
            endpoint = %url,
            mode = %endpoint.security_mode,
            binding = factory.name(),
            "Opening secured channel"
        );

        if let Err(e) = channel.open().await {
            channel.close().await;
            return Err(ProbeError::channel_establishment(url, e));
        }

        match establish(channel.as_mut(), config, endpoint, certificate).await {
            Ok((id, revised_timeout)) => {
                let context = channel.context().clone();
                tracing::info!(session_id = %id, endpoint = %url, "Session active");
                Ok(Session {
                    id,
                    endpoint: endpoint.clone(),
                    channel: Mutex::new(channel),
                    state: RwLock::new(SessionState::Active),
                    revised_timeout,
                    context,
                })
            }
            Err(e) => {
                channel.close().await;
                Err(e)
            }
        }
    }
}

async fn establish(
    channel: &mut dyn SecureChannel,
    config: &ClientConfig,
    endpoint: &EndpointDescription,
    certificate: Option<&ClientCertificate>,
) -> ProbeResult<(String, Duration)> {
    let url = endpoint.endpoint_url.as_str();

    tracing::debug!(endpoint = %url, state = %SessionState::Creating, "CreateSession");
    let create = RequestBody::CreateSession {
        client_description: config.application_description(),
        endpoint_url: url.to_string(),
        session_name: config.session_name(),
        client_certificate: certificate.map(ClientCertificate::to_base64),
        requested_session_timeout_ms: config.session_timeout.as_millis() as u64,
        max_response_message_size: channel.context().max_message_size() as u64,
    };

    let (session_id, token, revised_ms) = match channel.request(create).await {
        Ok(ResponseBody::CreateSession {
            session_id,
            authentication_token,
            revised_session_timeout_ms,
            ..
        }) => (session_id, authentication_token, revised_session_timeout_ms),
        Ok(_) => {
            return Err(ProbeError::channel_establishment(
                url,
                ChannelError::UnexpectedResponse {
                    service: "CreateSession",
                },
            ))
        }
        Err(ChannelError::ServiceFault { status }) => {
            return Err(SessionError::CreateRejected { status }.into())
        }
        Err(e) => return Err(ProbeError::channel_establishment(url, e)),
    };

    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(SessionError::MissingToken)?;
    channel.set_authentication_token(Some(token));

    tracing::debug!(endpoint = %url, state = %SessionState::Activating, "ActivateSession");
    match channel
        .request(RequestBody::ActivateSession {
            user_identity: UserIdentity::Anonymous,
        })
        .await
    {
        Ok(ResponseBody::ActivateSession {}) => {}
        Ok(_) => {
            return Err(ProbeError::channel_establishment(
                url,
                ChannelError::UnexpectedResponse {
                    service: "ActivateSession",
                },
            ))
        }
        Err(ChannelError::ServiceFault { status }) => {
            return Err(SessionError::ActivateRejected { status }.into())
        }
        Err(e) => return Err(ProbeError::channel_establishment(url, e)),
    }

    Ok((session_id, Duration::from_millis(revised_ms)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::simulator::{LoopbackFactory, ServerFixture};
    use crate::transport::TCP_PROFILE_URI;
    use crate::types::{MessageLimits, SecurityMode};

    fn secure_endpoint() -> EndpointDescription {
        EndpointDescription::new(
            "scheme-a://host:48040",
            SecurityMode::SignAndEncrypt,
            TCP_PROFILE_URI,
        )
    }

    fn certificate() -> ClientCertificate {
        ClientCertificate::from_der(vec![0x30, 0x00])
    }

    #[tokio::test]
    async fn test_open_and_close() {
        let fixture = ServerFixture::builder().endpoint(secure_endpoint()).build();
        let factory = LoopbackFactory::new(fixture.clone(), TCP_PROFILE_URI);
        let cert = certificate();

        let session = SessionBootstrap::open(
            &ClientConfig::default(),
            &secure_endpoint(),
            &factory,
            Some(&cert),
        )
        .await
        .unwrap();

        assert!(session.is_usable());
        assert!(!session.id().is_empty());
        assert_eq!(session.endpoint().security_mode, SecurityMode::SignAndEncrypt);
        assert_eq!(fixture.sessions_created(), 1);
        assert_eq!(fixture.active_channels(), 1);

        session.close().await;
        assert_eq!(fixture.active_channels(), 0);
        assert_eq!(fixture.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_missing_certificate_is_channel_failure() {
        let fixture = ServerFixture::builder().endpoint(secure_endpoint()).build();
        let factory = LoopbackFactory::new(fixture.clone(), TCP_PROFILE_URI);

        let err = SessionBootstrap::open(&ClientConfig::default(), &secure_endpoint(), &factory, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ChannelEstablishmentFailure);
        assert_eq!(fixture.channels_opened(), 0);
    }

    #[tokio::test]
    async fn test_rejected_session_closes_channel() {
        let fixture = ServerFixture::builder()
            .endpoint(secure_endpoint())
            .reject_sessions(StatusCode::BAD_TOO_MANY_SESSIONS)
            .build();
        let factory = LoopbackFactory::new(fixture.clone(), TCP_PROFILE_URI);
        let cert = certificate();

        let err = SessionBootstrap::open(
            &ClientConfig::default(),
            &secure_endpoint(),
            &factory,
            Some(&cert),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ProbeError::SessionRejected(SessionError::CreateRejected { status })
                if status == StatusCode::BAD_TOO_MANY_SESSIONS
        ));
        assert_eq!(fixture.active_channels(), 0);
    }

    #[tokio::test]
    async fn test_overlong_endpoint_url_is_channel_failure() {
        let endpoint = EndpointDescription::new(
            format!("scheme-a://{}:48040", "h".repeat(64)),
            SecurityMode::SignAndEncrypt,
            TCP_PROFILE_URI,
        );
        let fixture = ServerFixture::builder().endpoint(endpoint.clone()).build();
        let factory = LoopbackFactory::new(fixture.clone(), TCP_PROFILE_URI);
        let config = ClientConfig::builder()
            .limits(MessageLimits {
                max_string_length: 32,
                ..MessageLimits::default()
            })
            .build()
            .unwrap();
        let cert = certificate();

        let err = SessionBootstrap::open(&config, &endpoint, &factory, Some(&cert))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ChannelEstablishmentFailure);
        assert_eq!(fixture.channels_opened(), 0);
    }

    #[tokio::test]
    async fn test_rejected_channel() {
        let fixture = ServerFixture::builder()
            .endpoint(secure_endpoint())
            .reject_channels(StatusCode::BAD_SECURITY_POLICY_REJECTED)
            .build();
        let factory = LoopbackFactory::new(fixture.clone(), TCP_PROFILE_URI);
        let cert = certificate();

        let err = SessionBootstrap::open(
            &ClientConfig::default(),
            &secure_endpoint(),
            &factory,
            Some(&cert),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ChannelEstablishmentFailure);
        assert_eq!(fixture.sessions_created(), 0);
        assert_eq!(fixture.active_channels(), 0);
    }
}
