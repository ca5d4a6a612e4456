use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{Address, AsyncTransport, Tokio1Executor};
use metrics::counter;

use crate::digest::Digest;

pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const SMTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("mail settings incomplete, missing: {}", .0.join(", "))]
    ConfigMissing(Vec<&'static str>),

    #[error("mail credentials incomplete, missing: {}", .0.join(", "))]
    CredentialMissing(Vec<&'static str>),

    #[error("invalid mail address {field}: {source}")]
    InvalidAddress {
        field: &'static str,
        source: lettre::address::AddressError,
    },

    #[error("building mail message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp relay {host}: {source}")]
    Relay {
        host: String,
        source: lettre::transport::smtp::Error,
    },

    #[error("sending mail: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failure reported by a transport other than lettre's SMTP client.
    #[error("sending mail: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// Missing settings or credentials, as opposed to a failed send.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            DeliveryError::ConfigMissing(_)
                | DeliveryError::CredentialMissing(_)
                | DeliveryError::InvalidAddress { .. }
        )
    }
}

/// Mail settings after env overrides; fields may still be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailSettings {
    pub host: String,
    pub port: Option<u16>,
    /// STARTTLS on a plain connection; otherwise implicit TLS.
    pub use_starttls: bool,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_email: String,
    pub to_name: String,
    pub to_email: String,
}

/// Validated SMTP target. Only `MailSettings::validate` builds one.
#[derive(Clone)]
pub struct SmtpTarget {
    pub host: String,
    pub port: u16,
    pub use_starttls: bool,
    pub username: String,
    password: String,
    pub from: Mailbox,
    pub to: Mailbox,
}

impl std::fmt::Debug for SmtpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_starttls", &self.use_starttls)
            .field("username", &self.username)
            .field("password_len", &self.password.len())
            .field("from", &self.from.email)
            .field("to", &self.to.email)
            .finish()
    }
}

fn mailbox(field: &'static str, name: &str, email: &str) -> Result<Mailbox, DeliveryError> {
    let address: Address = email
        .trim()
        .parse()
        .map_err(|source| DeliveryError::InvalidAddress { field, source })?;
    let name = name.trim();
    Ok(Mailbox::new(
        (!name.is_empty()).then(|| name.to_string()),
        address,
    ))
}

impl MailSettings {
    pub fn validate(&self) -> Result<SmtpTarget, DeliveryError> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("email.smtp_host");
        }
        let port = match self.port {
            Some(p) if p != 0 => p,
            _ => {
                missing.push("email.smtp_port");
                0
            }
        };
        if self.from_email.trim().is_empty() {
            missing.push("email.send.from_email");
        }
        if self.to_email.trim().is_empty() {
            missing.push("email.send.to_email");
        }
        if !missing.is_empty() {
            return Err(DeliveryError::ConfigMissing(missing));
        }

        let mut missing = Vec::new();
        if self.username.trim().is_empty() {
            missing.push("email.auth.user_email");
        }
        if self.password.is_empty() {
            missing.push("email.auth.password");
        }
        if !missing.is_empty() {
            return Err(DeliveryError::CredentialMissing(missing));
        }

        Ok(SmtpTarget {
            host: self.host.trim().to_string(),
            port,
            use_starttls: self.use_starttls,
            username: self.username.trim().to_string(),
            password: self.password.clone(),
            from: mailbox("email.send.from_email", &self.from_name, &self.from_email)?,
            to: mailbox("email.send.to_email", &self.to_name, &self.to_email)?,
        })
    }
}

pub fn build_message(digest: &Digest, target: &SmtpTarget) -> Result<Message, DeliveryError> {
    let msg = Message::builder()
        .from(target.from.clone())
        .to(target.to.clone())
        .subject(digest.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            digest.text.clone(),
            digest.html.clone(),
        ))?;
    Ok(msg)
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, target: &SmtpTarget, message: Message) -> Result<(), DeliveryError>;
}

/// SMTP over lettre's tokio transport.
pub struct SmtpMailer {
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(SMTP_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, target: &SmtpTarget, message: Message) -> Result<(), DeliveryError> {
        let builder = if target.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&target.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&target.host)
        }
        .map_err(|source| DeliveryError::Relay {
            host: target.host.clone(),
            source,
        })?;

        let mailer = builder
            .port(target.port)
            .credentials(Credentials::new(
                target.username.clone(),
                target.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();

        mailer.send(message).await?;
        Ok(())
    }
}

/// All-or-nothing: validate, build, send. Nothing is retried.
pub async fn deliver(
    digest: &Digest,
    settings: &MailSettings,
    transport: &dyn MailTransport,
) -> Result<(), DeliveryError> {
    let target = settings.validate()?;
    let message = build_message(digest, &target)?;
    match transport.send(&target, message).await {
        Ok(()) => {
            counter!("digest_deliveries_total").increment(1);
            tracing::info!(target: "notify", to = %target.to.email, subject = %digest.subject, "digest sent");
            Ok(())
        }
        Err(e) => {
            counter!("digest_delivery_failures_total").increment(1);
            tracing::warn!(target: "notify", error = %e, "digest delivery failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> MailSettings {
        MailSettings {
            host: "smtp.example.test".into(),
            port: Some(465),
            use_starttls: false,
            username: "bot@example.test".into(),
            password: "pw".into(),
            from_name: "Digest Bot".into(),
            from_email: "bot@example.test".into(),
            to_name: String::new(),
            to_email: "me@example.test".into(),
        }
    }

    #[test]
    fn missing_transport_fields_are_listed() {
        let s = MailSettings {
            host: " ".into(),
            to_email: String::new(),
            ..complete()
        };
        match s.validate() {
            Err(DeliveryError::ConfigMissing(f)) => {
                assert_eq!(f, vec!["email.smtp_host", "email.send.to_email"])
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn config_is_checked_before_credentials() {
        let s = MailSettings {
            port: None,
            password: String::new(),
            ..complete()
        };
        assert!(matches!(s.validate(), Err(DeliveryError::ConfigMissing(_))));
    }

    #[test]
    fn missing_password_is_credential_error() {
        let s = MailSettings {
            password: String::new(),
            ..complete()
        };
        let err = s.validate().unwrap_err();
        assert!(matches!(err, DeliveryError::CredentialMissing(ref f) if f == &vec!["email.auth.password"]));
        assert!(err.is_config());
    }

    #[test]
    fn bad_address_is_reported() {
        let s = MailSettings {
            to_email: "not-an-address".into(),
            ..complete()
        };
        assert!(matches!(
            s.validate(),
            Err(DeliveryError::InvalidAddress { field: "email.send.to_email", .. })
        ));
    }

    #[test]
    fn target_debug_hides_password() {
        let t = complete().validate().unwrap();
        assert!(!format!("{t:?}").contains("\"pw\""));
        assert_eq!(t.from.name.as_deref(), Some("Digest Bot"));
        assert!(t.to.name.is_none());
    }

    #[tokio::test]
    async fn smtp_failure_keeps_its_source() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let t = MailSettings {
            host: "localhost".into(),
            port: Some(port),
            ..complete()
        }
        .validate()
        .unwrap();
        let digest = Digest {
            subject: "s".into(),
            html: "<p>h</p>".into(),
            text: "h".into(),
        };
        let msg = build_message(&digest, &t).unwrap();

        let err = SmtpMailer::new()
            .with_timeout(5)
            .send(&t, msg)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::Smtp(_) | DeliveryError::Relay { .. }
        ));
        assert!(!err.is_config());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn message_builds_as_alternative() {
        let t = complete().validate().unwrap();
        let digest = Digest {
            subject: "[Wanted] 1 new listing".into(),
            html: "<p>hi</p>".into(),
            text: "hi".into(),
        };
        let raw = String::from_utf8(build_message(&digest, &t).unwrap().formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Subject: [Wanted] 1 new listing"));
    }
}
