pub mod email;

pub use email::{deliver, DeliveryError, MailSettings, MailTransport, SmtpMailer, SmtpTarget};
