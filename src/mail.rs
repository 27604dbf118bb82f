use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

/// A fully rendered message, ready for any transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Mail transport seam. Sends are awaited but fire-and-forget in effect: no
/// retries, failures surface to the caller immediately.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingEmail) -> anyhow::Result<()>;
}

/// Production transport: SendGrid v3 over HTTPS.
pub struct SendgridMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl SendgridMailer {
    pub fn new(api_key: String, from_email: String, from_name: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from_email,
            from_name,
        }
    }
}

#[async_trait]
impl Mailer for SendgridMailer {
    async fn send(&self, mail: OutgoingEmail) -> anyhow::Result<()> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": mail.to }] }],
            "from": { "email": self.from_email, "name": self.from_name },
            "subject": mail.subject,
            "content": [
                { "type": "text/plain", "value": mail.text },
                { "type": "text/html", "value": mail.html },
            ],
        });
        self.client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("sendgrid request")?
            .error_for_status()
            .context("sendgrid response")?;
        debug!(subject = %mail.subject, "mail sent");
        Ok(())
    }
}

/// Development transport: renders end-to-end but only logs.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingEmail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.text, "mail (dev transport)");
        Ok(())
    }
}

// --- templates ---

pub fn welcome(name: &str, to: &str, url: &str, site_title: &str) -> OutgoingEmail {
    let subject = format!("Welcome to {site_title}");
    let html = format!(
        "<h1>Welcome to {site_title}, {name}!</h1>\
         <p>We're glad to have you. Your profile lives at <a href=\"{url}\">{url}</a>.</p>"
    );
    let text = format!(
        "Welcome to {site_title}, {name}!\nWe're glad to have you. Your profile: {url}"
    );
    OutgoingEmail {
        to: to.into(),
        subject,
        html,
        text,
    }
}

pub fn password_reset(name: &str, to: &str, url: &str, site_title: &str) -> OutgoingEmail {
    let subject = "Your password reset token (expires in 10 minutes)".to_string();
    let html = format!(
        "<h1>Hi {name},</h1>\
         <p>Forgot your {site_title} password? Follow <a href=\"{url}\">this link</a> to set a new one.</p>\
         <p>If you didn't request this, you can ignore this email.</p>"
    );
    let text = format!(
        "Hi {name},\nForgot your {site_title} password? Set a new one here: {url}\n\
         If you didn't request this, you can ignore this email."
    );
    OutgoingEmail {
        to: to.into(),
        subject,
        html,
        text,
    }
}

/// Contact-form relay sent to the site owner.
pub fn contact_notification(
    name: &str,
    email: &str,
    desc: &str,
    phone: &str,
    site_title: &str,
    master_email: &str,
) -> OutgoingEmail {
    let subject = format!("New email from your {site_title} website");
    let html = format!(
        "<h1>New contact request</h1>\
         <ul><li>Name: {name}</li><li>Email: {email}</li><li>Phone: {phone}</li></ul>\
         <p>{desc}</p>"
    );
    let text = format!("New contact request\nName: {name}\nEmail: {email}\nPhone: {phone}\n\n{desc}");
    OutgoingEmail {
        to: master_email.into(),
        subject,
        html,
        text,
    }
}

/// Copy of a contact-form submission sent back to its author.
pub fn contact_copy(
    name: &str,
    email: &str,
    desc: &str,
    phone: &str,
    site_title: &str,
) -> OutgoingEmail {
    let subject = format!("Your email to {site_title}");
    let html = format!(
        "<h1>Hi {name},</h1>\
         <p>This is a copy of your message to {site_title}:</p>\
         <p>{desc}</p><p>We'll reach you at {email} or {phone}.</p>"
    );
    let text = format!(
        "Hi {name},\nThis is a copy of your message to {site_title}:\n\n{desc}\n\n\
         We'll reach you at {email} or {phone}."
    );
    OutgoingEmail {
        to: email.into(),
        subject,
        html,
        text,
    }
}

#[cfg(test)]
mod template_tests {
    use super::*;

    #[test]
    fn welcome_addresses_the_new_user() {
        let mail = welcome("Ada", "ada@example.com", "https://site.test/myProfile", "Atelier");
        assert_eq!(mail.to, "ada@example.com");
        assert_eq!(mail.subject, "Welcome to Atelier");
        assert!(mail.html.contains("https://site.test/myProfile"));
        assert!(mail.text.contains("Ada"));
    }

    #[test]
    fn password_reset_embeds_the_plain_token_link() {
        let url = "https://site.test/reset-password/deadbeef";
        let mail = password_reset("Ada", "ada@example.com", url, "Atelier");
        assert!(mail.subject.contains("expires in 10 minutes"));
        assert!(mail.html.contains(url));
        assert!(mail.text.contains(url));
    }

    #[test]
    fn contact_notification_goes_to_the_master_address() {
        let mail = contact_notification(
            "Bob",
            "bob@example.com",
            "I'd like a quote",
            "555-0100",
            "Atelier",
            "owner@atelier.local",
        );
        assert_eq!(mail.to, "owner@atelier.local");
        assert!(mail.text.contains("bob@example.com"));
        assert!(mail.text.contains("I'd like a quote"));
    }

    #[test]
    fn contact_copy_goes_back_to_the_sender() {
        let mail = contact_copy("Bob", "bob@example.com", "I'd like a quote", "555-0100", "Atelier");
        assert_eq!(mail.to, "bob@example.com");
        assert_eq!(mail.subject, "Your email to Atelier");
    }
}
