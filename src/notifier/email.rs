//! SMTP mail dispatch for drop alerts: STARTTLS relay, one message per
//! recipient, plain-text + HTML alternative bodies.

use crate::config::{AlertsConfig, EmailConfig};
use crate::models::{DropEvent, Recipient};
use anyhow::{Context, Result};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    subject_prefix: String,
    product_link: Option<String>,
}

impl Mailer {
    pub fn from_config(
        email: &EmailConfig,
        alerts: &AlertsConfig,
        product_link: Option<String>,
    ) -> Result<Self> {
        let sender: Mailbox = format!("{} <{}>", email.sender_name, email.sender_email)
            .parse()
            .with_context(|| format!("Invalid sender address {:?}", email.sender_email))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.smtp_server)
            .with_context(|| format!("Invalid SMTP relay {:?}", email.smtp_server))?
            .port(email.smtp_port)
            .credentials(Credentials::new(
                email.sender_email.clone(),
                email.sender_password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            sender,
            subject_prefix: alerts.subject_prefix.clone(),
            product_link: if alerts.include_product_link {
                product_link
            } else {
                None
            },
        })
    }

    pub async fn send_drop_alert(&self, recipient: &Recipient, event: &DropEvent) -> Result<()> {
        let to: Mailbox = format!("{} <{}>", recipient.name, recipient.email)
            .parse()
            .with_context(|| format!("Invalid recipient address {:?}", recipient.email))?;

        let link = self.product_link.as_deref().unwrap_or("");
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(format!("{}{}", self.subject_prefix, event.product_key))
            .multipart(MultiPart::alternative_plain_html(
                plain_body(&recipient.name, event, link),
                html_body(&recipient.name, event, link),
            ))
            .context("Could not build alert message")?;

        self.transport
            .send(message)
            .await
            .with_context(|| format!("SMTP send to {} failed", recipient.email))?;

        debug!("Alert mailed to {} ({})", recipient.name, recipient.email);
        Ok(())
    }
}

fn plain_body(recipient_name: &str, event: &DropEvent, link: &str) -> String {
    format!(
        "Dear {recipient_name},\n\n\
         Great news! The price for one of your tracked products has dropped!\n\n\
         Product: {product}\n\
         Old Price: ${old:.2}\n\
         New Price: ${new:.2}\n\
         You Save: ${savings:.2} ({pct:.1}% off)\n\n\
         Check it out at: {link}\n\n\
         Best regards,\n\
         Your Grocery Price Tracker\n",
        product = event.product_key,
        old = event.old_price,
        new = event.new_price,
        savings = event.savings_amount,
        pct = event.savings_percentage,
    )
}

fn html_body(recipient_name: &str, event: &DropEvent, link: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #f8f9fa; padding: 20px; border-radius: 10px;">
    <h2 style="color: #28a745;">Price Drop Alert!</h2>
    <p>Dear {recipient_name},</p>
    <p>Great news! The price for one of your tracked products has dropped!</p>
    <div style="background-color: white; padding: 15px; border-radius: 5px; margin: 20px 0;">
      <p><strong>Product:</strong> {product}</p>
      <p><strong>Old Price:</strong> <span style="text-decoration: line-through; color: red;">${old:.2}</span></p>
      <p><strong>New Price:</strong> <span style="color: green; font-weight: bold;">${new:.2}</span></p>
      <p><strong>You Save:</strong> <span style="color: green; font-weight: bold;">${savings:.2} ({pct:.1}% off)</span></p>
    </div>
    <div style="text-align: center; margin: 20px 0;">
      <a href="{link}" style="background-color: #28a745; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; display: inline-block;">Check it out!</a>
    </div>
    <p>Best regards,<br>Your Grocery Price Tracker</p>
  </div>
</body>
</html>"#,
        product = event.product_key,
        old = event.old_price,
        new = event.new_price,
        savings = event.savings_amount,
        pct = event.savings_percentage,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_carry_the_numbers() {
        let event = DropEvent::new("Maggi Masala instant noodles 9.8 oz", 4.99, 3.99);

        let plain = plain_body("Ravi", &event, "https://example.com/sale");
        assert!(plain.contains("Old Price: $4.99"));
        assert!(plain.contains("New Price: $3.99"));
        assert!(plain.contains("You Save: $1.00 (20.0% off)"));
        assert!(plain.contains("https://example.com/sale"));

        let html = html_body("Ravi", &event, "https://example.com/sale");
        assert!(html.contains("$3.99"));
        assert!(html.contains("(20.0% off)"));
        assert!(html.contains(r#"href="https://example.com/sale""#));
    }
}
