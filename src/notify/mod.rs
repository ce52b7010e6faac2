// src/notify/mod.rs

use anyhow::{Context, Result};
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::config::MailConfig;

/// Mail the workbook over SMTPS. A missing attachment file is logged and
/// the message goes out without it; transport and auth failures abort.
#[instrument(level = "info", skip(mail), fields(server = %mail.server))]
pub fn send_report(mail: &MailConfig, attachment: &Path, last_row: u32) -> Result<()> {
    let body = format!(
        "Moex data in Excel file: В документе содержится: {} {}",
        last_row,
        row_noun(last_row)
    );
    let message = build_message(mail, &body, attachment)?;

    let mailer = SmtpTransport::relay(&mail.server)
        .with_context(|| format!("resolving SMTP relay {}", mail.server))?
        .port(mail.port)
        .credentials(Credentials::new(mail.username.clone(), mail.password.clone()))
        .build();

    mailer
        .send(&message)
        .with_context(|| format!("sending mail via {}:{}", mail.server, mail.port))?;
    info!(recipients = mail.to.len(), "mail sent");
    Ok(())
}

fn build_message(mail: &MailConfig, body: &str, attachment: &Path) -> Result<Message> {
    let from: Mailbox = mail
        .from
        .parse()
        .with_context(|| format!("parsing sender address {:?}", mail.from))?;
    let mut builder = Message::builder().from(from).subject(mail.subject.as_str());
    for to in &mail.to {
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("parsing recipient address {:?}", to))?;
        builder = builder.to(to);
    }

    let text = SinglePart::builder()
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string());
    let mut parts = MultiPart::mixed().singlepart(text);
    match fs::read(attachment) {
        Ok(bytes) => {
            let filename = attachment
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "moex.xlsx".to_string());
            let content_type = ContentType::parse("application/octet-stream")
                .context("octet-stream content type")?;
            parts = parts.singlepart(Attachment::new(filename).body(bytes, content_type));
        }
        Err(e) => warn!(
            path = %attachment.display(),
            error = %e,
            "attachment file missing, sending without it"
        ),
    }

    builder.multipart(parts).context("building message")
}

/// Declension of "строка" for a row count: 11–19 take the genitive plural,
/// otherwise the last digit decides.
pub fn row_noun(count: u32) -> &'static str {
    let remainder = count % 100;
    if (11..=19).contains(&remainder) {
        return "строк";
    }
    match remainder % 10 {
        1 => "строка",
        2..=4 => "строки",
        _ => "строк",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn mail_config() -> MailConfig {
        MailConfig {
            server: "smtp.yandex.ru".to_string(),
            port: 465,
            username: "mail@data.ru".to_string(),
            password: "my_pass".to_string(),
            from: "mail@data.ru".to_string(),
            to: vec!["mail@data.ru".to_string(), "backup@data.ru".to_string()],
            subject: "Moex data".to_string(),
        }
    }

    #[test]
    fn declension_follows_the_last_digit() {
        for (count, word) in [
            (1, "строка"),
            (2, "строки"),
            (4, "строки"),
            (5, "строк"),
            (10, "строк"),
            (11, "строк"),
            (14, "строк"),
            (19, "строк"),
            (21, "строка"),
            (22, "строки"),
            (25, "строк"),
            (100, "строк"),
            (101, "строка"),
            (111, "строк"),
            (122, "строки"),
        ] {
            assert_eq!(row_noun(count), word, "count {}", count);
        }
    }

    #[test]
    fn message_carries_the_attachment_when_present() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"workbook bytes").unwrap();

        let message = build_message(&mail_config(), "body text", file.path()).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("Content-Disposition: attachment"));
        assert!(formatted.contains("body text"));
    }

    #[test]
    fn missing_attachment_still_builds_a_message() {
        let message =
            build_message(&mail_config(), "body text", Path::new("/no/such/moex.xlsx")).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(!formatted.contains("Content-Disposition: attachment"));
        assert!(formatted.contains("body text"));
    }

    #[test]
    fn bad_recipient_address_is_an_error() {
        let mut cfg = mail_config();
        cfg.to = vec!["not an address".to_string()];
        assert!(build_message(&cfg, "body", Path::new("moex.xlsx")).is_err());
    }
}
