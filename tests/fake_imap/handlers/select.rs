//! SELECT command handler.
//!
//! Opens a folder and reports its size (`* N EXISTS`) plus the flag
//! metadata async-imap parses into its `Mailbox` value. Returns the
//! selected folder name, or `None` if it does not exist.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_select<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> Option<String> {
    let Some(folder) = mailbox.get_folder(folder_name) else {
        let _ = write_line(stream, &format!("{tag} NO Folder not found\r\n")).await;
        return None;
    };

    let mut lines = vec![
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n".to_string(),
        format!("* {} EXISTS\r\n", folder.emails.len()),
        "* 0 RECENT\r\n".to_string(),
        "* OK [UIDVALIDITY 1]\r\n".to_string(),
        "* OK [PERMANENTFLAGS (\\Seen)] Limited\r\n".to_string(),
    ];
    if let Some(pos) = folder.emails.iter().position(|e| !e.seen) {
        lines.push(format!("* OK [UNSEEN {}]\r\n", pos + 1));
    }
    lines.push(format!("{tag} OK [READ-WRITE] SELECT completed\r\n"));

    for line in &lines {
        if write_line(stream, line).await.is_err() {
            return None;
        }
    }
    Some(folder_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    async fn run(tag: &str, folder_name: &str, mailbox: &Mailbox) -> (String, Option<String>) {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        let selected = handle_select(tag, folder_name, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), selected)
    }

    #[tokio::test]
    async fn selects_existing_folder() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(false, RAW)
            .email(true, RAW)
            .build();

        let (output, selected) = run("A2", "INBOX", &mailbox).await;

        assert_eq!(selected.as_deref(), Some("INBOX"));
        assert!(output.contains("* 2 EXISTS\r\n"));
        assert!(output.ends_with("A2 OK [READ-WRITE] SELECT completed\r\n"));
    }

    #[tokio::test]
    async fn missing_folder_is_no() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();

        let (output, selected) = run("A2", "Archive", &mailbox).await;

        assert!(selected.is_none());
        assert_eq!(output, "A2 NO Folder not found\r\n");
    }

    #[tokio::test]
    async fn reports_first_unseen_position() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(true, RAW)
            .email(false, RAW)
            .build();

        let (output, _) = run("A2", "INBOX", &mailbox).await;
        assert!(output.contains("* OK [UNSEEN 2]"));
    }

    #[tokio::test]
    async fn omits_unseen_when_everything_read() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(true, RAW)
            .build();

        let (output, _) = run("A2", "INBOX", &mailbox).await;
        assert!(!output.contains("UNSEEN"));
    }
}
