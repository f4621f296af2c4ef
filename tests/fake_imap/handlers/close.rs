//! CLOSE command handler.
//!
//! Deselects the current folder. Nothing is expunged because the fake
//! server never marks messages deleted.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle CLOSE. Returns the new selection (always `None`).
pub async fn handle_close<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) -> Option<String> {
    let resp = if selected_folder.is_some() {
        format!("{tag} OK CLOSE completed\r\n")
    } else {
        format!("{tag} BAD No folder selected\r\n")
    };
    let _ = write_line(stream, &resp).await;
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn run(tag: &str, selected: Option<&str>) -> String {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        let after = handle_close(tag, selected, &mut stream).await;
        assert!(after.is_none());
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn closes_selected_folder() {
        let output = run("A7", Some("INBOX")).await;
        assert_eq!(output, "A7 OK CLOSE completed\r\n");
    }

    #[tokio::test]
    async fn bad_without_selection() {
        let output = run("A7", None).await;
        assert!(output.contains("A7 BAD No folder selected"));
    }
}
