//! LOGIN command handler.
//!
//! Credentials are not checked. The mailbox decides whether every
//! login succeeds or every login is refused.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle LOGIN. Returns `false` when the session should end.
pub async fn handle_login<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    reject: bool,
    stream: &mut BufReader<S>,
) -> bool {
    let resp = if reject {
        format!("{tag} NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
    } else {
        format!("{tag} OK LOGIN completed\r\n")
    };
    write_line(stream, &resp).await.is_ok() && !reject
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn run(tag: &str, reject: bool) -> (String, bool) {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        let keep_going = handle_login(tag, reject, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), keep_going)
    }

    #[tokio::test]
    async fn accepts_when_allowed() {
        let (output, keep_going) = run("A0001", false).await;
        assert!(keep_going);
        assert_eq!(output, "A0001 OK LOGIN completed\r\n");
    }

    #[tokio::test]
    async fn refuses_when_rejecting() {
        let (output, keep_going) = run("A0001", true).await;
        assert!(!keep_going);
        assert!(output.starts_with("A0001 NO "));
    }
}
