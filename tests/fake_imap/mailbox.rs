//! Mailbox state served by the fake IMAP server
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .email(false, raw_unread)
//!         .email(true, raw_read)
//!     .build();
//! ```
//!
//! Messages are addressed by sequence number, which is simply their
//! 1-based position in the folder. A FETCH sets `seen`, so the state
//! lives behind a `Mutex` inside the server and tests can inspect it
//! afterwards through `FakeImapServer::mailbox`.

#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
    /// Answer every LOGIN with NO.
    pub reject_login: bool,
}

impl Mailbox {
    /// Look up a folder by name (case-sensitive).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub emails: Vec<TestEmail>,
}

impl Folder {
    /// The message with 1-based sequence number `seq`.
    pub fn by_seq(&self, seq: u32) -> Option<&TestEmail> {
        let idx = usize::try_from(seq).ok()?.checked_sub(1)?;
        self.emails.get(idx)
    }

    pub fn by_seq_mut(&mut self, seq: u32) -> Option<&mut TestEmail> {
        let idx = usize::try_from(seq).ok()?.checked_sub(1)?;
        self.emails.get_mut(idx)
    }

    /// Highest sequence number in use (0 for an empty folder).
    pub fn last_seq(&self) -> u32 {
        u32::try_from(self.emails.len()).unwrap()
    }
}

/// A stored message: its `\Seen` flag and the raw RFC 5322 bytes.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub seen: bool,
    pub raw: Vec<u8>,
}

pub struct MailboxBuilder {
    folders: Vec<Folder>,
    reject_login: bool,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
            reject_login: false,
        }
    }

    /// Start a new folder. Following `.email()` calls add to it.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            emails: Vec::new(),
        });
        self
    }

    /// Append a message to the current folder.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn email(mut self, seen: bool, raw: &[u8]) -> Self {
        self.folders
            .last_mut()
            .expect("call .folder() before .email()")
            .emails
            .push(TestEmail {
                seen,
                raw: raw.to_vec(),
            });
        self
    }

    /// Make the server refuse all credentials.
    pub fn reject_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
            reject_login: self.reject_login,
        }
    }
}
