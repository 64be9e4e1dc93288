use std::time::Duration;

use bleep_generated::{OrgBluezObexClient1, OrgBluezObexPhonebookAccess1, OrgBluezObexTransfer1};
use dbus::arg::{PropMap, Variant};
use dbus::nonblock::Proxy;
use dbus::nonblock::SyncConnection;
use dbus::Path;
use log::warn;
use sha2::{Digest, Sha256};
use tokio::time::sleep;

use crate::error::ClassicError;

/// How long a PBAP pull may go without reported progress before it's considered stalled.
pub const DEFAULT_WATCHDOG_SECS: u64 = 8;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VCardFormat {
    V21,
    V30,
}

impl VCardFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::V21 => "2.1",
            Self::V30 => "3.0",
        }
    }
}

/// Metadata recorded for one completed phonebook pull.
#[derive(Clone, Debug)]
pub struct PbapPullMetadata {
    pub repository: String,
    pub entry_count: usize,
    pub content_sha256: String,
    pub bytes: u64,
}

/// Pulls the entire phonebook from `repository` (e.g. `"int"`, `"sim1"`) on `mac`, writing the
/// resulting vCards to `target_file` and watchdogging the transfer so a stalled obexd session
/// doesn't hang BLEEP forever.
pub async fn pull_all(
    connection: &SyncConnection,
    mac: &str,
    repository: &str,
    format: VCardFormat,
    target_file: &str,
    watchdog: Duration,
) -> Result<PbapPullMetadata, ClassicError> {
    let client = Proxy::new("org.bluez.obex", "/org/bluez/obex", Duration::from_secs(30), connection);
    let session = client.create_session(mac, session_args()).await?;

    let result = run_pull(connection, &session, repository, format, target_file, watchdog).await;

    if let Err(err) = client.remove_session(session.clone()).await {
        warn!("failed to remove obex session {session}: {err}");
    }

    result
}

async fn run_pull(
    connection: &SyncConnection,
    session: &Path<'static>,
    repository: &str,
    format: VCardFormat,
    target_file: &str,
    watchdog: Duration,
) -> Result<PbapPullMetadata, ClassicError> {
    let pbap = Proxy::new("org.bluez.obex", session.clone(), Duration::from_secs(30), connection);
    pbap.select("int", repository).await?;

    let mut filters = PropMap::new();
    filters.insert("Format".to_owned(), Variant(Box::new(format.as_str().to_owned())));

    let (transfer_path, _properties) = pbap.pull_all(target_file, filters).await?;
    let transfer = Proxy::new("org.bluez.obex", transfer_path, Duration::from_secs(30), connection);

    await_transfer_completion(&transfer, watchdog).await?;

    let entry_count = count_vcards(target_file).await?;
    let content_sha256 = hash_file(target_file).await?;
    let bytes = transfer.transferred().await.unwrap_or(0);

    Ok(PbapPullMetadata {
        repository: repository.to_owned(),
        entry_count,
        content_sha256,
        bytes,
    })
}

async fn await_transfer_completion(
    transfer: &Proxy<'_, &SyncConnection>,
    watchdog: Duration,
) -> Result<(), ClassicError> {
    let mut last_transferred = 0u64;
    let mut since_progress = Duration::ZERO;

    loop {
        let status = transfer.status().await.unwrap_or_default();
        match status.as_str() {
            "complete" => return Ok(()),
            "error" => return Err(ClassicError::RepositoryRejected("transfer reported error status".to_owned())),
            _ => {}
        }

        let transferred = transfer.transferred().await.unwrap_or(last_transferred);
        if transferred > last_transferred {
            last_transferred = transferred;
            since_progress = Duration::ZERO;
        } else {
            since_progress += POLL_INTERVAL;
            if since_progress >= watchdog {
                return Err(ClassicError::TransferStalled { seconds: watchdog.as_secs() });
            }
        }

        sleep(POLL_INTERVAL).await;
    }
}

fn session_args() -> PropMap {
    let mut args = PropMap::new();
    args.insert("Target".to_owned(), Variant(Box::new("PBAP".to_owned())));
    args
}

async fn count_vcards(path: &str) -> Result<usize, ClassicError> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(contents.matches("BEGIN:VCARD").count())
}

async fn hash_file(path: &str) -> Result<String, ClassicError> {
    let contents = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vcard_format_strings() {
        assert_eq!(VCardFormat::V21.as_str(), "2.1");
        assert_eq!(VCardFormat::V30.as_str(), "3.0");
    }

    #[tokio::test]
    async fn counts_vcards_in_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("bleep-pbap-test-{}.vcf", std::process::id()));
        tokio::fs::write(&path, "BEGIN:VCARD\nEND:VCARD\nBEGIN:VCARD\nEND:VCARD\n").await.unwrap();
        let count = count_vcards(path.to_str().unwrap()).await.unwrap();
        assert_eq!(count, 2);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
