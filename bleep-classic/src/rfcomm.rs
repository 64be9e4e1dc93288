use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::ClassicError;

/// A connected RFCOMM channel to a classic device. BLEEP doesn't open raw `AF_BLUETOOTH` sockets
/// itself; it relies on `rfcomm bind` (from `bluez-utils`) to expose the channel as a character
/// device node, then just reads and writes that node like any other file.
pub struct RfcommStream {
    inner: File,
}

impl RfcommStream {
    /// Opens the device node `rfcomm bind` created for `mac`'s channel, e.g. `/dev/rfcomm0`.
    pub async fn open(device_node: &str) -> Result<Self, ClassicError> {
        let inner = File::options().read(true).write(true).open(device_node).await?;
        Ok(Self { inner })
    }

    /// Binds `mac`'s RFCOMM `channel` to a fresh device node via `rfcomm bind`, then opens it.
    /// The caller is responsible for releasing the binding (`rfcomm release <node>`) once done.
    pub async fn open_channel(mac: &str, channel: u8, node: &str) -> Result<Self, ClassicError> {
        let status = tokio::process::Command::new("rfcomm")
            .args(["bind", node, mac, &channel.to_string()])
            .status()
            .await?;
        if !status.success() {
            return Err(ClassicError::RfcommBindFailed(format!("{node} {mac} {channel}")));
        }
        Self::open(node).await
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), ClassicError> {
        self.inner.write_all(data).await?;
        Ok(())
    }

    pub async fn read_to_end(&mut self, buf: &mut Vec<u8>) -> Result<usize, ClassicError> {
        Ok(self.inner.read_to_end(buf).await?)
    }
}
