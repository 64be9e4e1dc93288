use bleep_async::{CharacteristicFlags, CharacteristicId, DeviceId};
use log::{info, warn};

use crate::context::Context;
use crate::error::CoreError;

/// Service UUID exposed by the `hackgnar/ble_ctf` training firmware: every flag characteristic
/// lives under this one service.
const BLE_CTF_SERVICE_UUID: &str = "000000ff-0000-1000-8000-00805f9b34fb";

/// Confidence threshold above which a write/read round-trip is treated as having surfaced a
/// flag. Fixed and arbitrary — exact thresholds need empirical selection against real
/// hardware; this value is a starting point, not a derived constant.
const ACCEPTANCE_THRESHOLD: f64 = 0.6;

/// One attempted flag characteristic and the confidence BLEEP assigned to its response.
#[derive(Clone, Debug, PartialEq)]
pub struct CtfAttempt {
    pub characteristic: String,
    pub payload: Vec<u8>,
    pub response: Vec<u8>,
    pub confidence: f64,
    pub accepted: bool,
}

/// Connects to `BLE_CTF_MAC`, walks every writable characteristic under the CTF service, and
/// probes each with `payload`, scoring the read-back response.
pub async fn run(ctx: &Context, payload: &[u8]) -> Result<Vec<CtfAttempt>, CoreError> {
    let mac = ctx.config.ble_ctf_mac.clone().ok_or(CoreError::CtfMacNotConfigured)?;

    let device_id = find_device_by_mac(ctx, &mac).await?;
    ctx.pool.connect_device(&device_id).await?;

    let mut attempts = Vec::new();
    for service in ctx.pool.get_services(&device_id).await? {
        if service.uuid.to_string() != BLE_CTF_SERVICE_UUID {
            continue;
        }
        for characteristic in ctx.pool.get_characteristics(&service.id).await? {
            if !characteristic.flags.contains(CharacteristicFlags::WRITE) {
                continue;
            }
            attempts.push(probe(ctx, &characteristic.id, payload).await?);
        }
    }

    if attempts.is_empty() {
        warn!("ble_ctf: no writable characteristics found under {BLE_CTF_SERVICE_UUID} for {mac}");
    }
    Ok(attempts)
}

async fn probe(ctx: &Context, id: &CharacteristicId, payload: &[u8]) -> Result<CtfAttempt, CoreError> {
    let before = ctx.pool.read_characteristic(id, 0).await.unwrap_or_default();
    ctx.pool
        .write_characteristic(id, payload.to_vec(), Default::default())
        .await?;
    let after = ctx.pool.read_characteristic(id, 0).await.unwrap_or_default();

    let confidence = score(payload, &before, &after);
    let accepted = confidence >= ACCEPTANCE_THRESHOLD;
    if accepted {
        info!("ble_ctf: characteristic {id} looks like a flag (confidence {confidence:.2})");
    }
    Ok(CtfAttempt {
        characteristic: id.to_string(),
        payload: payload.to_vec(),
        response: after,
        confidence,
        accepted,
    })
}

/// `bytes_changed / bytes_written` plus a bonus for how printable the response looks, since a
/// flag is almost always ASCII text. Both the 0.2 bonus weight and the overall shape are an
/// explicit, documented guess rather than a derived formula.
fn score(written: &[u8], before: &[u8], after: &[u8]) -> f64 {
    if written.is_empty() {
        return 0.0;
    }
    let changed = before
        .iter()
        .zip(after.iter())
        .filter(|(a, b)| a != b)
        .count()
        .max(after.len().saturating_sub(before.len()));
    let change_ratio = changed as f64 / written.len() as f64;

    let printable_ratio = if after.is_empty() {
        0.0
    } else {
        after.iter().filter(|b| b.is_ascii_graphic() || **b == b' ').count() as f64 / after.len() as f64
    };

    (change_ratio + printable_ratio * 0.2).min(1.0)
}

async fn find_device_by_mac(ctx: &Context, mac: &str) -> Result<DeviceId, CoreError> {
    let target: bleep_async::MacAddress = mac.parse().map_err(|_| CoreError::CtfMacNotConfigured)?;
    ctx.pool
        .get_devices()
        .await?
        .into_iter()
        .find(|device| device.mac_address == target)
        .map(|device| device.id)
        .ok_or(CoreError::NoAdapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_response_scores_zero() {
        assert_eq!(score(&[0x01], &[0x00], &[0x00]), 0.0);
    }

    #[test]
    fn changed_printable_response_passes_threshold() {
        let written = vec![0x01];
        let before = vec![0x00];
        let after = b"flag".to_vec();
        assert!(score(&written, &before, &after) >= ACCEPTANCE_THRESHOLD);
    }

    #[test]
    fn empty_payload_never_scores() {
        assert_eq!(score(&[], &[0x00], &[0x01]), 0.0);
    }
}
