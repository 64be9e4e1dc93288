use log::warn;

/// One piece of evidence a collector has observed about a device.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EvidenceType {
    ClassicDeviceClass,
    ClassicSdpRecords,
    ClassicServiceUuids,
    LeAddressTypeRandom,
    LeAddressTypePublic,
    LeGattServices,
    LeServiceUuids,
    LeAdvertisingData,
}

/// How much an evidence type is worth toward a classification decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Weight {
    Conclusive,
    Strong,
    Weak,
    Inconclusive,
}

/// Which transport an evidence type speaks to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Domain {
    Classic,
    Le,
}

impl EvidenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClassicDeviceClass => "CLASSIC_DEVICE_CLASS",
            Self::ClassicSdpRecords => "CLASSIC_SDP_RECORDS",
            Self::ClassicServiceUuids => "CLASSIC_SERVICE_UUIDS",
            Self::LeAddressTypeRandom => "LE_ADDRESS_TYPE_RANDOM",
            Self::LeAddressTypePublic => "LE_ADDRESS_TYPE_PUBLIC",
            Self::LeGattServices => "LE_GATT_SERVICES",
            Self::LeServiceUuids => "LE_SERVICE_UUIDS",
            Self::LeAdvertisingData => "LE_ADVERTISING_DATA",
        }
    }

    /// Parses a collector-reported evidence type name. Unknown names are not an error here;
    /// callers that need to log-and-skip should use [`parse_all`].
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "CLASSIC_DEVICE_CLASS" => Self::ClassicDeviceClass,
            "CLASSIC_SDP_RECORDS" => Self::ClassicSdpRecords,
            "CLASSIC_SERVICE_UUIDS" => Self::ClassicServiceUuids,
            "LE_ADDRESS_TYPE_RANDOM" => Self::LeAddressTypeRandom,
            "LE_ADDRESS_TYPE_PUBLIC" => Self::LeAddressTypePublic,
            "LE_GATT_SERVICES" => Self::LeGattServices,
            "LE_SERVICE_UUIDS" => Self::LeServiceUuids,
            "LE_ADVERTISING_DATA" => Self::LeAdvertisingData,
            _ => return None,
        })
    }

    pub fn weight(self) -> Weight {
        match self {
            Self::ClassicDeviceClass => Weight::Conclusive,
            Self::ClassicSdpRecords => Weight::Conclusive,
            Self::ClassicServiceUuids => Weight::Strong,
            Self::LeAddressTypeRandom => Weight::Conclusive,
            Self::LeAddressTypePublic => Weight::Inconclusive,
            Self::LeGattServices => Weight::Strong,
            Self::LeServiceUuids => Weight::Strong,
            Self::LeAdvertisingData => Weight::Weak,
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            Self::ClassicDeviceClass | Self::ClassicSdpRecords | Self::ClassicServiceUuids => Domain::Classic,
            _ => Domain::Le,
        }
    }
}

/// Parses a batch of collector-reported evidence type names, logging and discarding any that
/// don't match a known [`EvidenceType`] rather than failing the whole batch.
pub fn parse_all<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<EvidenceType> {
    raw.into_iter()
        .filter_map(|name| match EvidenceType::parse(name) {
            Some(evidence) => Some(evidence),
            None => {
                warn!("dropping malformed evidence type: {name}");
                None
            }
        })
        .collect()
}

/// The classifier's verdict for a device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Classification {
    Classic,
    Le,
    Dual,
    Unknown,
}

/// Recon mode, mirroring the orchestrator scan modes: which collectors are
/// permitted to run depends on which of these is active.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    Passive,
    Naggy,
    Pokey,
    Brute,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_as_str_and_parse() {
        for evidence in [
            EvidenceType::ClassicDeviceClass,
            EvidenceType::ClassicSdpRecords,
            EvidenceType::ClassicServiceUuids,
            EvidenceType::LeAddressTypeRandom,
            EvidenceType::LeAddressTypePublic,
            EvidenceType::LeGattServices,
            EvidenceType::LeServiceUuids,
            EvidenceType::LeAdvertisingData,
        ] {
            assert_eq!(EvidenceType::parse(evidence.as_str()), Some(evidence));
        }
    }

    #[test]
    fn unknown_evidence_type_is_dropped_not_panicked() {
        let parsed = parse_all(["CLASSIC_DEVICE_CLASS", "NOT_A_REAL_TYPE", "LE_ADVERTISING_DATA"]);
        assert_eq!(parsed, vec![EvidenceType::ClassicDeviceClass, EvidenceType::LeAdvertisingData]);
    }
}
