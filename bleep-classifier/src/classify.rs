use crate::types::{Classification, Domain, EvidenceType, Mode, Weight};

/// Which modes a collector for this evidence type is permitted to run in. Higher-cost
/// collectors (SDP, GATT) are disabled in `Passive`.
pub fn permitted_modes(evidence_type: EvidenceType) -> &'static [Mode] {
    use EvidenceType::*;
    use Mode::*;
    match evidence_type {
        ClassicDeviceClass => &[Passive, Naggy, Pokey, Brute],
        ClassicSdpRecords => &[Pokey, Brute],
        ClassicServiceUuids => &[Passive, Naggy, Pokey, Brute],
        LeAddressTypeRandom => &[Passive, Naggy, Pokey, Brute],
        LeAddressTypePublic => &[Passive, Naggy, Pokey, Brute],
        LeGattServices => &[Naggy, Pokey, Brute],
        LeServiceUuids => &[Passive, Naggy, Pokey, Brute],
        LeAdvertisingData => &[Passive, Naggy, Pokey, Brute],
    }
}

pub fn is_permitted_in(evidence_type: EvidenceType, mode: Mode) -> bool {
    permitted_modes(evidence_type).contains(&mode)
}

/// Applies the strict decision rule to a set of evidence already collected for one device.
/// `LE_ADDRESS_TYPE_PUBLIC` is present in the table only to record that it's inconclusive;
/// it never contributes to any branch below.
pub fn classify(evidence: &[EvidenceType]) -> Classification {
    let has_conclusive_classic =
        evidence.iter().any(|e| e.domain() == Domain::Classic && e.weight() == Weight::Conclusive);
    let has_conclusive_le = evidence.iter().any(|e| e.domain() == Domain::Le && e.weight() == Weight::Conclusive);
    let strong_le_count = evidence.iter().filter(|e| e.domain() == Domain::Le && e.weight() == Weight::Strong).count();
    let le = has_conclusive_le || strong_le_count >= 2;

    // Dual requires a conclusive piece on *both* sides independently; reaching the LE
    // classification threshold via two strong pieces alone must never count toward dual.
    match (has_conclusive_classic, has_conclusive_le, le) {
        (true, true, _) => Classification::Dual,
        (true, false, _) => Classification::Classic,
        (false, _, true) => Classification::Le,
        (false, _, false) => Classification::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EvidenceType::*;

    #[test]
    fn device_class_alone_is_classic() {
        assert_eq!(classify(&[ClassicDeviceClass]), Classification::Classic);
    }

    #[test]
    fn random_address_alone_is_le() {
        assert_eq!(classify(&[LeAddressTypeRandom]), Classification::Le);
    }

    #[test]
    fn two_strong_le_pieces_are_le() {
        assert_eq!(classify(&[LeGattServices, LeServiceUuids]), Classification::Le);
    }

    #[test]
    fn one_strong_le_piece_alone_is_unknown() {
        assert_eq!(classify(&[LeGattServices]), Classification::Unknown);
    }

    #[test]
    fn public_address_type_is_ignored() {
        assert_eq!(classify(&[LeAddressTypePublic]), Classification::Unknown);
    }

    #[test]
    fn strong_classic_alone_never_yields_classic() {
        assert_eq!(classify(&[ClassicServiceUuids]), Classification::Unknown);
    }

    #[test]
    fn conclusive_classic_and_le_is_dual() {
        assert_eq!(classify(&[ClassicDeviceClass, LeAddressTypeRandom]), Classification::Dual);
    }

    #[test]
    fn conclusive_classic_with_strong_le_only_is_classic_not_dual() {
        // LE reaches its own classification threshold via two strong pieces, but
        // strong-only evidence must never count toward dual.
        assert_eq!(
            classify(&[ClassicDeviceClass, LeGattServices, LeServiceUuids]),
            Classification::Classic
        );
    }

    #[test]
    fn sdp_records_disabled_outside_pokey_and_brute() {
        assert!(!is_permitted_in(ClassicSdpRecords, Mode::Passive));
        assert!(!is_permitted_in(ClassicSdpRecords, Mode::Naggy));
        assert!(is_permitted_in(ClassicSdpRecords, Mode::Pokey));
        assert!(is_permitted_in(ClassicSdpRecords, Mode::Brute));
    }
}
