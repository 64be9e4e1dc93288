/// IO capability profile the agent registers with, matching BlueZ's
/// `RegisterAgent` capability strings. Chosen at registration to match the
/// host UI available to this run of BLEEP.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    NoInputNoOutput,
    KeyboardDisplay,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DisplayOnly => "DisplayOnly",
            Self::DisplayYesNo => "DisplayYesNo",
            Self::KeyboardOnly => "KeyboardOnly",
            Self::NoInputNoOutput => "NoInputNoOutput",
            Self::KeyboardDisplay => "KeyboardDisplay",
        }
    }

    pub fn can_display(self) -> bool {
        matches!(self, Self::DisplayOnly | Self::DisplayYesNo | Self::KeyboardDisplay)
    }

    pub fn can_confirm(self) -> bool {
        matches!(self, Self::DisplayYesNo | Self::KeyboardDisplay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_bluez_capability_strings() {
        assert_eq!(Capability::NoInputNoOutput.as_str(), "NoInputNoOutput");
        assert_eq!(Capability::KeyboardDisplay.as_str(), "KeyboardDisplay");
    }

    #[test]
    fn only_display_capable_profiles_can_confirm() {
        assert!(!Capability::NoInputNoOutput.can_confirm());
        assert!(Capability::DisplayYesNo.can_confirm());
    }
}
