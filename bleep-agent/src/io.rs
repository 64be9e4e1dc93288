use log::info;

use crate::error::AgentError;

/// Handles the human- or program-facing side of a pairing request: supplying
/// PIN codes and passkeys, and deciding whether to confirm or authorize.
/// Implementations must not block the crossroads dispatch thread for long;
/// [`AutoAccept`] and [`Callback`] return immediately, and a CLI-prompting
/// implementation is expected to run its blocking read on a dedicated
/// thread rather than here.
pub trait IoHandler: Send + Sync {
    fn request_pin_code(&self, device: &str) -> Result<String, AgentError>;
    fn display_pin_code(&self, device: &str, pin: &str);
    fn request_passkey(&self, device: &str) -> Result<u32, AgentError>;
    fn display_passkey(&self, device: &str, passkey: u32, entered: u16);
    fn request_confirmation(&self, device: &str, passkey: u32) -> Result<bool, AgentError>;
    fn request_authorization(&self, device: &str) -> Result<bool, AgentError>;
    fn authorize_service(&self, device: &str, uuid: &str) -> Result<bool, AgentError>;
}

/// Accepts every prompt unattended: fixed PIN, always confirms, always
/// authorizes. Suitable for unattended recon runs where pairing should never
/// block on a human.
pub struct AutoAccept {
    pub default_pin: String,
}

impl Default for AutoAccept {
    fn default() -> Self {
        Self { default_pin: "0000".to_owned() }
    }
}

impl IoHandler for AutoAccept {
    fn request_pin_code(&self, device: &str) -> Result<String, AgentError> {
        info!("auto-accept: supplying default PIN to {device}");
        Ok(self.default_pin.clone())
    }

    fn display_pin_code(&self, device: &str, pin: &str) {
        info!("PIN code for {device}: {pin}");
    }

    fn request_passkey(&self, device: &str) -> Result<u32, AgentError> {
        info!("auto-accept: supplying passkey 000000 to {device}");
        Ok(0)
    }

    fn display_passkey(&self, device: &str, passkey: u32, entered: u16) {
        info!("passkey for {device}: {passkey:06} ({entered} digits entered)");
    }

    fn request_confirmation(&self, device: &str, passkey: u32) -> Result<bool, AgentError> {
        info!("auto-accept: confirming passkey {passkey:06} for {device}");
        Ok(true)
    }

    fn request_authorization(&self, device: &str) -> Result<bool, AgentError> {
        info!("auto-accept: authorizing pairing with {device}");
        Ok(true)
    }

    fn authorize_service(&self, device: &str, uuid: &str) -> Result<bool, AgentError> {
        info!("auto-accept: authorizing service {uuid} on {device}");
        Ok(true)
    }
}

/// Delegates every decision to user-supplied closures, for embedding BLEEP
/// in a host UI or a scripted test harness.
pub struct Callback {
    pub pin_code: Box<dyn Fn(&str) -> Result<String, AgentError> + Send + Sync>,
    pub passkey: Box<dyn Fn(&str) -> Result<u32, AgentError> + Send + Sync>,
    pub confirm: Box<dyn Fn(&str, u32) -> Result<bool, AgentError> + Send + Sync>,
    pub authorize: Box<dyn Fn(&str) -> Result<bool, AgentError> + Send + Sync>,
    pub authorize_service: Box<dyn Fn(&str, &str) -> Result<bool, AgentError> + Send + Sync>,
}

impl IoHandler for Callback {
    fn request_pin_code(&self, device: &str) -> Result<String, AgentError> {
        (self.pin_code)(device)
    }

    fn display_pin_code(&self, device: &str, pin: &str) {
        info!("PIN code for {device}: {pin}");
    }

    fn request_passkey(&self, device: &str) -> Result<u32, AgentError> {
        (self.passkey)(device)
    }

    fn display_passkey(&self, device: &str, passkey: u32, entered: u16) {
        info!("passkey for {device}: {passkey:06} ({entered} digits entered)");
    }

    fn request_confirmation(&self, device: &str, passkey: u32) -> Result<bool, AgentError> {
        (self.confirm)(device, passkey)
    }

    fn request_authorization(&self, device: &str) -> Result<bool, AgentError> {
        (self.authorize)(device)
    }

    fn authorize_service(&self, device: &str, uuid: &str) -> Result<bool, AgentError> {
        (self.authorize_service)(device, uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_accept_confirms_everything() {
        let handler = AutoAccept::default();
        assert!(handler.request_confirmation("aa:bb", 123456).unwrap());
        assert!(handler.request_authorization("aa:bb").unwrap());
        assert_eq!(handler.request_pin_code("aa:bb").unwrap(), "0000");
    }

    #[test]
    fn callback_delegates_to_closures() {
        let handler = Callback {
            pin_code: Box::new(|_| Ok("1234".to_owned())),
            passkey: Box::new(|_| Ok(42)),
            confirm: Box::new(|_, _| Ok(false)),
            authorize: Box::new(|_| Ok(true)),
            authorize_service: Box::new(|_, _| Ok(false)),
        };
        assert_eq!(handler.request_pin_code("aa:bb").unwrap(), "1234");
        assert!(!handler.request_confirmation("aa:bb", 1).unwrap());
    }
}
