// Constants for the org.bluez.Agent1 interface. Unlike the other interfaces
// in this crate, Agent1 is implemented *by us* (BlueZ calls into it), so
// there is no client-side proxy trait here — `bleep-agent` builds a
// dbus-crossroads interface directly from these method names.

pub const ORG_BLUEZ_AGENT1_NAME: &str = "org.bluez.Agent1";

pub mod methods {
    pub const RELEASE: &str = "Release";
    pub const REQUEST_PIN_CODE: &str = "RequestPinCode";
    pub const DISPLAY_PIN_CODE: &str = "DisplayPinCode";
    pub const REQUEST_PASSKEY: &str = "RequestPasskey";
    pub const DISPLAY_PASSKEY: &str = "DisplayPasskey";
    pub const REQUEST_CONFIRMATION: &str = "RequestConfirmation";
    pub const REQUEST_AUTHORIZATION: &str = "RequestAuthorization";
    pub const AUTHORIZE_SERVICE: &str = "AuthorizeService";
    pub const CANCEL: &str = "Cancel";
}
