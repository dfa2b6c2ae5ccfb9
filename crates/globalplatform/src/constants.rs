//! Card manager constants
//!
//! Class bytes, instruction codes, parameters and tags used when talking to
//! the issuer security domain.

/// Issuer security domain AID
pub const CARD_MANAGER_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x01, 0x51, 0x00, 0x00, 0x00];

/// Development card key (`404142...4F`)
pub const DEFAULT_KEY: [u8; 16] = [
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F,
];

/// Command classes
pub mod cla {
    /// ISO7816 command class
    pub const ISO7816: u8 = 0x00;
    /// GlobalPlatform command class
    pub const GP: u8 = 0x80;
    /// Secure messaging indicator OR-ed into the class byte
    pub const SECURE_MESSAGING: u8 = 0x04;
}

/// Instruction codes
pub mod ins {
    /// SELECT
    pub const SELECT: u8 = 0xA4;
    /// INITIALIZE UPDATE
    pub const INITIALIZE_UPDATE: u8 = 0x50;
    /// EXTERNAL AUTHENTICATE
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    /// DELETE
    pub const DELETE: u8 = 0xE4;
    /// INSTALL
    pub const INSTALL: u8 = 0xE6;
    /// LOAD
    pub const LOAD: u8 = 0xE8;
    /// GET STATUS
    pub const GET_STATUS: u8 = 0xF2;
}

/// SELECT P1
pub mod select_p1 {
    /// Select by DF name
    pub const BY_NAME: u8 = 0x04;
}

/// EXTERNAL AUTHENTICATE P1 (security level)
pub mod external_auth_p1 {
    /// Command MAC only
    pub const CMAC: u8 = 0x01;
}

/// INSTALL P1
pub mod install_p1 {
    /// Install for load
    pub const FOR_LOAD: u8 = 0x02;
    /// Install for install
    pub const FOR_INSTALL: u8 = 0x04;
    /// Install for make selectable
    pub const FOR_MAKE_SELECTABLE: u8 = 0x08;
    /// Install and make selectable in one step
    pub const FOR_INSTALL_AND_MAKE_SELECTABLE: u8 = FOR_INSTALL | FOR_MAKE_SELECTABLE;
}

/// LOAD P1
pub mod load_p1 {
    /// More blocks follow
    pub const MORE_BLOCKS: u8 = 0x00;
    /// Last block
    pub const LAST_BLOCK: u8 = 0x80;
}

/// GET STATUS parameters
pub mod get_status {
    /// P1: issuer security domain
    pub const ISSUER_SECURITY_DOMAIN: u8 = 0x80;
    /// P2: TLV formatted response
    pub const TLV_DATA: u8 = 0x02;
}

/// DELETE P2
pub mod delete_p2 {
    /// Delete the object only
    pub const OBJECT: u8 = 0x00;
    /// Delete the object and everything related to it
    pub const OBJECT_AND_RELATED: u8 = 0x80;
}

/// Tags
pub mod tags {
    /// AID
    pub const AID: u8 = 0x4F;
    /// Load file data block
    pub const LOAD_FILE_DATA_BLOCK: u8 = 0xC4;
    /// Application specific install parameters
    pub const INSTALL_PARAMETERS: u8 = 0xC9;
    /// GET STATUS entry template
    pub const GET_STATUS_ENTRY: u8 = 0xE3;
    /// Life cycle state
    pub const LIFE_CYCLE: [u8; 2] = [0x9F, 0x70];
    /// Privileges
    pub const PRIVILEGES: u8 = 0xC5;
}

/// Secure channel protocol identifiers
pub mod scp {
    /// SCP02
    pub const SCP02: u8 = 0x02;
}

/// SCP02 session key derivation constants
pub mod derivation {
    /// Session encryption key
    pub const ENC: [u8; 2] = [0x01, 0x82];
    /// Session C-MAC key
    pub const MAC: [u8; 2] = [0x01, 0x01];
    /// Session data encryption key
    pub const DEK: [u8; 2] = [0x01, 0x81];
}
