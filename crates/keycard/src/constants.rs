//! Keycard identifiers, instruction codes and TLV tags

/// Keycard package (load file) AID
pub const PACKAGE_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x08, 0x04, 0x00, 0x01];
/// Keycard applet AID
pub const KEYCARD_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x08, 0x04, 0x00, 0x01, 0x01];
/// NDEF applet AID
pub const NDEF_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x08, 0x04, 0x00, 0x01, 0x02];
/// NDEF applet instance AID (NFC Forum type 4 tag)
pub const NDEF_INSTANCE_AID: &[u8] = &[0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];
/// Cash applet AID
pub const CASH_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x08, 0x04, 0x00, 0x01, 0x03];
/// Cash applet instance AID
pub const CASH_INSTANCE_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x08, 0x04, 0x00, 0x01, 0x03, 0x01];

/// Instance index used when none is configured
pub const DEFAULT_INSTANCE_INDEX: u8 = 0x01;

/// Pairing slots on a Keycard
pub const MAX_PAIRING_SLOTS: u8 = 5;

/// AID of the keycard applet instance with the given index
pub fn keycard_instance_aid(index: u8) -> Vec<u8> {
    let mut aid = KEYCARD_AID.to_vec();
    aid.push(index);
    aid
}

/// Command class for every applet command
pub const CLA_GP: u8 = 0x80;

/// Instruction codes
pub mod ins {
    pub const INIT: u8 = 0xFE;
    pub const FACTORY_RESET: u8 = 0xFD;
    pub const OPEN_SECURE_CHANNEL: u8 = 0x10;
    pub const MUTUALLY_AUTHENTICATE: u8 = 0x11;
    pub const PAIR: u8 = 0x12;
    pub const UNPAIR: u8 = 0x13;
    pub const GET_STATUS: u8 = 0xF2;
    pub const VERIFY_PIN: u8 = 0x20;
    pub const CHANGE_PIN: u8 = 0x21;
    pub const UNBLOCK_PIN: u8 = 0x22;
    pub const LOAD_KEY: u8 = 0xD0;
    pub const DERIVE_KEY: u8 = 0xD1;
    pub const GENERATE_MNEMONIC: u8 = 0xD2;
    pub const REMOVE_KEY: u8 = 0xD3;
    pub const GENERATE_KEY: u8 = 0xD4;
    pub const SIGN: u8 = 0xC0;
    pub const SET_PINLESS_PATH: u8 = 0xC1;
    pub const EXPORT_KEY: u8 = 0xC2;
}

/// PAIR P1
pub mod pair_p1 {
    pub const FIRST_STEP: u8 = 0x00;
    pub const FINAL_STEP: u8 = 0x01;
}

/// GET STATUS P1
pub mod get_status_p1 {
    pub const APPLICATION: u8 = 0x00;
    pub const KEY_PATH: u8 = 0x01;
}

/// CHANGE PIN P1
pub mod change_p1 {
    pub const PIN: u8 = 0x00;
    pub const PUK: u8 = 0x01;
    pub const PAIRING_SECRET: u8 = 0x02;
}

/// LOAD KEY P1
pub mod load_key_p1 {
    pub const KEYPAIR: u8 = 0x01;
    pub const EXTENDED_KEYPAIR: u8 = 0x02;
    pub const BIP39_SEED: u8 = 0x03;
}

/// Derivation options combined with the path source in P1
pub mod derive_p1 {
    pub const CURRENT_KEY: u8 = 0x00;
    pub const DERIVE: u8 = 0x01;
    pub const DERIVE_AND_MAKE_CURRENT: u8 = 0x02;
    pub const PINLESS: u8 = 0x03;
}

/// EXPORT KEY P2
pub mod export_p2 {
    pub const PRIVATE_AND_PUBLIC: u8 = 0x00;
    pub const PUBLIC_ONLY: u8 = 0x01;
}

/// FACTORY RESET parameters
pub mod factory_reset {
    pub const P1: u8 = 0xAA;
    pub const P2: u8 = 0x55;
}

/// TLV tags
pub mod tags {
    /// Signature template: public key and ECDSA signature
    pub const TEMPLATE_SIGNATURE: u8 = 0xA0;
    /// Keypair template: private key, public key, chain code
    pub const TEMPLATE_KEYPAIR: u8 = 0xA1;
    /// Application status template: PIN/PUK retries, key initialized
    pub const TEMPLATE_APPLICATION_STATUS: u8 = 0xA3;
    /// Application info template
    pub const TEMPLATE_APPLICATION_INFO: u8 = 0xA4;

    /// ECC public key (65 bytes uncompressed, or empty)
    pub const ECC_PUBLIC_KEY: u8 = 0x80;
    /// ECC private key (32 bytes)
    pub const ECC_PRIVATE_KEY: u8 = 0x81;
    /// Chain code; also the cash applet's public data
    pub const CHAIN_CODE: u8 = 0x82;
    /// Key UID (32 bytes, or empty)
    pub const KEY_UID: u8 = 0x8E;
    /// Capabilities bitmask
    pub const CAPABILITIES: u8 = 0x8D;
    /// Instance UID (16 bytes)
    pub const INSTANCE_UID: u8 = 0x8F;
    /// Version, retry counters and slot counts
    pub const OTHER: u8 = 0x02;
    /// Key initialized flag (`FF` when a key is loaded)
    pub const KEY_INITIALIZED: u8 = 0x01;
    /// ECDSA signature sequence of `r` and `s`
    pub const ECDSA_SIGNATURE: u8 = 0x30;
}
