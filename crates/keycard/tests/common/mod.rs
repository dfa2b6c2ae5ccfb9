//! Simulated Keycard applet
//!
//! Runs the card side of pairing, the secure channel and the command set
//! with the crate's own primitives. Keys are not BIP32: every path maps to
//! `SHA256(master ‖ path)`, which is enough to tell keys apart.

#![allow(dead_code)]

use bytes::Bytes;
use cipher::{Iv, Key};
use hex_literal::hex;
use k256::{
    PublicKey, SecretKey,
    ecdsa::SigningKey,
    elliptic_curve::sec1::ToEncodedPoint,
};
use nexum_keycard::{
    constants::{DEFAULT_INSTANCE_INDEX, MAX_PAIRING_SLOTS, keycard_instance_aid},
    crypto::{
        ApduMeta, KeycardScp, PairingToken, calculate_cryptogram, calculate_mac, decrypt_data,
        derive_session_keys, ecdh_shared_secret, encrypt_data, pairing_key,
    },
};
use nexum_keycard_apdu::{CardTransport, Command, TransportError};
use sha2::{Digest, Sha256};

pub const PIN_RETRIES: u8 = 3;
pub const PUK_RETRIES: u8 = 5;

const OK: u16 = 0x9000;
const WRONG_DATA: u16 = 0x6A80;
const CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
const SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;
const INCORRECT_P1P2: u16 = 0x6A86;
const FILE_FULL: u16 = 0x6A84;
const REFERENCED_DATA_NOT_FOUND: u16 = 0x6A88;
const INS_NOT_SUPPORTED: u16 = 0x6D00;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
struct Credentials {
    pin: Vec<u8>,
    puk: Vec<u8>,
    token: PairingToken,
}

#[derive(Debug)]
struct CardSession {
    enc: Key<KeycardScp>,
    mac: Key<KeycardScp>,
    iv: Iv<KeycardScp>,
    authenticated: bool,
}

/// Card side of the Keycard applet
#[derive(Debug)]
pub struct SimulatedKeycard {
    installed: bool,
    card_key: SecretKey,
    credentials: Option<Credentials>,
    pairings: [Option<Key<KeycardScp>>; MAX_PAIRING_SLOTS as usize],
    pair_challenge: Option<[u8; 32]>,
    session: Option<CardSession>,
    pin_retries: u8,
    puk_retries: u8,
    pin_verified: bool,
    master: Option<[u8; 32]>,
    current_path: Vec<u32>,
    pinless_path: Option<Vec<u32>>,
    counter: u8,
    commands: Vec<Bytes>,
}

impl SimulatedKeycard {
    /// Installed applet waiting for INIT
    pub fn new() -> Self {
        Self {
            installed: true,
            card_key: SecretKey::from_slice(&[0x5A; 32]).expect("valid key"),
            credentials: None,
            pairings: Default::default(),
            pair_challenge: None,
            session: None,
            pin_retries: PIN_RETRIES,
            puk_retries: PUK_RETRIES,
            pin_verified: false,
            master: None,
            current_path: Vec::new(),
            pinless_path: None,
            counter: 0xC0,
            commands: Vec::new(),
        }
    }

    /// Card without the applet
    pub fn not_installed() -> Self {
        Self {
            installed: false,
            ..Self::new()
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn paired_slots(&self) -> Vec<u8> {
        (0..MAX_PAIRING_SLOTS)
            .filter(|&i| self.pairings[i as usize].is_some())
            .collect()
    }

    pub fn pairing_key(&self, index: u8) -> Option<[u8; 32]> {
        self.pairings.get(index as usize)?.map(Into::into)
    }

    pub const fn pin_retries(&self) -> u8 {
        self.pin_retries
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Instruction byte of every command received
    pub fn instructions(&self) -> Vec<u8> {
        self.commands.iter().map(|c| c[1]).collect()
    }

    /// Public key the card holds at `path`
    pub fn public_key_at(&self, path: &[u32]) -> Option<PublicKey> {
        self.master
            .map(|master| PublicKey::from(key_at(&master, path).verifying_key()))
    }

    /// Key UID of the loaded master key
    pub fn key_uid(&self) -> Option<[u8; 32]> {
        self.public_key_at(&[]).map(|key| {
            Sha256::digest(key.to_encoded_point(false).as_bytes()).into()
        })
    }

    fn random<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        for byte in &mut out {
            *byte = self.counter;
            self.counter = self.counter.wrapping_add(1);
        }
        out
    }

    fn handle(&mut self, raw: &[u8]) -> Vec<u8> {
        let Ok(command) = Command::from_bytes(raw) else {
            return hex!("6700").to_vec();
        };

        let (data, sw) = match command.ins {
            0xA4 => self.select(&command),
            0xFE => self.init(command.data()),
            0x12 => self.pair(command.p1, command.data()),
            0x10 => self.open_secure_channel(command.p1, command.data()),
            0xFD => self.factory_reset(&command),
            _ if self.session.is_some() => return self.secured(&command),
            // pinless signing works without a secure channel
            0xC0 if command.p1 == 0x03 => self.sign(command.p1, command.data()),
            _ => (Vec::new(), CONDITIONS_NOT_SATISFIED),
        };
        response(data, sw)
    }

    fn select(&mut self, command: &Command) -> (Vec<u8>, u16) {
        self.session = None;
        self.pin_verified = false;
        if !self.installed || command.data() != keycard_instance_aid(DEFAULT_INSTANCE_INDEX) {
            return (Vec::new(), 0x6A82);
        }

        let public_key = self.card_key.public_key().to_encoded_point(false);
        if self.credentials.is_none() {
            return (tlv(0x80, public_key.as_bytes()), OK);
        }

        let free = self.pairings.iter().filter(|p| p.is_none()).count() as u8;
        let key_uid = self.key_uid().map(|uid| uid.to_vec()).unwrap_or_default();

        let mut body = tlv(0x8F, &[0x11; 16]);
        body.extend(tlv(0x80, public_key.as_bytes()));
        body.extend(tlv(0x02, &[0x03, 0x01]));
        body.extend(tlv(0x02, &[free]));
        body.extend(tlv(0x8E, &key_uid));
        body.extend(tlv(0x8D, &[0x0F]));
        (tlv(0xA4, &body), OK)
    }

    fn init(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        if !self.installed || self.credentials.is_some() {
            return (Vec::new(), INS_NOT_SUPPORTED);
        }
        let Some((&key_len, rest)) = data.split_first() else {
            return (Vec::new(), WRONG_DATA);
        };
        let key_len = key_len as usize;
        if rest.len() < key_len + 16 {
            return (Vec::new(), WRONG_DATA);
        }
        let Ok(host_key) = PublicKey::from_sec1_bytes(&rest[..key_len]) else {
            return (Vec::new(), WRONG_DATA);
        };
        let iv = Iv::<KeycardScp>::clone_from_slice(&rest[key_len..key_len + 16]);

        let shared = ecdh_shared_secret(&self.card_key, &host_key);
        let Ok(plain) = decrypt_data(&rest[key_len + 16..], shared.raw_secret_bytes(), &iv) else {
            return (Vec::new(), WRONG_DATA);
        };
        if plain.len() != 6 + 12 + 32 {
            return (Vec::new(), WRONG_DATA);
        }

        let mut token = PairingToken::default();
        token.copy_from_slice(&plain[18..]);
        self.credentials = Some(Credentials {
            pin: plain[..6].to_vec(),
            puk: plain[6..18].to_vec(),
            token,
        });
        (Vec::new(), OK)
    }

    fn pair(&mut self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        let Some(token) = self.credentials.as_ref().map(|c| c.token) else {
            return (Vec::new(), INS_NOT_SUPPORTED);
        };
        let Ok(payload) = <[u8; 32]>::try_from(data) else {
            return (Vec::new(), WRONG_DATA);
        };
        let Some(slot) = self.pairings.iter().position(Option::is_none) else {
            return (Vec::new(), FILE_FULL);
        };

        match p1 {
            0x00 => {
                let card_challenge = self.random::<32>();
                self.pair_challenge = Some(card_challenge);
                let mut out = calculate_cryptogram(&token, &payload).to_vec();
                out.extend_from_slice(&card_challenge);
                (out, OK)
            }
            0x01 => {
                let Some(card_challenge) = self.pair_challenge.take() else {
                    return (Vec::new(), CONDITIONS_NOT_SATISFIED);
                };
                if calculate_cryptogram(&token, &card_challenge) != payload {
                    return (Vec::new(), SECURITY_STATUS_NOT_SATISFIED);
                }
                let salt = self.random::<32>();
                self.pairings[slot] = Some(pairing_key(&token, &salt));

                let mut out = vec![slot as u8];
                out.extend_from_slice(&salt);
                (out, OK)
            }
            _ => (Vec::new(), INCORRECT_P1P2),
        }
    }

    fn open_secure_channel(&mut self, index: u8, data: &[u8]) -> (Vec<u8>, u16) {
        self.session = None;
        self.pin_verified = false;
        let Some(Some(pairing)) = self.pairings.get(index as usize).copied() else {
            return (Vec::new(), INCORRECT_P1P2);
        };
        let Ok(host_key) = PublicKey::from_sec1_bytes(data) else {
            return (Vec::new(), WRONG_DATA);
        };

        let salt = self.random::<32>();
        let iv = self.random::<16>();
        let shared = ecdh_shared_secret(&self.card_key, &host_key);
        let (enc, mac) = derive_session_keys(&shared, &pairing, &salt);
        self.session = Some(CardSession {
            enc,
            mac,
            iv: iv.into(),
            authenticated: false,
        });

        let mut out = salt.to_vec();
        out.extend_from_slice(&iv);
        (out, OK)
    }

    fn factory_reset(&mut self, command: &Command) -> (Vec<u8>, u16) {
        if (command.p1, command.p2) != (0xAA, 0x55) {
            return (Vec::new(), INCORRECT_P1P2);
        }
        let card_key = self.card_key.clone();
        let counter = self.counter;
        let commands = std::mem::take(&mut self.commands);
        *self = Self {
            card_key,
            counter,
            commands,
            ..Self::new()
        };
        (Vec::new(), OK)
    }

    fn secured(&mut self, command: &Command) -> Vec<u8> {
        let Some(plain) = self.unwrap_command(command) else {
            self.session = None;
            self.pin_verified = false;
            return hex!("6982").to_vec();
        };

        let authenticated = self.session.as_ref().is_some_and(|s| s.authenticated);
        let (data, sw) = match command.ins {
            0x11 => self.mutually_authenticate(&plain),
            _ if !authenticated => (Vec::new(), CONDITIONS_NOT_SATISFIED),
            _ => self.dispatch(command, &plain),
        };
        self.wrap_response(data, sw)
    }

    fn unwrap_command(&mut self, command: &Command) -> Option<Vec<u8>> {
        let session = self.session.as_mut()?;
        let data = command.data();
        if data.len() < 32 {
            return None;
        }
        let (cmac, encrypted) = data.split_at(16);

        let mut meta = ApduMeta::default();
        meta[..4].copy_from_slice(&[command.cla, command.ins, command.p1, command.p2]);
        meta[4] = data.len() as u8;
        let expected = calculate_mac(&meta, encrypted, &session.mac);
        if expected.as_slice() != cmac {
            return None;
        }

        let plain = decrypt_data(encrypted, &session.enc, &session.iv).ok()?;
        session.iv = expected;
        Some(plain)
    }

    fn wrap_response(&mut self, mut data: Vec<u8>, sw: u16) -> Vec<u8> {
        let Some(session) = self.session.as_mut() else {
            return response(data, sw);
        };
        data.extend_from_slice(&sw.to_be_bytes());

        let encrypted = encrypt_data(&data, &session.enc, &session.iv);
        let mut meta = ApduMeta::default();
        meta[0] = (encrypted.len() + 16) as u8;
        session.iv = calculate_mac(&meta, &encrypted, &session.mac);

        let mut out = session.iv.to_vec();
        out.extend_from_slice(&encrypted);
        response(out, OK)
    }

    fn mutually_authenticate(&mut self, challenge: &[u8]) -> (Vec<u8>, u16) {
        if challenge.len() != 32 {
            return (Vec::new(), WRONG_DATA);
        }
        let answer = self.random::<32>();
        if let Some(session) = self.session.as_mut() {
            session.authenticated = true;
        }
        (answer.to_vec(), OK)
    }

    fn dispatch(&mut self, command: &Command, data: &[u8]) -> (Vec<u8>, u16) {
        let pin_free = matches!(command.ins, 0x20 | 0x22 | 0xF2)
            || (command.ins == 0xC0 && command.p1 == 0x03);
        if !pin_free && !self.pin_verified {
            return (Vec::new(), CONDITIONS_NOT_SATISFIED);
        }

        match command.ins {
            0x20 => self.verify_pin(data),
            0x21 => self.change_credential(command.p1, data),
            0x22 => self.unblock_pin(data),
            0x13 => self.unpair(command.p1),
            0xF2 => self.get_status(command.p1),
            0xD4 => self.generate_key(),
            0xD0 => self.load_key(command.p1, data),
            0xD3 => self.remove_key(),
            0xD1 => self.derive_key(command.p1, data),
            0xC0 => self.sign(command.p1, data),
            0xC1 => self.set_pinless_path(data),
            0xC2 => self.export_key(command.p1, command.p2, data),
            _ => (Vec::new(), INS_NOT_SUPPORTED),
        }
    }

    fn verify_pin(&mut self, pin: &[u8]) -> (Vec<u8>, u16) {
        if self.pin_retries == 0 {
            return (Vec::new(), 0x63C0);
        }
        let Some(credentials) = &self.credentials else {
            return (Vec::new(), CONDITIONS_NOT_SATISFIED);
        };
        if credentials.pin == pin {
            self.pin_retries = PIN_RETRIES;
            self.pin_verified = true;
            (Vec::new(), OK)
        } else {
            self.pin_retries -= 1;
            self.pin_verified = false;
            (Vec::new(), 0x63C0 | self.pin_retries as u16)
        }
    }

    fn change_credential(&mut self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        let Some(credentials) = self.credentials.as_mut() else {
            return (Vec::new(), CONDITIONS_NOT_SATISFIED);
        };
        match (p1, data.len()) {
            (0x00, 6) => credentials.pin = data.to_vec(),
            (0x01, 12) => credentials.puk = data.to_vec(),
            (0x02, 32) => credentials.token.copy_from_slice(data),
            (0x00..=0x02, _) => return (Vec::new(), WRONG_DATA),
            _ => return (Vec::new(), INCORRECT_P1P2),
        }
        (Vec::new(), OK)
    }

    fn unblock_pin(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        if self.puk_retries == 0 {
            return (Vec::new(), 0x63C0);
        }
        if self.pin_retries != 0 {
            return (Vec::new(), CONDITIONS_NOT_SATISFIED);
        }
        if data.len() != 18 {
            return (Vec::new(), WRONG_DATA);
        }
        let Some(credentials) = self.credentials.as_mut() else {
            return (Vec::new(), CONDITIONS_NOT_SATISFIED);
        };
        if credentials.puk != data[..12] {
            self.puk_retries -= 1;
            return (Vec::new(), 0x63C0 | self.puk_retries as u16);
        }

        credentials.pin = data[12..].to_vec();
        self.puk_retries = PUK_RETRIES;
        self.pin_retries = PIN_RETRIES;
        self.pin_verified = true;
        (Vec::new(), OK)
    }

    fn unpair(&mut self, index: u8) -> (Vec<u8>, u16) {
        match self.pairings.get_mut(index as usize) {
            Some(slot) => {
                *slot = None;
                (Vec::new(), OK)
            }
            None => (Vec::new(), INCORRECT_P1P2),
        }
    }

    fn get_status(&self, p1: u8) -> (Vec<u8>, u16) {
        match p1 {
            0x00 => {
                let key = if self.master.is_some() { 0xFF } else { 0x00 };
                let mut body = tlv(0x02, &[self.pin_retries]);
                body.extend(tlv(0x02, &[self.puk_retries]));
                body.extend(tlv(0x01, &[key]));
                (tlv(0xA3, &body), OK)
            }
            0x01 => (path_bytes(&self.current_path), OK),
            _ => (Vec::new(), INCORRECT_P1P2),
        }
    }

    fn generate_key(&mut self) -> (Vec<u8>, u16) {
        let master = self.random::<32>();
        self.load_master(master)
    }

    fn load_key(&mut self, p1: u8, seed: &[u8]) -> (Vec<u8>, u16) {
        if p1 != 0x03 {
            return (Vec::new(), INCORRECT_P1P2);
        }
        if seed.len() != 64 {
            return (Vec::new(), WRONG_DATA);
        }
        self.load_master(Sha256::digest(seed).into())
    }

    fn load_master(&mut self, master: [u8; 32]) -> (Vec<u8>, u16) {
        self.master = Some(master);
        self.current_path.clear();
        let uid = self.key_uid().map(|uid| uid.to_vec()).unwrap_or_default();
        (uid, OK)
    }

    fn remove_key(&mut self) -> (Vec<u8>, u16) {
        self.master = None;
        self.current_path.clear();
        self.pinless_path = None;
        (Vec::new(), OK)
    }

    fn derive_key(&mut self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        if self.master.is_none() {
            return (Vec::new(), CONDITIONS_NOT_SATISFIED);
        }
        match self.resolve(p1 & 0xC0, data) {
            Some(path) => {
                self.current_path = path;
                (Vec::new(), OK)
            }
            None => (Vec::new(), WRONG_DATA),
        }
    }

    fn sign(&mut self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        if data.len() < 32 {
            return (Vec::new(), WRONG_DATA);
        }
        let (hash, path) = data.split_at(32);
        let Some(master) = self.master else {
            return (Vec::new(), CONDITIONS_NOT_SATISFIED);
        };

        let path = match p1 & 0x03 {
            0x00 => self.current_path.clone(),
            0x03 => match &self.pinless_path {
                Some(path) => path.clone(),
                None => return (Vec::new(), REFERENCED_DATA_NOT_FOUND),
            },
            mode => match self.resolve(p1 & 0xC0, path) {
                Some(path) => {
                    if mode == 0x02 {
                        self.current_path = path.clone();
                    }
                    path
                }
                None => return (Vec::new(), WRONG_DATA),
            },
        };

        let key = key_at(&master, &path);
        let (signature, _) = key
            .sign_prehash_recoverable(hash)
            .expect("prehash is 32 bytes");
        let (r, s) = signature.split_bytes();

        let mut sequence = der_integer(&r);
        sequence.extend(der_integer(&s));
        let mut body = tlv(0x80, key.verifying_key().to_encoded_point(false).as_bytes());
        body.extend(tlv(0x30, &sequence));
        (tlv(0xA0, &body), OK)
    }

    fn set_pinless_path(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        if data.is_empty() {
            self.pinless_path = None;
            return (Vec::new(), OK);
        }
        match parse_path(data) {
            Some(path) => {
                self.pinless_path = Some(path);
                (Vec::new(), OK)
            }
            None => (Vec::new(), WRONG_DATA),
        }
    }

    fn export_key(&mut self, p1: u8, p2: u8, data: &[u8]) -> (Vec<u8>, u16) {
        let Some(master) = self.master else {
            return (Vec::new(), CONDITIONS_NOT_SATISFIED);
        };
        let path = match p1 & 0x03 {
            0x00 => self.current_path.clone(),
            mode @ (0x01 | 0x02) => match self.resolve(p1 & 0xC0, data) {
                Some(path) => {
                    if mode == 0x02 {
                        self.current_path = path.clone();
                    }
                    path
                }
                None => return (Vec::new(), WRONG_DATA),
            },
            _ => return (Vec::new(), INCORRECT_P1P2),
        };

        let key = key_at(&master, &path);
        let mut body = tlv(0x80, key.verifying_key().to_encoded_point(false).as_bytes());
        match p2 {
            0x00 => body.extend(tlv(0x81, &key.to_bytes())),
            0x01 => {}
            _ => return (Vec::new(), INCORRECT_P1P2),
        }
        (tlv(0xA1, &body), OK)
    }

    fn resolve(&self, source: u8, data: &[u8]) -> Option<Vec<u32>> {
        let segments = parse_path(data)?;
        let mut path = match source {
            0x00 => Vec::new(),
            0x40 => {
                let mut parent = self.current_path.clone();
                parent.pop()?;
                parent
            }
            0x80 => self.current_path.clone(),
            _ => return None,
        };
        path.extend(segments);
        (path.len() <= 10).then_some(path)
    }
}

impl Default for SimulatedKeycard {
    fn default() -> Self {
        Self::new()
    }
}

impl CardTransport for SimulatedKeycard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.commands.push(Bytes::copy_from_slice(command));
        Ok(Bytes::from(self.handle(command)))
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.session = None;
        self.pin_verified = false;
        Ok(())
    }
}

fn key_at(master: &[u8; 32], path: &[u32]) -> SigningKey {
    let mut hasher = Sha256::new().chain_update(master);
    for segment in path {
        hasher.update(segment.to_be_bytes());
    }
    SigningKey::from_slice(&hasher.finalize()).expect("digest is a valid scalar")
}

fn parse_path(data: &[u8]) -> Option<Vec<u32>> {
    if data.len() % 4 != 0 {
        return None;
    }
    Some(
        data.chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

fn path_bytes(path: &[u32]) -> Vec<u8> {
    path.iter().flat_map(|s| s.to_be_bytes()).collect()
}

fn der_integer(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    let mut value = bytes[start..].to_vec();
    if value[0] & 0x80 != 0 {
        value.insert(0, 0x00);
    }
    tlv(0x02, &value)
}

fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    if value.len() > 0x7F {
        out.push(0x81);
    }
    out.push(value.len() as u8);
    out.extend_from_slice(value);
    out
}

fn response(mut data: Vec<u8>, sw: u16) -> Vec<u8> {
    data.extend_from_slice(&sw.to_be_bytes());
    data
}
