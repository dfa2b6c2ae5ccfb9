//! Keycard secure channel cryptography
//!
//! Pairing tokens and cryptograms, ECDH session key derivation, AES-256-CBC
//! payload encryption and the AES CBC-MAC chaining value.

use aes::Aes256;
use cbc_mac::{CbcMac, Mac};
use cipher::{
    BlockDecryptMut, BlockEncryptMut, Iv, IvSizeUser, Key, KeyIvInit, KeySizeUser,
    block_padding::Iso7816,
    consts::{U16, U32},
};
use k256::{PublicKey, SecretKey, ecdh::SharedSecret, elliptic_curve::sec1::ToEncodedPoint};
use nexum_keycard_apdu::{RandomSource, SecureChannelError};
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256, Sha512};
use unicode_normalization::UnicodeNormalization;

/// Salt of the pairing password key derivation
pub const PAIRING_TOKEN_SALT: &str = "Keycard Pairing Password Salt";
/// PBKDF2 iterations of the pairing password key derivation
pub const PAIRING_TOKEN_ITERATIONS: u32 = 50_000;

/// PBKDF2 output of the pairing password
pub type PairingToken = [u8; 32];
/// Pairing challenge, also used for the secure channel salt
pub type Challenge = [u8; 32];
/// SHA-256 pairing cryptogram
pub type Cryptogram = [u8; 32];
/// MAC input header
pub type ApduMeta = [u8; 16];

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

const BLOCK: usize = 16;

/// Key and IV sizes of the Keycard secure channel (AES-256, 16-byte IV)
#[derive(Debug)]
pub struct KeycardScp;

impl KeySizeUser for KeycardScp {
    type KeySize = U32;
}

impl IvSizeUser for KeycardScp {
    type IvSize = U16;
}

/// Derive the pairing token from a pairing password
pub fn generate_pairing_token(password: &str) -> PairingToken {
    let password = password.nfkd().collect::<String>();
    let salt = PAIRING_TOKEN_SALT.nfkd().collect::<String>();

    let mut token = PairingToken::default();
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PAIRING_TOKEN_ITERATIONS,
        &mut token,
    );
    token
}

/// `SHA256(token ‖ challenge)`
pub fn calculate_cryptogram(token: &PairingToken, challenge: &Challenge) -> Cryptogram {
    Sha256::new()
        .chain_update(token)
        .chain_update(challenge)
        .finalize()
        .into()
}

/// Pairing key minted by the final PAIR step: `SHA256(token ‖ salt)`
pub fn pairing_key(token: &PairingToken, salt: &[u8]) -> Key<KeycardScp> {
    Sha256::new().chain_update(token).chain_update(salt).finalize()
}

/// ECDH over secp256k1
pub fn ecdh_shared_secret(private: &SecretKey, public: &PublicKey) -> SharedSecret {
    k256::elliptic_curve::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
}

/// Ephemeral secp256k1 key drawn from `rng`
pub fn ephemeral_key(rng: &mut dyn RandomSource) -> SecretKey {
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        // zero or above the group order: draw again
        if let Ok(key) = SecretKey::from_slice(&bytes) {
            return key;
        }
    }
}

/// `encKey ‖ macKey = SHA512(shared secret ‖ pairing key ‖ salt)`
pub fn derive_session_keys(
    secret: &SharedSecret,
    pairing_key: &Key<KeycardScp>,
    salt: &Challenge,
) -> (Key<KeycardScp>, Key<KeycardScp>) {
    let digest = Sha512::new()
        .chain_update(secret.raw_secret_bytes())
        .chain_update(pairing_key)
        .chain_update(salt)
        .finalize();

    (
        Key::<KeycardScp>::clone_from_slice(&digest[..32]),
        Key::<KeycardScp>::clone_from_slice(&digest[32..]),
    )
}

/// AES-256-CBC with ISO 7816-4 padding
pub fn encrypt_data(data: &[u8], enc_key: &Key<KeycardScp>, iv: &Iv<KeycardScp>) -> Vec<u8> {
    Encryptor::new(enc_key, iv).encrypt_padded_vec_mut::<Iso7816>(data)
}

/// Inverse of [`encrypt_data`]
pub fn decrypt_data(
    data: &[u8],
    enc_key: &Key<KeycardScp>,
    iv: &Iv<KeycardScp>,
) -> Result<Vec<u8>, SecureChannelError> {
    if data.is_empty() || data.len() % BLOCK != 0 {
        return Err(SecureChannelError::InvalidLength(data.len()));
    }

    Decryptor::new(enc_key, iv)
        .decrypt_padded_vec_mut::<Iso7816>(data)
        .map_err(|_| SecureChannelError::InvalidPadding)
}

/// AES-256 CBC-MAC over `meta ‖ data`, both block aligned
pub fn calculate_mac(meta: &ApduMeta, data: &[u8], mac_key: &Key<KeycardScp>) -> Iv<KeycardScp> {
    let mut mac = <CbcMac<Aes256> as Mac>::new(mac_key);
    mac.update(meta);
    mac.update(data);
    mac.finalize().into_bytes()
}

/// Encrypt INIT data for a card that has no pairing yet
///
/// Output: `len(pubkey) ‖ host public key ‖ iv ‖ AES-CBC(ECDH-x, iv, data)`.
pub fn one_shot_encrypt(
    host_public_key: &PublicKey,
    shared_secret: &SharedSecret,
    iv: &Iv<KeycardScp>,
    data: &[u8],
) -> Vec<u8> {
    let point = host_public_key.to_encoded_point(false);
    let ciphertext = encrypt_data(data, shared_secret.raw_secret_bytes(), iv);

    let mut out = Vec::with_capacity(1 + point.len() + BLOCK + ciphertext.len());
    out.push(point.len() as u8);
    out.extend_from_slice(point.as_bytes());
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_ecdh_agreement() {
        let a = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let b = SecretKey::from_slice(&[0x22; 32]).unwrap();

        assert_eq!(
            ecdh_shared_secret(&a, &b.public_key()).raw_secret_bytes(),
            ecdh_shared_secret(&b, &a.public_key()).raw_secret_bytes()
        );
    }

    #[test]
    fn test_derive_session_keys() {
        let secret = hex!("B410E816DA313545151807E25A830201FA389913A977066AB0C6DE0E8631E400");
        let pairing_key = hex!("544FF0B9B0737E4BFC4ECDFCE09F522B837051BBE4FFCEC494FA420D8525670E");
        let salt = hex!("1D7C033E75E10EC578AB538F69F1B02538571BA3831441F1649E3F24B5B3E3E7");

        let shared = SharedSecret::from(*k256::FieldBytes::from_slice(&secret));
        let (enc, mac) = derive_session_keys(&shared, Key::<KeycardScp>::from_slice(&pairing_key), &salt);

        assert_eq!(
            enc.as_slice(),
            hex!("4FF496554C01BAE0A52323E3481B448C99D43982118D95C6918FE0354D224B90")
        );
        assert_eq!(
            mac.as_slice(),
            hex!("185811013138EA1B4FFDBBFA7343EF2DBE3E54C2C231885E867F792448AC2FE5")
        );
    }

    #[test]
    fn test_encrypt_data() {
        let data = hex!("A8A686D0E3290459BCB36088A8FD04A76BF13283BE4B1EAE2E1248EF609F94DC");
        let key = hex!("44D689AB4B18206F7EEE5439FB9A71A8A617406BA5259728D1EBC2786D24896C");
        let iv = hex!("9D3EF41EF1D221DD98A54AD5470F58F2");

        let encrypted = encrypt_data(&data, Key::<KeycardScp>::from_slice(&key), Iv::<KeycardScp>::from_slice(&iv));
        assert_eq!(
            encrypted,
            hex!("FFB41FED5F71A2B57A6AE62D5D5ECD1C12616F6464637DD0A7A930920ACBA55867A7E12CC4F06B089AF34FF4ED4BAB08")
        );
    }

    #[test]
    fn test_decrypt_data() {
        let data = hex!("73B58B66372E3446E14A9F54BA59666DB432E9DD87D24F9B0525180EE52DA2106E0C70EED7CD42B5B313E4443D6AC90D");
        let key = hex!("D93D8E6164196D5C5B5F84F10E4B90D98F8D282ED145513ED666AA55C9871E79");
        let iv = hex!("F959B1220333046D3C47D61B1E1B891B");

        let plain = decrypt_data(&data, Key::<KeycardScp>::from_slice(&key), Iv::<KeycardScp>::from_slice(&iv)).unwrap();
        assert_eq!(
            plain,
            hex!("2E21F9F2B2C2CC9038D518A5C6B490613E7955BD19D19108B77786986B7ABFE69000")
        );
    }

    #[test]
    fn test_decrypt_rejects_partial_block() {
        let key = Key::<KeycardScp>::default();
        let iv = Iv::<KeycardScp>::default();
        assert_eq!(
            decrypt_data(&[0u8; 15], &key, &iv),
            Err(SecureChannelError::InvalidLength(15))
        );
    }

    #[test]
    fn test_pairing_token_normalizes_password() {
        // NFC and NFD forms of the same password derive the same token
        assert_eq!(
            generate_pairing_token("caf\u{e9}"),
            generate_pairing_token("cafe\u{301}")
        );
        assert_ne!(generate_pairing_token("a"), generate_pairing_token("b"));
    }

    #[test]
    fn test_one_shot_encrypt_layout() {
        let host = SecretKey::from_slice(&[0x33; 32]).unwrap();
        let card = SecretKey::from_slice(&[0x44; 32]).unwrap();
        let shared = ecdh_shared_secret(&host, &card.public_key());
        let iv = Iv::<KeycardScp>::clone_from_slice(&[0x55; 16]);

        let out = one_shot_encrypt(&host.public_key(), &shared, &iv, &[0xAB; 50]);
        assert_eq!(out[0], 65);
        assert_eq!(out[1], 0x04);
        assert_eq!(&out[66..82], &[0x55; 16]);

        let card_shared = ecdh_shared_secret(&card, &host.public_key());
        let plain = decrypt_data(&out[82..], card_shared.raw_secret_bytes(), &iv).unwrap();
        assert_eq!(plain, vec![0xAB; 50]);
    }
}
