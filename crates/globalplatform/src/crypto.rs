//! SCP02 cryptographic primitives
//!
//! Session key derivation, card/host cryptograms and the retail C-MAC used
//! to authenticate every command sent to the card manager.

use cbc_mac::{CbcMac, Mac};
use cipher::{
    BlockEncrypt, BlockEncryptMut, Iv, IvSizeUser, Key, KeyInit, KeyIvInit, KeySizeUser,
    block_padding::{Iso7816, RawPadding},
    consts::{U8, U16},
    generic_array::GenericArray,
};
use des::{Des, TdesEde3};

/// Key derivation purpose
pub type Purpose = [u8; 2];
/// Sequence counter returned by INITIALIZE UPDATE
pub type SequenceCounter = [u8; 2];
/// Card challenge returned by INITIALIZE UPDATE
pub type CardChallenge = [u8; 6];
/// Host challenge sent in INITIALIZE UPDATE
pub type HostChallenge = [u8; 8];
/// Card or host authentication cryptogram
pub type Cryptogram = [u8; 8];
/// Retail MAC value
pub type Scp02Mac = [u8; 8];

/// Key and IV sizes for SCP02 (2-key 3DES, 8-byte chaining value)
#[derive(Debug)]
pub struct Scp02;

impl KeySizeUser for Scp02 {
    type KeySize = U16;
}

impl IvSizeUser for Scp02 {
    type IvSize = U8;
}

const BLOCK: usize = 8;

/// Derive a session key: `3DES-CBC(key, 0, purpose ‖ seq ‖ 0^12)`
pub fn derive_key(card_key: &Key<Scp02>, seq: &SequenceCounter, purpose: &Purpose) -> Key<Scp02> {
    let mut blocks = [GenericArray::default(), GenericArray::default()];
    blocks[0][0..2].copy_from_slice(purpose);
    blocks[0][2..4].copy_from_slice(seq);

    cbc::Encryptor::<TdesEde3>::new(&resize_key(card_key), &Default::default())
        .encrypt_blocks_mut(&mut blocks);

    let mut key = Key::<Scp02>::default();
    key[..BLOCK].copy_from_slice(&blocks[0]);
    key[BLOCK..].copy_from_slice(&blocks[1]);
    key
}

/// Cryptogram the card proves itself with: covers `host ‖ seq ‖ card`
pub fn card_cryptogram(
    enc_key: &Key<Scp02>,
    seq: &SequenceCounter,
    card_challenge: &CardChallenge,
    host_challenge: &HostChallenge,
) -> Cryptogram {
    let mut blocks = [GenericArray::default(); 3];
    blocks[0].copy_from_slice(host_challenge);
    blocks[1][0..2].copy_from_slice(seq);
    blocks[1][2..8].copy_from_slice(card_challenge);
    cryptogram(enc_key, blocks)
}

/// Cryptogram the host proves itself with: covers `seq ‖ card ‖ host`
pub fn host_cryptogram(
    enc_key: &Key<Scp02>,
    seq: &SequenceCounter,
    card_challenge: &CardChallenge,
    host_challenge: &HostChallenge,
) -> Cryptogram {
    let mut blocks = [GenericArray::default(); 3];
    blocks[0][0..2].copy_from_slice(seq);
    blocks[0][2..8].copy_from_slice(card_challenge);
    blocks[1].copy_from_slice(host_challenge);
    cryptogram(enc_key, blocks)
}

fn cryptogram(enc_key: &Key<Scp02>, mut blocks: [GenericArray<u8, U8>; 3]) -> Cryptogram {
    Iso7816::raw_pad(&mut blocks[2], 0);
    cbc::Encryptor::<TdesEde3>::new(&resize_key(enc_key), &Default::default())
        .encrypt_blocks_mut(&mut blocks);
    blocks[2].into()
}

/// Retail MAC: single DES (K1) over every block but the last, 3DES on the last
pub fn mac_full_3des(key: &Key<Scp02>, iv: &Iv<Scp02>, data: &[u8]) -> Scp02Mac {
    let tail = data.len() % BLOCK;
    let last = data.len() - tail;
    let mut padded = Vec::with_capacity(last + BLOCK);
    padded.extend_from_slice(data);
    padded.resize(last + BLOCK, 0);
    Iso7816::raw_pad(&mut padded[last..], tail);

    let des = Des::new(GenericArray::from_slice(&key[..BLOCK]));
    let tdes = TdesEde3::new(&resize_key(key));

    let mut chain = *iv;
    let (head, last_block) = padded.split_at(last);

    for chunk in head.chunks_exact(BLOCK) {
        xor_into(&mut chain, chunk);
        des.encrypt_block(&mut chain);
    }

    xor_into(&mut chain, last_block);
    tdes.encrypt_block(&mut chain);
    chain.into()
}

/// Chaining value for the next command: `DES-ECB(K1, previous MAC)`
pub fn encrypt_icv(mac_key: &Key<Scp02>, icv: &Iv<Scp02>) -> Iv<Scp02> {
    let mut mac = <CbcMac<Des> as Mac>::new(GenericArray::from_slice(&mac_key[..BLOCK]));
    mac.update(icv);
    mac.finalize().into_bytes()
}

/// Expand a 2-key 3DES key to `K1 ‖ K2 ‖ K1`
pub fn resize_key(key: &Key<Scp02>) -> Key<TdesEde3> {
    let mut result = Key::<TdesEde3>::default();
    result[..16].copy_from_slice(key);
    result[16..].copy_from_slice(&key[..BLOCK]);
    result
}

fn xor_into(block: &mut GenericArray<u8, U8>, data: &[u8]) {
    block.iter_mut().zip(data).for_each(|(a, b)| *a ^= b);
}
