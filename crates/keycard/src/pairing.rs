//! Two-step PAIR handshake
//!
//! Both sides prove knowledge of the pairing token, derived from the pairing
//! password, and the card hands out a slot index and a salt. The pairing key
//! is `SHA256(token ‖ salt)`.

use nexum_keycard_apdu::{Channel, RandomSource};
use tracing::{debug, warn};

use crate::{
    Error, Result,
    commands::{PairFinalStepCommand, PairFirstStepCommand},
    crypto::{Challenge, calculate_cryptogram, generate_pairing_token, pairing_key},
    types::PairingInfo,
};

/// Pair with the card over `channel`
///
/// The card cryptogram is checked before the final step is sent, so a wrong
/// password never consumes a slot.
pub fn pair<C: Channel>(
    channel: &mut C,
    password: &str,
    rng: &mut dyn RandomSource,
) -> Result<PairingInfo> {
    let token = generate_pairing_token(password);

    let mut challenge = Challenge::default();
    rng.fill_bytes(&mut challenge);

    let card = channel.execute(&PairFirstStepCommand::new(challenge))?;
    if card.cryptogram != calculate_cryptogram(&token, &challenge) {
        warn!("card cryptogram does not match the pairing password");
        return Err(Error::PairingPasswordMismatch);
    }

    let response = calculate_cryptogram(&token, &card.challenge);
    let (index, salt) = channel.execute(&PairFinalStepCommand::new(response))?;

    debug!(index, "paired");
    Ok(PairingInfo::new(pairing_key(&token, &salt).into(), index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use nexum_keycard_apdu::{
        PlainChannel,
        mock::{MockTransport, StaticRandom},
    };

    const PASSWORD: &str = "KeycardDefaultPairing";

    fn first_step_response(password: &str) -> Vec<u8> {
        // StaticRandom::default() draws 01..20 as the host challenge
        let host_challenge: Challenge = std::array::from_fn(|i| i as u8 + 1);
        let mut data = calculate_cryptogram(&generate_pairing_token(password), &host_challenge).to_vec();
        data.extend_from_slice(&[0x77; 32]);
        data.extend_from_slice(&hex!("9000"));
        data
    }

    #[test]
    fn test_pair() {
        let mut final_step = vec![0x02];
        final_step.extend_from_slice(&[0x99; 32]);
        final_step.extend_from_slice(&hex!("9000"));

        let mut transport = MockTransport::with_responses([first_step_response(PASSWORD), final_step]);
        let info = pair(
            &mut PlainChannel::new(&mut transport),
            PASSWORD,
            &mut StaticRandom::default(),
        )
        .unwrap();

        let token = generate_pairing_token(PASSWORD);
        assert_eq!(info.index, 2);
        assert_eq!(info.key, <[u8; 32]>::from(pairing_key(&token, &[0x99; 32])));

        let sent = transport.sent();
        assert_eq!(&sent[1][..5], &hex!("8012010020"));
        assert_eq!(&sent[1][5..], &calculate_cryptogram(&token, &[0x77; 32]));
    }

    #[test]
    fn test_pair_wrong_password_stops_after_first_step() {
        let mut transport = MockTransport::with_responses([first_step_response("something else")]);
        let result = pair(
            &mut PlainChannel::new(&mut transport),
            PASSWORD,
            &mut StaticRandom::default(),
        );
        assert!(matches!(result, Err(Error::PairingPasswordMismatch)));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_pair_no_slots() {
        let mut transport = MockTransport::with_responses([hex!("6A84")]);
        let result = pair(
            &mut PlainChannel::new(&mut transport),
            PASSWORD,
            &mut StaticRandom::default(),
        );
        assert!(matches!(result, Err(Error::NoAvailablePairingSlots)));
    }
}
