//! 0x01 ECRECOVER
//!
//! Input is `hash ‖ v ‖ r ‖ s`, right-padded to 128 bytes. A signature that does not recover
//! leaves the output empty rather than failing the call.

use crate::computation::Computation;
use crate::error::VmError;
use crate::instructions::padded_slice;
use pyrite_primitives::{pad32, H256, U256};
use tracing::trace;

const ECRECOVER_GAS: u64 = 3000;

/// secp256k1 group order, big-endian
const SECP256K1_N: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

fn word(input: &[u8], index: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&input[index * 32..(index + 1) * 32]);
    out
}

pub(super) fn ecrecover(computation: &mut Computation) -> Result<(), VmError> {
    computation.consume_gas(ECRECOVER_GAS, "ECRECOVER")?;
    let input = padded_slice(&computation.msg().data, U256::zero(), 128);

    let hash = H256::from_bytes(word(&input, 0));
    let v = U256::from_big_endian(&word(&input, 1));
    let r = word(&input, 2);
    let s = word(&input, 3);

    let recovery_id = if v == U256::from(27) {
        0
    } else if v == U256::from(28) {
        1
    } else {
        trace!(%v, "ecrecover: bad v");
        return Ok(());
    };
    for scalar in [&r, &s] {
        if scalar.iter().all(|b| *b == 0) || *scalar >= SECP256K1_N {
            trace!("ecrecover: scalar out of range");
            return Ok(());
        }
    }

    match pyrite_crypto::ecrecover(&hash, &r, &s, recovery_id) {
        Ok(address) => computation.set_output(pad32(address.as_bytes()).to_vec()),
        Err(err) => trace!(%err, "ecrecover: recovery failed"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::fork::Fork;
    use crate::precompiles::test_utils::run_precompile;
    use crate::precompiles::ECRECOVER;
    use k256::ecdsa::SigningKey;
    use pyrite_crypto::{keccak256, public_key_to_address};

    fn signed_input(key: &SigningKey, v_offset: u8) -> Vec<u8> {
        let hash = keccak256(b"pyrite");
        let (signature, recovery_id) = key.sign_prehash_recoverable(hash.as_bytes()).unwrap();
        let mut input = hash.as_bytes().to_vec();
        let mut v = [0u8; 32];
        v[31] = v_offset + recovery_id.to_byte();
        input.extend_from_slice(&v);
        input.extend_from_slice(&signature.r().to_bytes());
        input.extend_from_slice(&signature.s().to_bytes());
        input
    }

    #[test]
    fn test_recovers_signer() {
        let key = SigningKey::from_slice(&[0x42; 32]).unwrap();
        let expected = public_key_to_address(key.verifying_key());

        let computation = run_precompile(Fork::Frontier, ECRECOVER, &signed_input(&key, 27), 5000);
        assert!(computation.is_success());
        assert_eq!(computation.get_gas_used(), 3000);
        let output = computation.output();
        assert_eq!(output.len(), 32);
        assert_eq!(&output[..12], &[0u8; 12]);
        assert_eq!(&output[12..], expected.as_bytes());
    }

    #[test]
    fn test_bad_v_gives_empty_output() {
        let key = SigningKey::from_slice(&[0x42; 32]).unwrap();
        let computation = run_precompile(Fork::Frontier, ECRECOVER, &signed_input(&key, 0), 5000);
        assert!(computation.is_success());
        assert!(computation.output().is_empty());
        assert_eq!(computation.get_gas_used(), 3000);
    }

    #[test]
    fn test_zero_input_gives_empty_output() {
        let computation = run_precompile(Fork::Byzantium, ECRECOVER, &[], 5000);
        assert!(computation.is_success());
        assert!(computation.output().is_empty());
    }

    #[test]
    fn test_out_of_gas() {
        let computation = run_precompile(Fork::Byzantium, ECRECOVER, &[], 2999);
        assert!(computation.is_error());
    }
}
