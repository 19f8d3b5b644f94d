//! 0x06 ECADD, 0x07 ECMUL and 0x08 ECPAIRING on alt_bn128 (EIP-196, EIP-197)
//!
//! Points are pairs of 32-byte big-endian field elements with `(0, 0)` as the point at
//! infinity. G2 coordinates put the imaginary part first.

use crate::computation::Computation;
use crate::error::VmError;
use crate::instructions::padded_slice;
use bn::{AffineG1, AffineG2, Fq, Fq2, Fr, Group, Gt, G1, G2};
use pyrite_primitives::U256;

const ECADD_GAS: u64 = 500;
const ECMUL_GAS: u64 = 40_000;
const ECPAIRING_BASE_GAS: u64 = 100_000;
const ECPAIRING_POINT_GAS: u64 = 80_000;

const FQ_LEN: usize = 32;
const G1_LEN: usize = 2 * FQ_LEN;
const PAIR_LEN: usize = G1_LEN + 4 * FQ_LEN;

fn read_fq(input: &[u8]) -> Result<Fq, VmError> {
    Fq::from_slice(&input[..FQ_LEN]).map_err(|_| VmError::PrecompileFailure("field element out of range"))
}

fn read_g1(input: &[u8]) -> Result<G1, VmError> {
    let x = read_fq(&input[..FQ_LEN])?;
    let y = read_fq(&input[FQ_LEN..G1_LEN])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1::zero());
    }
    AffineG1::new(x, y)
        .map(G1::from)
        .map_err(|_| VmError::PrecompileFailure("point not on G1"))
}

fn read_fq2(input: &[u8]) -> Result<Fq2, VmError> {
    let imaginary = read_fq(&input[..FQ_LEN])?;
    let real = read_fq(&input[FQ_LEN..2 * FQ_LEN])?;
    Ok(Fq2::new(real, imaginary))
}

fn read_g2(input: &[u8]) -> Result<G2, VmError> {
    let x = read_fq2(&input[..2 * FQ_LEN])?;
    let y = read_fq2(&input[2 * FQ_LEN..4 * FQ_LEN])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G2::zero());
    }
    AffineG2::new(x, y)
        .map(G2::from)
        .map_err(|_| VmError::PrecompileFailure("point not on G2"))
}

fn encode_g1(point: G1) -> Result<Vec<u8>, VmError> {
    let mut output = vec![0u8; G1_LEN];
    if let Some(affine) = AffineG1::from_jacobian(point) {
        let encode_failed = |_| VmError::PrecompileFailure("point encoding failed");
        affine.x().to_big_endian(&mut output[..FQ_LEN]).map_err(encode_failed)?;
        affine.y().to_big_endian(&mut output[FQ_LEN..]).map_err(encode_failed)?;
    }
    Ok(output)
}

pub(super) fn ecadd(computation: &mut Computation) -> Result<(), VmError> {
    computation.consume_gas(ECADD_GAS, "ECADD")?;
    let input = padded_slice(&computation.msg().data, U256::zero(), 2 * G1_LEN);
    let p1 = read_g1(&input[..G1_LEN])?;
    let p2 = read_g1(&input[G1_LEN..])?;
    computation.set_output(encode_g1(p1 + p2)?);
    Ok(())
}

pub(super) fn ecmul(computation: &mut Computation) -> Result<(), VmError> {
    computation.consume_gas(ECMUL_GAS, "ECMUL")?;
    let input = padded_slice(&computation.msg().data, U256::zero(), G1_LEN + 32);
    let point = read_g1(&input[..G1_LEN])?;
    let scalar = Fr::from_slice(&input[G1_LEN..])
        .map_err(|_| VmError::PrecompileFailure("invalid scalar"))?;
    computation.set_output(encode_g1(point * scalar)?);
    Ok(())
}

pub(super) fn ecpairing(computation: &mut Computation) -> Result<(), VmError> {
    let input = computation.msg().data.clone();
    if input.len() % PAIR_LEN != 0 {
        return Err(VmError::PrecompileFailure("pairing input not a multiple of 192 bytes"));
    }
    let pairs = (input.len() / PAIR_LEN) as u64;
    let gas = ECPAIRING_POINT_GAS
        .checked_mul(pairs)
        .and_then(|gas| gas.checked_add(ECPAIRING_BASE_GAS))
        .ok_or(VmError::OutOfGas)?;
    computation.consume_gas(gas, "ECPAIRING")?;

    let points = input
        .chunks_exact(PAIR_LEN)
        .map(|chunk| Ok((read_g1(&chunk[..G1_LEN])?, read_g2(&chunk[G1_LEN..])?)))
        .collect::<Result<Vec<(G1, G2)>, VmError>>()?;
    let holds = points.is_empty() || bn::pairing_batch(&points) == Gt::one();

    let mut output = vec![0u8; 32];
    output[31] = u8::from(holds);
    computation.set_output(output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::VmError;
    use crate::fork::Fork;
    use crate::precompiles::test_utils::run_precompile;
    use crate::precompiles::{ECADD, ECMUL, ECPAIRING};

    const G1_GENERATOR: &str = concat!(
        "0000000000000000000000000000000000000000000000000000000000000001",
        "0000000000000000000000000000000000000000000000000000000000000002",
    );
    const G1_DOUBLE: &str = concat!(
        "030644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd3",
        "15ed738c0e0a7c92e7845f96b2ae9c0a68a6a449e3538fc7ff3ebf7a5a18a2c4",
    );
    const G2_GENERATOR: &str = concat!(
        "198e9393920d483a7260bfb731fb5d25f1aa493335a9e71297e485b7aef312c2",
        "1800deef121f1e76426a00665e5c4479674322d4f75edadd46debd5cd992f6ed",
        "090689d0585ff075ec9e99ad690c3395bc4b313370b38ef355acdadcd122975b",
        "12c85ea5db8c6deb4aab71808dcb408fe3d1e7690c43d37b4ce6cc0166fa7daa",
    );
    // -G1 generator
    const G1_NEGATED: &str = concat!(
        "0000000000000000000000000000000000000000000000000000000000000001",
        "30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd45",
    );

    #[test]
    fn test_ecadd_doubles_generator() {
        let input = hex::decode(format!("{G1_GENERATOR}{G1_GENERATOR}")).unwrap();
        let computation = run_precompile(Fork::Byzantium, ECADD, &input, 1000);
        assert!(computation.is_success());
        assert_eq!(hex::encode(computation.output()), G1_DOUBLE);
        assert_eq!(computation.get_gas_used(), 500);
    }

    #[test]
    fn test_ecadd_empty_input_is_infinity() {
        let computation = run_precompile(Fork::Byzantium, ECADD, &[], 1000);
        assert_eq!(computation.output(), &[0u8; 64][..]);
    }

    #[test]
    fn test_ecadd_rejects_point_off_curve() {
        let mut input = hex::decode(G1_GENERATOR).unwrap();
        input[63] = 3;
        let computation = run_precompile(Fork::Byzantium, ECADD, &input, 1000);
        assert!(matches!(computation.error(), Some(VmError::PrecompileFailure(_))));
        assert_eq!(computation.get_gas_used(), 1000);
    }

    #[test]
    fn test_ecmul_by_two() {
        let input = hex::decode(format!("{G1_GENERATOR}{:064x}", 2)).unwrap();
        let computation = run_precompile(Fork::Byzantium, ECMUL, &input, 50_000);
        assert_eq!(hex::encode(computation.output()), G1_DOUBLE);
        assert_eq!(computation.get_gas_used(), 40_000);
    }

    #[test]
    fn test_ecpairing_empty_input_holds() {
        let computation = run_precompile(Fork::Byzantium, ECPAIRING, &[], 200_000);
        assert!(computation.is_success());
        assert_eq!(computation.output()[31], 1);
        assert_eq!(computation.get_gas_used(), 100_000);
    }

    #[test]
    fn test_ecpairing_inverse_pair_holds() {
        // e(P, Q) * e(-P, Q) == 1
        let input =
            hex::decode(format!("{G1_GENERATOR}{G2_GENERATOR}{G1_NEGATED}{G2_GENERATOR}")).unwrap();
        let computation = run_precompile(Fork::Byzantium, ECPAIRING, &input, 300_000);
        assert!(computation.is_success());
        assert_eq!(computation.output()[31], 1);
        assert_eq!(computation.get_gas_used(), 260_000);
    }

    #[test]
    fn test_ecpairing_single_pair_fails_check() {
        let input = hex::decode(format!("{G1_GENERATOR}{G2_GENERATOR}")).unwrap();
        let computation = run_precompile(Fork::Byzantium, ECPAIRING, &input, 300_000);
        assert!(computation.is_success());
        assert_eq!(computation.output(), &[0u8; 32][..]);
    }

    #[test]
    fn test_ecpairing_bad_length() {
        let computation = run_precompile(Fork::Byzantium, ECPAIRING, &[0u8; 100], 300_000);
        assert!(computation.is_error());
        assert_eq!(computation.get_gas_used(), 300_000);
    }
}
