use subtle::ConstantTimeEq;

/// Compare a submitted code with the expected one without early exit.
///
/// Both inputs are zero-padded to the longer length and the length check is
/// folded into the constant-time result, so a mismatch in length or content
/// is simply `false`.
pub fn codes_match(submitted: &str, expected: &str) -> bool {
    let (submitted, expected) = (submitted.as_bytes(), expected.as_bytes());
    let max_len = submitted.len().max(expected.len());

    let mut submitted_padded = vec![0u8; max_len];
    let mut expected_padded = vec![0u8; max_len];
    submitted_padded[..submitted.len()].copy_from_slice(submitted);
    expected_padded[..expected.len()].copy_from_slice(expected);

    let same_len = (submitted.len() as u64).ct_eq(&(expected.len() as u64));
    let same_bytes = submitted_padded.as_slice().ct_eq(expected_padded.as_slice());
    (same_len & same_bytes).into()
}
