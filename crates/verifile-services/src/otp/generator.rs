use rand::Rng;
use verifile_core::constants::OTP_LENGTH;

/// Uniformly random numeric code of [`OTP_LENGTH`] digits, leading zeros kept.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
