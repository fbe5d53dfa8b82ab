use rand::Rng;

/// Width of a recovery code in digits.
pub const OTP_LEN: usize = 6;

/// Generate a zero-padded numeric one-time code. Uniformly distributed;
/// not required to be cryptographically strong.
pub fn generate_otp() -> String {
    format_otp(rand::thread_rng().gen_range(0..1_000_000))
}

fn format_otp(n: u32) -> String {
    format!("{n:0width$}", width = OTP_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_fixed_width_digits() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), OTP_LEN);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn small_values_are_zero_padded() {
        assert_eq!(format_otp(0), "000000");
        assert_eq!(format_otp(7), "000007");
        assert_eq!(format_otp(999_999), "999999");
    }
}
