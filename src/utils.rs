/// Mix two hash words into one. All arithmetic is wrapping: the result is
/// used for hashing, not for bijective encoding.
pub fn mix2(a: u64, b: u64) -> u64 {
    let x = (a ^ b.rotate_left(32)).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^ (x >> 29)
}

/// Greatest common divisor. `gcd(0, b) == b` and `gcd(a, 0) == a`.
pub fn gcd(a: u64, b: u64) -> u64 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(18, 12), 6);
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(gcd(5, 0), 5);
        assert_eq!(gcd(0, 0), 0);
        assert_eq!(gcd(7, 13), 1);
    }

    #[test]
    fn test_mix2_spreads() {
        assert_ne!(mix2(1, 2), mix2(2, 1));
        assert_ne!(mix2(0, 1), mix2(1, 0));
    }
}
