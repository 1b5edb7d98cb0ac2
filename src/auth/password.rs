use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const ITERATIONS: u32 = 200_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Hash a password with a fresh random salt.
///
/// Output format is `{iterations}${salt_hex}${key_hex}`. The iteration
/// count travels with each record, so hashes written under an older count
/// stay verifiable if the default is ever raised.
pub fn hash_password(plain: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(plain.as_bytes(), &salt, ITERATIONS, &mut key);

    format!("{}${}${}", ITERATIONS, hex::encode(salt), hex::encode(key))
}

/// Check an attempt against a stored `iterations$salt$key` string.
///
/// Fail-closed: a malformed stored value denies instead of erroring, so a
/// bad row in the store can never crash a login path. Key comparison is
/// constant-time.
pub fn verify_password(stored: &str, attempt: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    if parts.len() != 3 {
        return false;
    }
    let iterations = match parts[0].parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => return false,
    };
    let salt = match hex::decode(parts[1]) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let expected = match hex::decode(parts[2]) {
        Ok(k) => k,
        Err(_) => return false,
    };

    let mut derived = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(attempt.as_bytes(), &salt, iterations, &mut derived);

    // ct_eq over slices of unequal length yields false, covering stored
    // keys that are valid hex but the wrong size.
    derived.ct_eq(&expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password);
        assert!(verify_password(&hash, password));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple");
        assert!(!verify_password(&hash, "wrong-password"));
    }

    #[test]
    fn salt_is_randomized_per_hash() {
        let password = "same-input";
        let first = hash_password(password);
        let second = hash_password(password);
        assert_ne!(first, second);
        assert!(verify_password(&first, password));
        assert!(verify_password(&second, password));
    }

    #[test]
    fn hash_has_expected_shape() {
        let hash = hash_password("whatever");
        let parts: Vec<&str> = hash.split('$').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "200000");
        assert_eq!(parts[1].len(), SALT_LEN * 2);
        assert_eq!(parts[2].len(), KEY_LEN * 2);
    }

    #[test]
    fn empty_password_roundtrips() {
        let hash = hash_password("");
        assert!(verify_password(&hash, ""));
        assert!(!verify_password(&hash, "not-empty"));
    }

    #[test]
    fn verify_fails_closed_on_malformed_stored_values() {
        let attempt = "anything";
        for stored in [
            "",
            "not-a-hash",
            "200000$deadbeef",
            "200000$aa$bb$cc",
            "not-a-number$00112233445566778899aabbccddeeff$00",
            "200000$zz-not-hex$00112233",
            "200000$00112233445566778899aabbccddeeff$zz-not-hex",
            "0$00112233445566778899aabbccddeeff$0011223344556677",
            "$$",
        ] {
            assert!(!verify_password(stored, attempt), "accepted: {stored:?}");
        }
    }

    #[test]
    fn verify_rejects_hex_key_of_wrong_length() {
        // Valid hex, but not a 32-byte key.
        let stored = "200000$00112233445566778899aabbccddeeff$aabb";
        assert!(!verify_password(stored, "anything"));
    }
}
