use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::Sha1;

/// RFC 4648 Base32 alphabet
pub const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Time step shared with authenticator apps, in seconds
pub const TIME_STEP: u64 = 30;

/// Number of backup codes issued per batch
pub const BACKUP_CODE_COUNT: usize = 10;

static SECRET_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '6', '7',
];

/// Generate a new TOTP secret
///
/// 32 characters of the Base32 alphabet, 160 bits once decoded.
pub fn generate_secret() -> String {
    nanoid!(32, &SECRET_ALPHABET)
}

/// Generate a batch of single-use backup codes
///
/// Codes within a batch are drawn independently and are not deduplicated.
pub fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| rng.gen_range(10_000_000u32..=99_999_999).to_string())
        .collect()
}

/// Decode a Base32 string into raw bytes
///
/// Characters outside the alphabet are skipped and the first `=` padding
/// character ends the data. Manual entry keys are displayed grouped in
/// blocks of four; the separators must not affect the decoded secret.
pub fn base32_decode(input: &str) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for ch in input.chars() {
        if ch == '=' {
            break;
        }

        let ch = ch.to_ascii_uppercase();
        let value = match BASE32_ALPHABET.iter().position(|&c| c as char == ch) {
            Some(value) => value as u32,
            None => continue,
        };

        buffer = (buffer << 5) | value;
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            output.push((buffer >> bits) as u8);
        }
    }

    output
}

/// Generate an HOTP code for a counter value
///
/// HMAC-SHA1 over the big-endian counter, dynamically truncated to a
/// 31-bit integer and reduced to six digits, as per RFC 4226.
pub fn hotp(secret: &[u8], counter: u64) -> String {
    let mut mac =
        Hmac::<Sha1>::new_from_slice(secret).expect("hmac accepts keys of any length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[19] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    format!("{:06}", binary % 1_000_000)
}

/// Generate the TOTP code for a Base32 secret at a given Unix time
pub fn totp_at(secret: &str, seconds: u64) -> String {
    hotp(&base32_decode(secret), seconds / TIME_STEP)
}

/// Generate the current TOTP code for a Base32 secret
pub fn totp(secret: &str) -> String {
    totp_at(secret, unix_time())
}

/// Verify a submitted code against a Base32 secret at a given Unix time
///
/// Accepts the code if it matches any time step within ± `window` steps.
/// Does not reveal which step matched.
pub fn verify_at(secret: &str, code: &str, seconds: u64, window: u64) -> bool {
    let secret = base32_decode(secret);
    let current = seconds / TIME_STEP;

    let mut valid = false;
    for counter in current.saturating_sub(window)..=current + window {
        if constant_time_eq(hotp(&secret, counter).as_bytes(), code.as_bytes()) {
            valid = true;
        }
    }

    valid
}

/// Verify a submitted code against a Base32 secret
pub fn verify(secret: &str, code: &str, window: u64) -> bool {
    verify_at(secret, code, unix_time(), window)
}

/// Build the otpauth provisioning URI consumed by authenticator apps
///
/// Time step, digit count and algorithm are left at the defaults every
/// mainstream app assumes, so no extra parameters are emitted.
pub fn provisioning_uri(issuer: &str, label: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}",
        urlencoding::encode(issuer),
        urlencoding::encode(label),
        secret,
        urlencoding::encode(issuer)
    )
}

/// Group a secret into blocks of four for manual entry
pub fn manual_entry_key(secret: &str) -> String {
    secret
        .as_bytes()
        .chunks(4)
        .map(|block| std::str::from_utf8(block).expect("secret is ASCII"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is past the Unix epoch")
        .as_secs()
}
