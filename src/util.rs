use iso8601_timestamp::Timestamp;

use crate::Config;

/// Render the plain-text backup codes download
///
/// Human-facing only; nothing parses this file.
pub fn backup_codes_export(config: &Config, email: &str, codes: &[String]) -> String {
    let mut out = String::new();

    out.push_str(&format!("{} backup codes\n", config.product_name));
    out.push_str(&format!(
        "Generated: {}\n",
        Timestamp::now_utc().format()
    ));
    out.push_str(&format!("Account: {}\n\n", email));

    for (index, code) in codes.iter().enumerate() {
        out.push_str(&format!("{:>2}. {}\n", index + 1, code));
    }

    out.push_str(
        "\nEach code can be used once in place of an authenticator code if \
         you lose access to your device. Keep this file somewhere safe and \
         treat the codes like passwords.\n",
    );

    out
}
