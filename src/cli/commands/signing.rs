use crate::cli::utils::{output_error, output_value};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::security::{HmacSigner, Signer};

fn signer(config: &AppConfig) -> anyhow::Result<HmacSigner> {
    HmacSigner::new(&config.security.security_key).map_err(|e| anyhow::anyhow!("Invalid security key: {}", e))
}

pub fn sign(config: &AppConfig, data: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = signer(config)?.hash_data(data);
    output_value(&output_format, "token", &token)
}

pub fn verify(config: &AppConfig, token: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    match signer(config)?.validate_data(token) {
        Some(data) => output_value(&output_format, "data", &data),
        None => {
            output_error(&output_format, "Token failed verification", Some("INVALID_SIGNATURE"))?;
            anyhow::bail!("token failed verification")
        }
    }
}
