use anyhow::{Context as _, anyhow};
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use secrecy::{ExposeSecret, SecretString};

use happytails_core::blocking::spawn_blocking_with_tracing;

use crate::error::OtpServiceError;

/// Argon2id memory cost in KiB. Parameters are fixed; changing them only
/// affects newly issued codes since the PHC string carries its own params.
const ARGON2_M_COST: u32 = 15000;
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;

fn argon2() -> Result<Argon2<'static>, anyhow::Error> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, None)
        .map_err(|e| anyhow!("invalid argon2 params: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn compute_code_hash(code: &SecretString) -> Result<String, anyhow::Error> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!("encode salt: {e}"))?;
    let hash = argon2()?
        .hash_password(code.expose_secret().as_bytes(), &salt)
        .map_err(|e| anyhow!("hash otp: {e}"))?;
    Ok(hash.to_string())
}

fn matches_code_hash(code_hash: &str, code: &SecretString) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(code_hash).map_err(|e| anyhow!("parse otp hash: {e}"))?;
    match argon2()?.verify_password(code.expose_secret().as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("verify otp: {e}")),
    }
}

/// Salted one-way hash of an OTP, computed on the blocking pool.
pub async fn hash_code(code: &SecretString) -> Result<String, OtpServiceError> {
    let code = SecretString::from(code.expose_secret().to_owned());
    let hash = spawn_blocking_with_tracing(move || compute_code_hash(&code))
        .await
        .context("otp hashing task failed")??;
    Ok(hash)
}

/// Compare a submitted code against a stored hash on the blocking pool.
pub async fn verify_code(code_hash: &str, code: &SecretString) -> Result<bool, OtpServiceError> {
    let code_hash = code_hash.to_owned();
    let code = SecretString::from(code.expose_secret().to_owned());
    let matched = spawn_blocking_with_tracing(move || matches_code_hash(&code_hash, &code))
        .await
        .context("otp verification task failed")??;
    Ok(matched)
}
