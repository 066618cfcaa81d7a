//! Identifier allocation

use bech32::Bech32m;
use uuid7::uuid7;

/// Human readable prefix of every version id.
pub const VERSION_ID_HRP: &str = "ver_";

// construct a time ordered uuid then encode it using bech32m
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub fn new_version_id() -> anyhow::Result<String> {
    new_uuid_to_bech32(VERSION_ID_HRP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ids_carry_the_prefix() {
        let id = new_version_id().unwrap();
        assert!(id.starts_with("ver_1"));
    }

    #[test]
    fn version_ids_are_unique() {
        let a = new_version_id().unwrap();
        let b = new_version_id().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_hrp_is_rejected() {
        assert!(new_uuid_to_bech32("").is_err());
    }
}
