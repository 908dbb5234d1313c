use hex::encode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Invalid signing key")]
pub struct SigningError;

/// HMAC-SHA256 of the query string, hex encoded, as required for `SIGNED` endpoints.
pub fn sign(secret_key: &str, query: &str) -> error_stack::Result<String, SigningError> {
    let mut mac: Hmac<Sha256> =
        Hmac::new_from_slice(secret_key.as_bytes()).map_err(|_| SigningError)?;
    mac.update(query.as_bytes());
    Ok(encode(mac.finalize().into_bytes()))
}

/// Appends `timestamp`, `recvWindow` and `signature` to `params` and renders the query string.
pub fn signed_query(
    params: &[(&str, String)],
    secret_key: &str,
    recv_window: u64,
    timestamp: i64,
) -> error_stack::Result<String, SigningError> {
    let mut query = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>();
    query.push(format!("recvWindow={recv_window}"));
    query.push(format!("timestamp={timestamp}"));
    let query = query.join("&");

    let signature = sign(secret_key, &query)?;
    Ok(format!("{query}&signature={signature}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

    #[test]
    fn test_documented_signature() {
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign(SECRET, query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signed_query_layout() {
        let query = signed_query(
            &[("current", "1".to_string()), ("size", "100".to_string())],
            SECRET,
            5000,
            1499827319559,
        )
        .unwrap();

        let (unsigned, signature) = query.split_once("&signature=").unwrap();
        assert_eq!(
            unsigned,
            "current=1&size=100&recvWindow=5000&timestamp=1499827319559"
        );
        assert_eq!(signature, sign(SECRET, unsigned).unwrap());
        assert_eq!(signature.len(), 64);
    }
}
