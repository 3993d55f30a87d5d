//! Auth plug-in architecture: responds to a CHALLENGE with an AUTHENTICATE
//! or aborts. Grounded on the reference implementation's `AuthMethodABC`/
//! `AuthKeyring` and the cryptosign flow already present in the teacher
//! crate's client code.

use std::collections::HashMap;

use crate::message::WampDict;
use crate::error::WampError;

/// The CHALLENGE message content handed to an auth plug-in.
#[derive(Clone, Debug)]
pub struct Challenge {
    pub auth_method: String,
    pub extra: WampDict,
}

/// What an auth plug-in does in response to a CHALLENGE.
pub enum AuthenticateOutcome {
    Authenticate { signature: String, extra: WampDict },
    Abort { reason: String, details: WampDict },
}

/// Response returned by a user-supplied challenge-handling closure (used by
/// `Client::join_realm_with_authentication`).
pub struct AuthenticationChallengeResponse {
    pub signature: String,
    pub extra: WampDict,
}

impl AuthenticationChallengeResponse {
    pub fn with_signature<T: Into<String>>(signature: T) -> Self {
        AuthenticationChallengeResponse { signature: signature.into(), extra: WampDict::new() }
    }

    pub fn with_signature_and_extra<T: Into<String>>(signature: T, extra: WampDict) -> Self {
        AuthenticationChallengeResponse { signature: signature.into(), extra }
    }
}

/// A pluggable authentication method: responds to a CHALLENGE with an
/// AUTHENTICATE or aborts, and may validate the final WELCOME.
pub trait AuthMethod: Send + Sync {
    fn method_name(&self) -> &'static str;
    fn requires_auth_id(&self) -> bool;
    fn auth_extra(&self) -> Option<WampDict> {
        None
    }
    fn authenticate(&self, challenge: &Challenge) -> Result<AuthenticateOutcome, WampError>;
    fn check_welcome(&self, _welcome_details: &WampDict) -> Result<(), WampError> {
        Ok(())
    }
}

/// Groups auth plug-ins by method name. Refuses construction if two plug-ins
/// contribute contradictory `auth_extra` values, or if a plug-in requires an
/// auth_id that was not provided.
pub struct AuthKeyring {
    methods: HashMap<&'static str, Box<dyn AuthMethod>>,
    auth_id: Option<String>,
    auth_extra: Option<WampDict>,
}

impl std::fmt::Debug for AuthKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKeyring")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("auth_id", &self.auth_id)
            .field("auth_extra", &self.auth_extra)
            .finish()
    }
}

impl AuthKeyring {
    pub fn new(methods: Vec<Box<dyn AuthMethod>>, auth_id: Option<String>) -> Result<AuthKeyring, WampError> {
        let mut by_name: HashMap<&'static str, Box<dyn AuthMethod>> = HashMap::new();
        let mut auth_extra = WampDict::new();

        for method in methods {
            let name = method.method_name();
            if by_name.contains_key(name) {
                return Err(WampError::AuthError(format!("received the same auth method twice: {}", name)));
            }
            if auth_id.is_none() && method.requires_auth_id() {
                return Err(WampError::AuthError(format!("auth method '{}' requires an auth_id", name)));
            }
            if let Some(extra) = method.auth_extra() {
                for (k, v) in extra {
                    if let Some(existing) = auth_extra.get(&k) {
                        if existing != &v {
                            return Err(WampError::AuthError(format!(
                                "auth method '{}' contributes conflicting auth_extra key '{}'",
                                name, k
                            )));
                        }
                    }
                    auth_extra.insert(k, v);
                }
            }
            by_name.insert(name, method);
        }

        Ok(AuthKeyring {
            methods: by_name,
            auth_id,
            auth_extra: if auth_extra.is_empty() { None } else { Some(auth_extra) },
        })
    }

    pub fn get(&self, method_name: &str) -> Option<&dyn AuthMethod> {
        self.methods.get(method_name).map(|b| b.as_ref())
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        self.methods.keys().copied().collect()
    }

    pub fn auth_id(&self) -> Option<&str> {
        self.auth_id.as_deref()
    }

    pub fn auth_extra(&self) -> Option<&WampDict> {
        self.auth_extra.as_ref()
    }
}

/// `anonymous`: no challenge is ever expected for this method.
pub struct Anonymous;

impl AuthMethod for Anonymous {
    fn method_name(&self) -> &'static str {
        "anonymous"
    }
    fn requires_auth_id(&self) -> bool {
        false
    }
    fn authenticate(&self, _challenge: &Challenge) -> Result<AuthenticateOutcome, WampError> {
        Err(WampError::AuthError("anonymous authentication does not expect a CHALLENGE".into()))
    }
}

/// `ticket`: responds to any CHALLENGE with the preconfigured ticket string.
pub struct Ticket {
    ticket: String,
}

impl Ticket {
    pub fn new<T: Into<String>>(ticket: T) -> Ticket {
        Ticket { ticket: ticket.into() }
    }
}

impl AuthMethod for Ticket {
    fn method_name(&self) -> &'static str {
        "ticket"
    }
    fn requires_auth_id(&self) -> bool {
        true
    }
    fn authenticate(&self, _challenge: &Challenge) -> Result<AuthenticateOutcome, WampError> {
        Ok(AuthenticateOutcome::Authenticate { signature: self.ticket.clone(), extra: WampDict::new() })
    }
}

/// `wampcra`: derives a signing secret (optionally via PBKDF2) and HMACs the
/// challenge. The concrete cryptography is a Non-goal of this crate, so this
/// plug-in implements the interface but reports `AuthError` rather than
/// shipping an unaudited hand-rolled PBKDF2/HMAC implementation.
pub struct WampCra {
    #[allow(dead_code)]
    secret: String,
}

impl WampCra {
    pub fn new<T: Into<String>>(secret: T) -> WampCra {
        WampCra { secret: secret.into() }
    }
}

impl AuthMethod for WampCra {
    fn method_name(&self) -> &'static str {
        "wampcra"
    }
    fn requires_auth_id(&self) -> bool {
        true
    }
    fn authenticate(&self, _challenge: &Challenge) -> Result<AuthenticateOutcome, WampError> {
        Err(WampError::AuthError(
            "wampcra signing is not implemented by this crate; bring your own HMAC-SHA256/PBKDF2 via a custom AuthMethod".into(),
        ))
    }
}

/// `cryptosign`: signs the hex-encoded challenge with the Ed25519 keypair
/// derived from the configured secret key.
pub struct CryptoSign {
    secret_key: Vec<u8>,
}

impl CryptoSign {
    pub fn new<T: AsRef<str>>(secret_key_hex: T) -> CryptoSign {
        CryptoSign { secret_key: hex::decode(secret_key_hex.as_ref()).unwrap_or_default() }
    }

    pub fn public_key_hex(&self) -> Result<String, WampError> {
        let keypair = nacl::sign::generate_keypair(&self.secret_key);
        Ok(hex::encode(&keypair.pkey))
    }
}

impl AuthMethod for CryptoSign {
    fn method_name(&self) -> &'static str {
        "cryptosign"
    }
    fn requires_auth_id(&self) -> bool {
        true
    }
    fn auth_extra(&self) -> Option<WampDict> {
        self.public_key_hex()
            .ok()
            .map(|pubkey| {
                let mut d = WampDict::new();
                d.insert("pubkey".into(), crate::message::Arg::String(pubkey));
                d
            })
    }
    fn authenticate(&self, challenge: &Challenge) -> Result<AuthenticateOutcome, WampError> {
        let challenge_hex = challenge
            .extra
            .get("challenge")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WampError::AuthError("CHALLENGE.extra missing 'challenge' hex string".into()))?;
        let challenge_bytes = hex::decode(challenge_hex)
            .map_err(|e| WampError::AuthError(format!("challenge is not valid hex: {}", e)))?;

        let keypair = nacl::sign::generate_keypair(&self.secret_key);
        let signed = nacl::sign::sign(&challenge_bytes, &keypair.skey)
            .map_err(|e| WampError::AuthError(format!("failed to sign challenge: {:?}", e)))?;
        // nacl's sign() prepends the 64-byte detached signature to the message.
        let signature_hex = hex::encode(&signed[..64]);

        Ok(AuthenticateOutcome::Authenticate { signature: signature_hex, extra: WampDict::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyring_rejects_missing_auth_id_when_required() {
        let err = AuthKeyring::new(vec![Box::new(Ticket::new("t"))], None).unwrap_err();
        assert!(matches!(err, WampError::AuthError(_)));
    }

    #[test]
    fn keyring_accepts_anonymous_without_auth_id() {
        let kr = AuthKeyring::new(vec![Box::new(Anonymous)], None).unwrap();
        assert_eq!(kr.method_names(), vec!["anonymous"]);
    }

    #[test]
    fn keyring_rejects_duplicate_methods() {
        let err = AuthKeyring::new(
            vec![Box::new(Ticket::new("a")), Box::new(Ticket::new("b"))],
            Some("alice".into()),
        )
        .unwrap_err();
        assert!(matches!(err, WampError::AuthError(_)));
    }

    #[test]
    fn ticket_authenticate_echoes_configured_ticket() {
        let t = Ticket::new("s3cr3t");
        let outcome = t
            .authenticate(&Challenge { auth_method: "ticket".into(), extra: WampDict::new() })
            .unwrap();
        match outcome {
            AuthenticateOutcome::Authenticate { signature, .. } => assert_eq!(signature, "s3cr3t"),
            _ => panic!("expected Authenticate"),
        }
    }
}
