//! Request authentication
//!
//! Signing algorithms live with the platform gateway; the SDK only needs a seam
//! where a request picks up the caller's credential before it is sent.

use crate::config::Credential;

pub const ACCESS_KEY_HEADER: &str = "X-Access-Key-Id";
pub const REGION_HEADER: &str = "X-Region";
pub const SECURITY_TOKEN_HEADER: &str = "X-Security-Token";

/// Attaches authentication material to an outgoing request
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder;
}

/// Default signer: forwards the credential identity as headers
#[derive(Debug, Clone)]
pub struct CredentialSigner {
    credential: Credential,
}

impl CredentialSigner {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

impl RequestSigner for CredentialSigner {
    fn sign(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header(ACCESS_KEY_HEADER, &self.credential.access_key_id)
            .header(REGION_HEADER, &self.credential.region);

        match &self.credential.session_token {
            Some(token) => request.header(SECURITY_TOKEN_HEADER, token),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_sets_identity_headers() {
        let mut credential = Credential::new("ak-1", "sk-1", "cn-beijing");
        credential.session_token = Some("token-1".to_string());
        let signer = CredentialSigner::new(credential);

        let request = signer
            .sign(reqwest::Client::new().get("http://localhost/"))
            .build()
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers[ACCESS_KEY_HEADER], "ak-1");
        assert_eq!(headers[REGION_HEADER], "cn-beijing");
        assert_eq!(headers[SECURITY_TOKEN_HEADER], "token-1");
    }

    #[test]
    fn test_signer_never_sends_secret() {
        let signer = CredentialSigner::new(Credential::new("ak-1", "sk-secret", "cn-beijing"));
        let request = signer
            .sign(reqwest::Client::new().get("http://localhost/"))
            .build()
            .unwrap();

        assert!(request.headers().get(SECURITY_TOKEN_HEADER).is_none());
        for value in request.headers().values() {
            assert_ne!(value, "sk-secret");
        }
    }
}
