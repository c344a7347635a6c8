//! Client for the Verizon ThingSpace NIDD APIs.
//!
//! Every operation is a single HTTP exchange against a fixed endpoint with
//! an explicit header set, and every operation builds its own short-lived
//! HTTP client, so no connection state leaks between gateway requests.
//! Token minting feeds the credential broker; the data operations expect the
//! broker-resolved token pair from the caller.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use crate::carrier::{CarrierError, MAX_ENCODED_MESSAGE_LEN, extract_field};
use crate::middleware::credentials::TokenMinter;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Production ThingSpace host.
pub const THINGSPACE_BASE_URL: &str = "https://thingspace.verizon.com";

const OAUTH_TOKEN_PATH: &str = "/api/ts/v1/oauth2/token";
const SESSION_LOGIN_PATH: &str = "/api/m2m/v1/session/login";
const NIDD_MESSAGE_PATH: &str = "/api/m2m/v1/devices/nidd/message";
const CALLBACK_PATH: &str = "/api/m2m/v1/callbacks";

/// Session tokens ride in this header, next to the OAuth bearer.
const SESSION_TOKEN_HEADER: &str = "VZ-M2M-Token";

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

fn build_client() -> Result<reqwest::Client, CarrierError> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GrantBody<'a> {
    grant_type: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct DeviceId<'a> {
    id: &'a str,
    kind: &'a str,
}

/// NIDD message envelope. `maximumDeliveryTime` is a decimal string on the
/// wire, not a number.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NiddMessageBody<'a> {
    device_ids: [DeviceId<'a>; 1],
    account_name: &'a str,
    maximum_delivery_time: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ListenerBody<'a> {
    name: &'a str,
    url: &'a str,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Everything the client needs to speak for one carrier account.
#[derive(Debug, Clone)]
pub struct CarrierAccount {
    pub account_name: String,
    pub public_key: String,
    pub private_key: String,
    pub username: String,
    pub password: String,
}

/// Credentialed client for one carrier account.
pub struct ThingSpaceClient {
    account: CarrierAccount,
    base_url: String,
}

impl ThingSpaceClient {
    /// Client against the production host.
    pub fn new(account: CarrierAccount) -> Self {
        Self::with_base_url(account, THINGSPACE_BASE_URL.to_string())
    }

    /// Client against a custom host (used by tests).
    pub fn with_base_url(account: CarrierAccount, base_url: String) -> Self {
        Self { account, base_url }
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Read the body, treating any non-2xx status as a failed call.
    async fn require_success(response: reqwest::Response) -> Result<String, CarrierError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CarrierError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    // -----------------------------------------------------------------------
    // Token minting
    // -----------------------------------------------------------------------

    /// POST the client-credentials grant and return the access token.
    pub async fn mint_auth_token(&self) -> Result<String, CarrierError> {
        let basic = BASE64.encode(format!(
            "{}:{}",
            self.account.public_key, self.account.private_key
        ));
        let body = serde_urlencoded::to_string(GrantBody {
            grant_type: "client_credentials",
        })
        .map_err(|e| CarrierError::Encode(e.to_string()))?;

        let url = format!("{}{}", self.base_url, OAUTH_TOKEN_PATH);
        let response = build_client()?
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Authorization", format!("Basic {basic}"))
            .body(body)
            .send()
            .await?;

        let body = Self::require_success(response).await?;
        extract_field(&body, "access_token")
    }

    /// Log in to the M2M session API and return the session token.
    pub async fn mint_session_token(&self, auth_token: &str) -> Result<String, CarrierError> {
        let url = format!("{}{}", self.base_url, SESSION_LOGIN_PATH);
        let response = build_client()?
            .post(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {auth_token}"))
            .json(&LoginBody {
                username: &self.account.username,
                password: &self.account.password,
            })
            .send()
            .await?;

        let body = Self::require_success(response).await?;
        extract_field(&body, "sessionToken")
    }

    // -----------------------------------------------------------------------
    // Device messaging
    // -----------------------------------------------------------------------

    /// Deliver one NIDD message to a device, returning the carrier's raw
    /// response body.
    ///
    /// The payload goes out base64-encoded; encodings longer than
    /// [`MAX_ENCODED_MESSAGE_LEN`] are rejected before any network traffic.
    pub async fn send_nidd_data(
        &self,
        auth_token: &str,
        session_token: &str,
        device_mdn: &str,
        max_delivery_secs: u32,
        message: &[u8],
    ) -> Result<String, CarrierError> {
        let encoded = BASE64.encode(message);
        if encoded.len() > MAX_ENCODED_MESSAGE_LEN {
            return Err(CarrierError::MessageTooLarge {
                encoded_len: encoded.len(),
            });
        }

        let body = NiddMessageBody {
            device_ids: [DeviceId {
                id: device_mdn,
                kind: "MDN",
            }],
            account_name: &self.account.account_name,
            maximum_delivery_time: max_delivery_secs.to_string(),
            message: encoded,
        };

        let url = format!("{}{}", self.base_url, NIDD_MESSAGE_PATH);
        let response = build_client()?
            .post(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {auth_token}"))
            .header(SESSION_TOKEN_HEADER, session_token)
            .json(&body)
            .send()
            .await?;

        Self::require_success(response).await
    }

    // -----------------------------------------------------------------------
    // Callback listeners
    // -----------------------------------------------------------------------

    /// List the listeners registered for the account.
    pub async fn list_callback_listeners(
        &self,
        auth_token: &str,
        session_token: &str,
    ) -> Result<String, CarrierError> {
        let url = format!(
            "{}{}/{}",
            self.base_url, CALLBACK_PATH, self.account.account_name
        );
        let response = build_client()?
            .get(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {auth_token}"))
            .header(SESSION_TOKEN_HEADER, session_token)
            .send()
            .await?;

        Self::require_success(response).await
    }

    /// Register `name` as a callback listener delivering to `listener_url`.
    pub async fn register_callback_listener(
        &self,
        auth_token: &str,
        session_token: &str,
        name: &str,
        listener_url: &str,
    ) -> Result<String, CarrierError> {
        let url = format!(
            "{}{}/{}",
            self.base_url, CALLBACK_PATH, self.account.account_name
        );
        let response = build_client()?
            .post(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {auth_token}"))
            .header(SESSION_TOKEN_HEADER, session_token)
            .json(&ListenerBody {
                name,
                url: listener_url,
            })
            .send()
            .await?;

        Self::require_success(response).await
    }

    /// Drop the named callback listener.
    pub async fn remove_callback_listener(
        &self,
        auth_token: &str,
        session_token: &str,
        name: &str,
    ) -> Result<String, CarrierError> {
        let url = format!(
            "{}{}/{}/name/{}",
            self.base_url, CALLBACK_PATH, self.account.account_name, name
        );
        let response = build_client()?
            .delete(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {auth_token}"))
            .header(SESSION_TOKEN_HEADER, session_token)
            .send()
            .await?;

        Self::require_success(response).await
    }
}

impl TokenMinter for ThingSpaceClient {
    async fn mint_auth_token(&self) -> Result<String, CarrierError> {
        ThingSpaceClient::mint_auth_token(self).await
    }

    async fn mint_session_token(&self, auth_token: &str) -> Result<String, CarrierError> {
        ThingSpaceClient::mint_session_token(self, auth_token).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ThingSpaceClient {
        ThingSpaceClient::with_base_url(
            CarrierAccount {
                account_name: "TestAccount-1".to_string(),
                public_key: "pk".to_string(),
                private_key: "sk".to_string(),
                username: "user".to_string(),
                password: "pass".to_string(),
            },
            // Unroutable; tests below must fail before any I/O.
            "http://127.0.0.1:0".to_string(),
        )
    }

    #[test]
    fn default_constructor_targets_production() {
        let client = ThingSpaceClient::new(test_client().account.clone());
        assert_eq!(client.base_url(), THINGSPACE_BASE_URL);
    }

    #[test]
    fn nidd_body_matches_the_wire_shape() {
        let body = NiddMessageBody {
            device_ids: [DeviceId {
                id: "5551230000",
                kind: "MDN",
            }],
            account_name: "TestAccount-1",
            maximum_delivery_time: 400.to_string(),
            message: BASE64.encode("ping"),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["deviceIds"][0]["id"], "5551230000");
        assert_eq!(value["deviceIds"][0]["kind"], "MDN");
        assert_eq!(value["accountName"], "TestAccount-1");
        assert_eq!(value["maximumDeliveryTime"], "400");
        assert_eq!(value["message"], "cGluZw==");
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_any_io() {
        let client = test_client();
        // 8149 raw bytes encode to 10868, just past the ceiling.
        let message = vec![0u8; 8149];
        let err = client
            .send_nidd_data("auth", "sess", "5551230000", 400, &message)
            .await
            .unwrap_err();
        match err {
            CarrierError::MessageTooLarge { encoded_len } => assert_eq!(encoded_len, 10_868),
            other => panic!("expected MessageTooLarge, got {other:?}"),
        }
    }
}
