//! Process configuration.
//!
//! Every runtime knob arrives once at startup, from a CLI flag or its
//! environment fallback, and stays immutable afterwards. Handlers see the
//! parsed [`Settings`] through shared state instead of reading globals.

use clap::Parser;

use crate::carrier::CarrierAccount;

/// Runtime configuration for the gateway process.
#[derive(Parser, Debug, Clone)]
#[command(name = "niddgate-service", version, about = "NIDD carrier gateway")]
pub struct Settings {
    /// Address the HTTP listener binds to.
    #[arg(long, env = "GW_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Tokio worker threads; zero selects the runtime default.
    #[arg(long, env = "GW_WORKER_THREADS", default_value_t = 0)]
    pub worker_threads: usize,

    /// Redis instance holding the credential cache.
    #[arg(long, env = "GW_REDIS_URL", default_value = "redis://172.17.0.1:6379")]
    pub redis_url: String,

    /// URL the firmware artifact is fetched from.
    #[arg(long, env = "GW_FIRMWARE_URL")]
    pub firmware_url: String,

    /// Carrier account name.
    #[arg(long, env = "VZW_ACCOUNT_NAME")]
    pub account_name: String,

    /// OAuth client key (the carrier calls this the public key).
    #[arg(long, env = "VZW_PUBLIC_KEY")]
    pub public_key: String,

    /// OAuth client secret (the carrier calls this the private key).
    #[arg(long, env = "VZW_PRIVATE_KEY")]
    pub private_key: String,

    /// M2M portal username.
    #[arg(long, env = "VZW_USERNAME")]
    pub username: String,

    /// M2M portal password.
    #[arg(long, env = "VZW_PASSWORD")]
    pub password: String,

    /// MDN of the device NIDD messages are delivered to.
    #[arg(long, env = "GW_DEVICE_MDN")]
    pub device_mdn: String,

    /// Default delivery deadline for NIDD messages, in seconds.
    #[arg(long, env = "GW_MAX_DELIVERY_SECS", default_value_t = 400)]
    pub max_delivery_secs: u32,

    /// Service name registered as the account's callback listener.
    #[arg(long, env = "GW_LISTENER_NAME", default_value = "NiddService")]
    pub listener_name: String,

    /// URL submitted when registering the callback listener.
    #[arg(long, env = "GW_CALLBACK_URL", default_value = "")]
    pub callback_url: String,
}

impl Settings {
    /// Carrier-facing slice of the configuration.
    pub fn carrier_account(&self) -> CarrierAccount {
        CarrierAccount {
            account_name: self.account_name.clone(),
            public_key: self.public_key.clone(),
            private_key: self.private_key.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_args() -> Vec<&'static str> {
        vec![
            "niddgate-service",
            "--firmware-url",
            "https://releases.example.com/firmware.bin",
            "--account-name",
            "TestAccount-1",
            "--public-key",
            "pk",
            "--private-key",
            "sk",
            "--username",
            "user",
            "--password",
            "pass",
            "--device-mdn",
            "5551230000",
        ]
    }

    #[test]
    fn defaults_apply_when_only_required_args_are_given() {
        let settings = Settings::try_parse_from(required_args()).unwrap();
        assert_eq!(settings.listen_addr, "0.0.0.0:8080");
        assert_eq!(settings.worker_threads, 0);
        assert_eq!(settings.redis_url, "redis://172.17.0.1:6379");
        assert_eq!(settings.max_delivery_secs, 400);
        assert_eq!(settings.listener_name, "NiddService");
        assert_eq!(settings.callback_url, "");
    }

    #[test]
    fn missing_carrier_credentials_fail_parsing() {
        let result = Settings::try_parse_from(["niddgate-service"]);
        assert!(result.is_err());
    }

    #[test]
    fn carrier_account_carries_the_credential_fields() {
        let settings = Settings::try_parse_from(required_args()).unwrap();
        let account = settings.carrier_account();
        assert_eq!(account.account_name, "TestAccount-1");
        assert_eq!(account.public_key, "pk");
        assert_eq!(account.private_key, "sk");
        assert_eq!(account.username, "user");
        assert_eq!(account.password, "pass");
    }
}
