use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sts::error::DisplayErrorContext;
use tracing::{debug, info};

use crate::app_config::{AppConfig, StaticKeys};

/// 🎭 The session name every assumed role shows up as in CloudTrail.
pub(crate) const ASSUME_ROLE_SESSION_NAME: &str = "AssumeAppRoleSession";
/// ⏳ One hour. Every job we run finishes well inside it. Allegedly.
pub(crate) const ASSUME_ROLE_DURATION_SECONDS: i32 = 3600;

/// 🔧 What the S3 sink needs to build a client. No network until `resolve_sdk_config`.
#[derive(Debug, Clone)]
pub(crate) struct S3ConnectOptions {
    pub(crate) region: String,
    pub(crate) role_arn: Option<String>,
    pub(crate) static_keys: Option<StaticKeys>,
    pub(crate) endpoint_url: Option<String>,
}

impl S3ConnectOptions {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self {
            region: config.aws_region.clone(),
            role_arn: config.role_arn().map(str::to_string),
            static_keys: config.static_keys(),
            endpoint_url: config.endpoint_url().map(str::to_string),
        }
    }

    /// 🔑 Build the SDK config, trading the role for temporary credentials if we have one.
    ///
    /// 💀 An AssumeRole failure is fatal. We'd rather stop here than let every bucket
    /// fail the same way with the same cryptic 403.
    pub(crate) async fn resolve_sdk_config(&self) -> Result<SdkConfig> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));
        if let Some(keys) = &self.static_keys {
            debug!("🔑 Using static access key {}", keys.access_key_id);
            loader = loader.credentials_provider(Credentials::new(
                keys.access_key_id.clone(),
                keys.secret_access_key.clone(),
                None,
                None,
                "sisx-static-keys",
            ));
        }
        let base = loader.load().await;

        let Some(role_arn) = &self.role_arn else {
            return Ok(base);
        };

        info!("🎭 Assuming role {} for S3 uploads", role_arn);
        let mut sts_config = aws_sdk_sts::config::Builder::from(&base);
        if let Some(endpoint) = &self.endpoint_url {
            debug!("🧪 Using STS endpoint override {}", endpoint);
            sts_config = sts_config.endpoint_url(endpoint);
        }
        let sts = aws_sdk_sts::Client::from_conf(sts_config.build());
        let assumed = sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(ASSUME_ROLE_SESSION_NAME)
            .duration_seconds(ASSUME_ROLE_DURATION_SECONDS)
            .send()
            .await
            .map_err(|err| anyhow!("{}", DisplayErrorContext(&err)))
            .with_context(|| format!("💀 AssumeRole failed for {role_arn}. No temporary credentials, no uploads."))?;
        let granted = assumed
            .credentials()
            .ok_or_else(|| anyhow!("💀 AssumeRole for {role_arn} succeeded but returned no credentials"))?;

        let temporary = Credentials::new(
            granted.access_key_id(),
            granted.secret_access_key(),
            Some(granted.session_token().to_string()),
            SystemTime::try_from(granted.expiration().to_owned()).ok(),
            ASSUME_ROLE_SESSION_NAME,
        );
        Ok(base
            .into_builder()
            .credentials_provider(SharedCredentialsProvider::new(temporary))
            .build())
    }
}
