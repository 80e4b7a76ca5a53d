use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use tracing::debug;

use crate::artifact::Artifact;
use crate::backends::Sink;
use crate::backends::s3::S3ConnectOptions;

/// 🪣 PutObject, with server-side encryption, to whichever bucket you name.
#[derive(Debug)]
pub(crate) struct S3Sink {
    client: aws_sdk_s3::Client,
}

impl S3Sink {
    /// 🚀 Resolve credentials and build a client. Called once per upload call.
    pub(crate) async fn connect(options: &S3ConnectOptions) -> Result<Self> {
        let sdk_config = options.resolve_sdk_config().await?;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &options.endpoint_url {
            // -- 🧪 S3-compatible stores want bucket-in-path, not bucket-in-hostname
            debug!("🧪 Using S3 endpoint override {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl Sink for S3Sink {
    async fn put(&mut self, bucket: &str, key: &str, artifact: &Artifact) -> Result<()> {
        // -- 🔄 a fresh ByteStream re-opens the file, so every bucket starts at byte zero
        let body = ByteStream::from_path(artifact.path())
            .await
            .with_context(|| format!("💀 Couldn't open the artifact for s3://{bucket}/{key}"))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .send()
            .await
            .map_err(|err| anyhow!("{}", DisplayErrorContext(&err)))
            .with_context(|| format!("💀 PutObject to s3://{bucket}/{key} failed"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::StaticKeys;
    use crate::artifact::ArtifactWriter;
    use crate::serializer::{OutputFormat, TimestampPolicy};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(endpoint: String) -> S3ConnectOptions {
        S3ConnectOptions {
            region: "us-west-2".into(),
            role_arn: None,
            static_keys: Some(StaticKeys {
                access_key_id: "AKIATEST".into(),
                secret_access_key: "not-a-real-secret".into(),
            }),
            endpoint_url: Some(endpoint),
        }
    }

    fn empty_artifact() -> Artifact {
        ArtifactWriter::create(
            "sis-data/test.gz",
            OutputFormat::Tsv,
            TimestampPolicy::new(vec![], chrono_tz::UTC),
        )
        .unwrap()
        .finish()
        .unwrap()
    }

    #[tokio::test]
    async fn the_one_where_the_object_lands_encrypted() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bucket-a/sis-data/test.gz"))
            .and(header("x-amz-server-side-encryption", "AES256"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut sink = S3Sink::connect(&options(server.uri())).await.unwrap();
        sink.put("bucket-a", "sis-data/test.gz", &empty_artifact()).await.unwrap();
    }

    #[tokio::test]
    async fn the_one_where_a_forbidden_bucket_is_an_error_not_a_panic() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bucket-locked/sis-data/test.gz"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Error><Code>AccessDenied</Code><Message>Access Denied</Message>\
                 <RequestId>r1</RequestId><HostId>h1</HostId></Error>",
            ))
            .mount(&server)
            .await;

        let mut sink = S3Sink::connect(&options(server.uri())).await.unwrap();
        let err = sink
            .put("bucket-locked", "sis-data/test.gz", &empty_artifact())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("bucket-locked"));
    }

    #[tokio::test]
    async fn the_one_where_the_role_desk_hands_out_a_session_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("Action=AssumeRole"))
            .and(body_string_contains("RoleSessionName=AssumeAppRoleSession"))
            .and(body_string_contains("DurationSeconds=3600"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    "<AssumeRoleResponse xmlns=\"https://sts.amazonaws.com/doc/2011-06-15/\">\
                     <AssumeRoleResult>\
                     <Credentials>\
                     <AccessKeyId>ASIATEMPORARY</AccessKeyId>\
                     <SecretAccessKey>temporary-secret</SecretAccessKey>\
                     <SessionToken>session-token-from-sts</SessionToken>\
                     <Expiration>2099-01-01T00:00:00Z</Expiration>\
                     </Credentials>\
                     <AssumedRoleUser>\
                     <AssumedRoleId>AROATEST:AssumeAppRoleSession</AssumedRoleId>\
                     <Arn>arn:aws:sts::123456789012:assumed-role/etl/AssumeAppRoleSession</Arn>\
                     </AssumedRoleUser>\
                     </AssumeRoleResult>\
                     <ResponseMetadata><RequestId>r1</RequestId></ResponseMetadata>\
                     </AssumeRoleResponse>",
                    "text/xml",
                ),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/bucket-a/sis-data/test.gz"))
            .and(header("x-amz-security-token", "session-token-from-sts"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut with_role = options(server.uri());
        with_role.role_arn = Some("arn:aws:iam::123456789012:role/etl".into());

        let mut sink = S3Sink::connect(&with_role).await.unwrap();
        sink.put("bucket-a", "sis-data/test.gz", &empty_artifact()).await.unwrap();
    }

    #[tokio::test]
    async fn the_one_where_a_refused_role_stops_before_any_bucket() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(403).set_body_raw(
                "<ErrorResponse><Error><Type>Sender</Type><Code>AccessDenied</Code>\
                 <Message>not authorized to perform: sts:AssumeRole</Message></Error>\
                 <RequestId>r2</RequestId></ErrorResponse>",
                "text/xml",
            ))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut with_role = options(server.uri());
        with_role.role_arn = Some("arn:aws:iam::123456789012:role/etl".into());

        let err = S3Sink::connect(&with_role).await.unwrap_err();
        assert!(format!("{err:#}").contains("AssumeRole failed"));
    }
}
