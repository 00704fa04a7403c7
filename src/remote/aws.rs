use crate::config::Config;
use crate::error::{ExtractionError, Result, StageError};
use crate::remote::{ExtractionFunction, InvokeResponse, ObjectStore};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;

const CREDENTIALS_PROVIDER: &str = "pdfsheet-config";

/// Builds the S3 and Lambda collaborators from a validated configuration.
///
/// The configuration is validated first; no client exists for an invalid
/// one. SDK-level retries are disabled.
pub async fn connect(config: &Config) -> Result<(S3Store, LambdaFunction)> {
    config.validate()?;

    let credentials = Credentials::new(
        config.aws_credentials.access_key_id.clone(),
        config.aws_credentials.secret_access_key.clone(),
        None,
        None,
        CREDENTIALS_PROVIDER,
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_credentials.region.clone()))
        .credentials_provider(credentials)
        .retry_config(RetryConfig::disabled())
        .load()
        .await;

    log::debug!("AWS clients configured for region {}", config.aws_credentials.region);

    Ok((
        S3Store::new(aws_sdk_s3::Client::new(&sdk_config)),
        LambdaFunction::new(aws_sdk_lambda::Client::new(&sdk_config)),
    ))
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> std::result::Result<(), StageError> {
        let length = body.len() as i64;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let (code, message) = describe_sdk_error(&e);
                StageError { code, message }
            })?;

        Ok(())
    }
}

pub struct LambdaFunction {
    client: aws_sdk_lambda::Client,
}

impl LambdaFunction {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionFunction for LambdaFunction {
    async fn invoke(
        &self,
        function_name: &str,
        payload: Vec<u8>,
    ) -> std::result::Result<InvokeResponse, ExtractionError> {
        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| {
                let (code, message) = describe_sdk_error(&e);
                ExtractionError::ClientError { code, message }
            })?;

        Ok(InvokeResponse {
            status_code: output.status_code(),
            function_error: output.function_error().map(str::to_string),
            payload: output
                .payload()
                .map(|blob| blob.as_ref().to_vec())
                .unwrap_or_default(),
        })
    }
}

/// Extracts an error code and a readable message from an SDK failure.
fn describe_sdk_error<E, R>(error: &SdkError<E, R>) -> (String, String)
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = error
        .code()
        .map(str::to_string)
        .unwrap_or_else(|| failure_kind(error).to_string());
    let message = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(error).to_string());
    (code, message)
}

fn failure_kind<E, R>(error: &SdkError<E, R>) -> &'static str {
    match error {
        SdkError::ConstructionFailure(_) => "ConstructionFailure",
        SdkError::TimeoutError(_) => "Timeout",
        SdkError::DispatchFailure(_) => "DispatchFailure",
        SdkError::ResponseError(_) => "ResponseError",
        SdkError::ServiceError(_) => "ServiceError",
        _ => "Unknown",
    }
}
