pub mod aws;
pub mod extraction;
pub mod staging;

#[cfg(test)]
pub(crate) mod fakes;

pub use aws::{connect, LambdaFunction, S3Store};
pub use extraction::{decode_response, ExtractionClient, ExtractionFunction, InvokeResponse};
pub use staging::{ObjectStore, StagingUploader, UploadedFile};
