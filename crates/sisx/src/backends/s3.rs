//! ☁️ S3: the artifact's final resting place. Possibly several resting places.
//!
//! 🧠 Knowledge graph:
//! - [`S3ConnectOptions`]: region, role ARN, static keys, optional endpoint override (S3 and STS both)
//! - `credentials`: role → STS AssumeRole; keys → static provider; neither → default chain
//! - [`S3Sink`]: one SDK client per upload call, `PutObject` with SSE `AES256`
//! - Each `put` opens the artifact from byte zero, so bucket #3 sees the same bytes as bucket #1

mod credentials;
mod s3_sink;

pub(crate) use credentials::S3ConnectOptions;
pub(crate) use s3_sink::S3Sink;
