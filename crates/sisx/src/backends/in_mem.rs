//! # Previously, on sisx...
//!
//! 🎬 The data was trapped in a production database nobody was allowed to touch
//! from a laptop. The buckets belonged to another account. The tests still had to run.
//!
//! So this module fakes both ends. [`InMemoryDatabase`] answers SQL with whatever a
//! responder closure says, and writes down every statement it was asked. The
//! [`InMemorySink`] keeps every object it was handed, and can be told to fail on
//! purpose for named buckets, which is the only honest way to test a retry-free uploader.
//!
//! ⚠️ This is NOT for production. This is for tests. If you're deploying this
//! to prod, please also deploy a therapist.
//!
//! ✅ No network calls. No listener. No IAM policy. Just vibes and heap memory.
//!
//! 🦆

mod in_mem_sink;
mod in_mem_source;

pub(crate) use in_mem_sink::{InMemorySink, StoredObject};
pub(crate) use in_mem_source::{InMemoryDatabase, InMemorySource, QueryResult};
