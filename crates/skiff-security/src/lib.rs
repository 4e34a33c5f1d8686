// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound-request and log hygiene for Skiff.
//!
//! Provides SSRF prevention for the web fetch tool (URL validation, a
//! filtering DNS resolver, and redirect re-validation) and secret redaction
//! for log output and error messages.

pub mod redact;
pub mod ssrf;

pub use redact::{redact, RedactingWriter};
pub use ssrf::{build_fetch_client, is_private_ip, validate_fetch_url, SsrfSafeResolver};
