//! A3S Attest CLI - produce and check attestation reports.

pub mod commands;
