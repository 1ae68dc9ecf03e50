//! The fixed set of benchmarks a front-end can offer.
//!
//! Each [`BenchmarkKind`] is statically bound to one [`ArtifactPair`]: a circom
//! circuit description (`.r1cs`) and the witness (`.wtns`) that satisfies it.
//! Pairs are never mixed across kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::BenchError;

/// Name of a bundled artifact file, e.g. `rsa.r1cs`.
///
/// Staged copies carry the same file name as the bundled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactName(&'static str);

impl ArtifactName {
    pub const fn new(name: &'static str) -> Self {
        ArtifactName(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl AsRef<std::path::Path> for ArtifactName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(self.0)
    }
}

/// Circuit description and witness consumed together by one native run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactPair {
    pub circuit: ArtifactName,
    pub witness: ArtifactName,
}

impl ArtifactPair {
    const fn new(circuit: &'static str, witness: &'static str) -> Self {
        ArtifactPair {
            circuit: ArtifactName::new(circuit),
            witness: ArtifactName::new(witness),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkKind {
    #[value(name = "vc_and_disclose")]
    VcAndDisclose,
    #[value(name = "rsa")]
    Rsa,
    #[value(name = "prove_rsa_65537_sha256")]
    #[serde(rename = "prove_rsa_65537_sha256")]
    ProveRsa65537Sha256,
    #[value(name = "prove_ecdsa_secp256r1_sha256")]
    #[serde(rename = "prove_ecdsa_secp256r1_sha256")]
    ProveEcdsaSecp256r1Sha256,
}

impl BenchmarkKind {
    pub const ALL: [BenchmarkKind; 4] = [
        BenchmarkKind::VcAndDisclose,
        BenchmarkKind::Rsa,
        BenchmarkKind::ProveRsa65537Sha256,
        BenchmarkKind::ProveEcdsaSecp256r1Sha256,
    ];

    pub const fn artifacts(self) -> ArtifactPair {
        match self {
            BenchmarkKind::VcAndDisclose => {
                ArtifactPair::new("vc_and_disclose.r1cs", "vc_and_disclose.wtns")
            }
            BenchmarkKind::Rsa => ArtifactPair::new("rsa.r1cs", "rsa.wtns"),
            BenchmarkKind::ProveRsa65537Sha256 => ArtifactPair::new(
                "prove_rsa_65537_sha256.r1cs",
                "prove_rsa_65537_sha256.wtns",
            ),
            BenchmarkKind::ProveEcdsaSecp256r1Sha256 => ArtifactPair::new(
                "prove_ecdsa_secp256r1_sha256.r1cs",
                "prove_ecdsa_secp256r1_sha256.wtns",
            ),
        }
    }

    /// Stable identifier, also the stem of both artifact file names.
    pub const fn slug(self) -> &'static str {
        match self {
            BenchmarkKind::VcAndDisclose => "vc_and_disclose",
            BenchmarkKind::Rsa => "rsa",
            BenchmarkKind::ProveRsa65537Sha256 => "prove_rsa_65537_sha256",
            BenchmarkKind::ProveEcdsaSecp256r1Sha256 => "prove_ecdsa_secp256r1_sha256",
        }
    }

    /// Label for the control that triggers this benchmark.
    pub const fn title(self) -> &'static str {
        match self {
            BenchmarkKind::VcAndDisclose => "Run VC and Disclose Benchmark",
            BenchmarkKind::Rsa => "Run RSA Benchmark",
            BenchmarkKind::ProveRsa65537Sha256 => "Run Prove RSA 65537 SHA256 Benchmark",
            BenchmarkKind::ProveEcdsaSecp256r1Sha256 => {
                "Run Prove ECDSA secp256r1 SHA256 Benchmark"
            }
        }
    }
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for BenchmarkKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BenchmarkKind::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| BenchError::Message(format!("unknown benchmark: {s}")))
    }
}
