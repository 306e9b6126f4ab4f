//! Content audit of pairs the timestamp policy considers synced.
//!
//! Timestamps can agree while content differs, for example after an edit
//! that preserved the mtime. The auditor
//! streams both files through BLAKE3 and compares digests. It never copies
//! or modifies anything, and a mismatch is a finding rather than an error:
//! there is no basis to prefer either side.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use blake3::Hasher;
use serde::{Serialize, Serializer};
use tracing::debug;

use share_core::{Decision, Location, ManagedEntry};

/// Chunk size for streaming reads.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// BLAKE3 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Result of auditing one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Content is identical.
    Verified { digest: ContentHash },
    /// Timestamps agree but content differs. Needs manual resolution.
    Mismatched { local: ContentHash, shared: ContentHash },
    /// Shared side is remote; content is not readable from here.
    Unauditable,
    /// Not a candidate: the timestamp policy does not consider it synced.
    NotSynced { decision: Decision },
    /// Reading one of the files failed.
    Failed { message: String },
}

impl AuditOutcome {
    /// Check if this is a mismatch.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatched { .. })
    }
}

/// One audited entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditFinding {
    /// Local path.
    pub local: PathBuf,
    /// Shared location, rendered.
    pub shared: String,
    /// Verdict.
    #[serde(flatten)]
    pub outcome: AuditOutcome,
}

/// Results of an audit pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    /// Findings in the order entries were audited.
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    /// Entries whose content matched.
    pub fn verified(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.outcome, AuditOutcome::Verified { .. }))
    }

    /// Entries whose content differed.
    pub fn mismatched(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings.iter().filter(|f| f.outcome.is_mismatch())
    }

    /// Entries that could not be audited (remote shared root).
    pub fn unauditable(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.outcome, AuditOutcome::Unauditable))
    }

    /// Entries whose files could not be read.
    pub fn failed(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.outcome, AuditOutcome::Failed { .. }))
    }

    /// Check if any mismatch was found.
    pub fn has_mismatches(&self) -> bool {
        self.mismatched().next().is_some()
    }
}

/// Content auditor.
#[derive(Debug, Clone)]
pub struct Auditor {
    tolerance: Duration,
}

impl Auditor {
    /// Create an auditor using the same tolerance as the decision policy.
    pub fn new(tolerance: Duration) -> Self {
        Self { tolerance }
    }

    /// Audit a list of entries.
    pub fn audit(&self, entries: impl IntoIterator<Item = ManagedEntry>) -> AuditReport {
        let findings = entries
            .into_iter()
            .map(|entry| AuditFinding {
                outcome: self.audit_entry(&entry),
                local: entry.local,
                shared: entry.shared.to_string(),
            })
            .collect();
        AuditReport { findings }
    }

    /// Audit one entry.
    pub fn audit_entry(&self, entry: &ManagedEntry) -> AuditOutcome {
        let decision = entry.decision(self.tolerance);
        if decision != Decision::Synced {
            return AuditOutcome::NotSynced { decision };
        }

        let shared = match &entry.shared {
            Location::Local(path) => path,
            Location::Remote(_) => return AuditOutcome::Unauditable,
        };

        match hash_pair(&entry.local, shared) {
            Ok((local, shared)) if local == shared => {
                debug!(path = %entry.local.display(), digest = %local, "content verified");
                AuditOutcome::Verified { digest: local }
            }
            Ok((local, shared)) => AuditOutcome::Mismatched { local, shared },
            Err(e) => AuditOutcome::Failed {
                message: e.to_string(),
            },
        }
    }
}

/// Hash two files, reading both in lockstep.
///
/// Each round reads up to [`CHUNK_SIZE`] from both streams. A file that ends
/// early simply stops contributing, so a truncated side produces a
/// different digest.
pub fn hash_pair(a: &Path, b: &Path) -> io::Result<(ContentHash, ContentHash)> {
    let mut file_a = File::open(a)?;
    let mut file_b = File::open(b)?;
    let mut hasher_a = Hasher::new();
    let mut hasher_b = Hasher::new();
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];

    loop {
        let read_a = fill(&mut file_a, &mut buf_a)?;
        let read_b = fill(&mut file_b, &mut buf_b)?;
        if read_a == 0 && read_b == 0 {
            break;
        }
        hasher_a.update(&buf_a[..read_a]);
        hasher_b.update(&buf_b[..read_b]);
    }

    Ok((
        ContentHash::new(*hasher_a.finalize().as_bytes()),
        ContentHash::new(*hasher_b.finalize().as_bytes()),
    ))
}

/// Hash a single file in [`CHUNK_SIZE`] chunks.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = fill(&mut file, &mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

/// Read until `buf` is full or the reader is exhausted.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
