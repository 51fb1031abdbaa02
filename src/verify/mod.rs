use std::{
    collections::BTreeSet,
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed queue file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode queue: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0} is already verified")]
    AlreadyVerified(String),
    #[error("verification of {address} rejected: {reason}")]
    Rejected { address: String, reason: String },
}

impl VerifyError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        VerifyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A deployed contract awaiting source verification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub address: String,
    pub args: Vec<Value>,
}

/// Ordered list of deployments, persisted as a tab-indented JSON array.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct VerificationQueue {
    entries: Vec<QueueEntry>,
}

impl VerificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, address: &str, args: Vec<Value>) {
        self.entries.push(QueueEntry {
            address: address.to_string(),
            args,
        });
    }

    pub fn load(path: &Path) -> Result<Self, VerifyError> {
        let bytes = fs::read(path).map_err(|e| VerifyError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|source| VerifyError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json(&self) -> Result<String, VerifyError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| VerifyError::Encode(serde::ser::Error::custom(e)))
    }

    pub fn save(&self, path: &Path) -> Result<(), VerifyError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VerifyError::io(parent, e))?;
        }
        let text = self.to_json()?;
        fs::write(path, text).map_err(|e| VerifyError::io(path, e))
    }
}

/// Source-verification backend.
pub trait Verifier {
    fn verify(&mut self, entry: &QueueEntry) -> Result<(), VerifyError>;
}

#[derive(Debug, Default, Serialize)]
pub struct ReplayReport {
    pub verified: Vec<String>,
    pub already_verified: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Submits every queue entry. A failing entry is logged and skipped; it
/// never stops the entries after it.
pub fn replay<V: Verifier + ?Sized>(queue: &VerificationQueue, verifier: &mut V) -> ReplayReport {
    let mut report = ReplayReport::default();
    for entry in queue.entries() {
        println!("Verifying: {}", entry.address);
        match verifier.verify(entry) {
            Ok(()) => report.verified.push(entry.address.clone()),
            Err(VerifyError::AlreadyVerified(address)) => {
                eprintln!("{address}: already verified");
                report.already_verified.push(address);
            }
            Err(err) => {
                eprintln!("{}: {err}", entry.address);
                report.failed.push((entry.address.clone(), err.to_string()));
            }
        }
    }
    report
}

#[derive(Serialize, Deserialize)]
struct OutboxRequest {
    network: String,
    address: String,
    constructor_arguments: Vec<Value>,
}

/// Appends verification requests to a JSON-lines outbox, one per contract.
/// Addresses already present in the outbox count as verified.
pub struct OutboxVerifier {
    path: PathBuf,
    network: String,
    submitted: BTreeSet<String>,
}

impl OutboxVerifier {
    pub fn open(path: &Path, network: &str) -> Result<Self, VerifyError> {
        let mut submitted = BTreeSet::new();
        if path.exists() {
            let f = fs::File::open(path).map_err(|e| VerifyError::io(path, e))?;
            for line in BufReader::new(f).lines() {
                let line = line.map_err(|e| VerifyError::io(path, e))?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<OutboxRequest>(&line) {
                    Ok(req) if req.network == network => {
                        submitted.insert(req.address.to_lowercase());
                    }
                    Ok(_) => {}
                    Err(err) => eprintln!("skipping malformed outbox line: {err}"),
                }
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            network: network.to_string(),
            submitted,
        })
    }

    pub fn submitted(&self) -> usize {
        self.submitted.len()
    }
}

impl Verifier for OutboxVerifier {
    fn verify(&mut self, entry: &QueueEntry) -> Result<(), VerifyError> {
        let key = entry.address.to_lowercase();
        if self.submitted.contains(&key) {
            return Err(VerifyError::AlreadyVerified(entry.address.clone()));
        }
        let request = OutboxRequest {
            network: self.network.clone(),
            address: entry.address.clone(),
            constructor_arguments: entry.args.clone(),
        };
        let line = serde_json::to_string(&request).map_err(|e| VerifyError::Rejected {
            address: entry.address.clone(),
            reason: e.to_string(),
        })?;
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| VerifyError::io(&self.path, e))?;
        writeln!(out, "{line}").map_err(|e| VerifyError::io(&self.path, e))?;
        self.submitted.insert(key);
        Ok(())
    }
}
