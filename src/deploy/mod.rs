use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::verify::{VerificationQueue, VerifyError};

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("unresolved reference ${0}")]
    UnresolvedReference(String),
    #[error("reference cycle through ${0}")]
    ReferenceCycle(String),
    #[error("expected an address, got {0}")]
    NotAnAddress(String),
    #[error("contract id {0} is deployed twice")]
    DuplicateId(String),
    #[error("deployment of {artifact} failed: {reason}")]
    DeployFailed { artifact: String, reason: String },
    #[error("call {method} on {target} failed: {reason}")]
    CallFailed {
        target: String,
        method: String,
        reason: String,
    },
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed plan {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Queue(#[from] VerifyError),
}

/// Declarative description of a deployment: constants plus an ordered list
/// of contract deployments and configuration calls.
///
/// Any string argument of the form `"$name"` refers to the address of an
/// earlier deployment with that id, or to the constant `name`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeployPlan {
    pub network: String,
    pub deployer: String,
    pub constants: BTreeMap<String, Value>,
    pub steps: Vec<Step>,
}

impl Default for DeployPlan {
    fn default() -> Self {
        Self {
            network: "hardhat".into(),
            deployer: "0x0000000000000000000000000000000000000000".into(),
            constants: BTreeMap::new(),
            steps: Vec::new(),
        }
    }
}

impl DeployPlan {
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let bytes = fs::read(path).map_err(|source| DeployError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| DeployError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Deploy(ContractStep),
    Call(CallStep),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContractStep {
    pub id: String,
    pub artifact: String,
    #[serde(default)]
    pub args: Vec<Value>,
    /// Register the deployed vault as a chef pool right after deployment.
    #[serde(default)]
    pub register: Option<Registration>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Registration {
    pub chef: String,
    pub want: Value,
    pub alloc_points: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CallStep {
    pub target: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Chain-facing side of the runner.
pub trait Deployer {
    /// Deploys `artifact` and returns its address.
    fn deploy(&mut self, artifact: &str, args: &[Value]) -> Result<String, DeployError>;
    fn call(&mut self, target: &str, method: &str, args: &[Value]) -> Result<(), DeployError>;
}

struct Resolver<'a> {
    constants: &'a BTreeMap<String, Value>,
    deployed: &'a BTreeMap<String, String>,
}

impl<'a> Resolver<'a> {
    fn new(constants: &'a BTreeMap<String, Value>, deployed: &'a BTreeMap<String, String>) -> Self {
        Self {
            constants,
            deployed,
        }
    }

    fn resolve(&self, value: &Value) -> Result<Value, DeployError> {
        self.resolve_inner(value, &mut Vec::new())
    }

    fn resolve_all(&self, values: &[Value]) -> Result<Vec<Value>, DeployError> {
        values.iter().map(|v| self.resolve(v)).collect()
    }

    fn resolve_address(&self, reference: &str) -> Result<String, DeployError> {
        match self.resolve(&Value::String(reference.to_string()))? {
            Value::String(address) => Ok(address),
            other => Err(DeployError::NotAnAddress(other.to_string())),
        }
    }

    fn resolve_inner(&self, value: &Value, stack: &mut Vec<String>) -> Result<Value, DeployError> {
        match value {
            Value::String(s) => match s.strip_prefix('$') {
                Some(name) => self.lookup(name, stack),
                None => Ok(value.clone()),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_inner(item, stack))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut resolved = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    resolved.insert(key.clone(), self.resolve_inner(item, stack)?);
                }
                Ok(Value::Object(resolved))
            }
            _ => Ok(value.clone()),
        }
    }

    fn lookup(&self, name: &str, stack: &mut Vec<String>) -> Result<Value, DeployError> {
        if let Some(address) = self.deployed.get(name) {
            return Ok(Value::String(address.clone()));
        }
        let constant = self
            .constants
            .get(name)
            .ok_or_else(|| DeployError::UnresolvedReference(name.to_string()))?;
        if stack.iter().any(|seen| seen == name) {
            return Err(DeployError::ReferenceCycle(name.to_string()));
        }
        stack.push(name.to_string());
        let resolved = self.resolve_inner(constant, stack);
        stack.pop();
        resolved
    }
}

#[derive(Debug, Default, Serialize)]
pub struct DeployReport {
    pub addresses: BTreeMap<String, String>,
    pub calls: usize,
}

/// Executes `plan` step by step. Every deployment is appended to `queue`,
/// which is written to `queue_path` right away so that a failing step keeps
/// the entries before it.
pub fn run_plan<D: Deployer + ?Sized>(
    plan: &DeployPlan,
    deployer: &mut D,
    queue: &mut VerificationQueue,
    queue_path: Option<&Path>,
) -> Result<DeployReport, DeployError> {
    let mut report = DeployReport::default();
    for step in &plan.steps {
        match step {
            Step::Deploy(contract) => {
                if report.addresses.contains_key(&contract.id) {
                    return Err(DeployError::DuplicateId(contract.id.clone()));
                }
                let args = Resolver::new(&plan.constants, &report.addresses).resolve_all(&contract.args)?;
                let address = deployer.deploy(&contract.artifact, &args)?;
                println!("Deployed: {}: {}", contract.id, address);
                report.addresses.insert(contract.id.clone(), address.clone());

                if let Some(registration) = &contract.register {
                    let resolver = Resolver::new(&plan.constants, &report.addresses);
                    let chef = resolver.resolve_address(&registration.chef)?;
                    let want = resolver.resolve(&registration.want)?;
                    deployer.call(
                        &chef,
                        "add",
                        &[
                            Value::from(registration.alloc_points),
                            want,
                            Value::Bool(false),
                            Value::String(address.clone()),
                        ],
                    )?;
                    report.calls += 1;
                    println!("Added {} vault!", contract.id);
                }

                queue.push(&address, args);
                if let Some(path) = queue_path {
                    queue.save(path)?;
                }
            }
            Step::Call(call) => {
                let resolver = Resolver::new(&plan.constants, &report.addresses);
                let target = resolver.resolve_address(&call.target)?;
                let args = resolver.resolve_all(&call.args)?;
                deployer.call(&target, &call.method, &args)?;
                report.calls += 1;
                println!("Called {}.{}", call.target.trim_start_matches('$'), call.method);
            }
        }
    }
    Ok(report)
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    Deploy {
        nonce: u64,
        artifact: String,
        address: String,
        args: Vec<Value>,
    },
    Call {
        nonce: u64,
        target: String,
        method: String,
        args: Vec<Value>,
    },
}

/// Offline deployer. Addresses are derived from the deployer account, its
/// nonce, the artifact and the arguments, so a plan always dry-runs to the
/// same addresses.
pub struct DryRunDeployer {
    account: String,
    nonce: u64,
    transcript: Vec<TranscriptEntry>,
}

impl DryRunDeployer {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_lowercase(),
            nonce: 0,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    fn next_nonce(&mut self) -> u64 {
        let nonce = self.nonce;
        self.nonce += 1;
        nonce
    }
}

fn contract_address(account: &str, nonce: u64, artifact: &str, args: &[Value]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"cubchef-deploy");
    hasher.update(account.as_bytes());
    hasher.update(nonce.to_be_bytes());
    hasher.update(artifact.as_bytes());
    for arg in args {
        hasher.update(arg.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    format!("0x{}", hex::encode(&digest[12..]))
}

impl Deployer for DryRunDeployer {
    fn deploy(&mut self, artifact: &str, args: &[Value]) -> Result<String, DeployError> {
        let nonce = self.next_nonce();
        let address = contract_address(&self.account, nonce, artifact, args);
        self.transcript.push(TranscriptEntry::Deploy {
            nonce,
            artifact: artifact.to_string(),
            address: address.clone(),
            args: args.to_vec(),
        });
        Ok(address)
    }

    fn call(&mut self, target: &str, method: &str, args: &[Value]) -> Result<(), DeployError> {
        let nonce = self.next_nonce();
        self.transcript.push(TranscriptEntry::Call {
            nonce,
            target: target.to_string(),
            method: method.to_string(),
            args: args.to_vec(),
        });
        Ok(())
    }
}
