//! Batch scripts: a JSON array of steps run against one emulator

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use emulator_core::{AssetLedger, DatabaseKey, Emulator, MemoryDatabase, MutableDatabase};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// One scripted call on the emulator
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Step {
    Register {
        id: String,
        name: String,
        file: PathBuf,
        #[serde(default)]
        properties: Option<Value>,
    },
    RegisterFunction {
        id: String,
        name: String,
        file: PathBuf,
    },
    SetCertificate {
        holder_id: String,
        version: i32,
    },
    Execute {
        id: String,
        #[serde(default = "empty_object")]
        argument: Value,
        #[serde(default)]
        function_argument: Option<Value>,
    },
    Get {
        asset_id: String,
    },
    Put {
        asset_id: String,
        data: Value,
    },
    Scan {
        asset_id: String,
        #[serde(default)]
        start: Option<i64>,
        #[serde(default)]
        end: Option<i64>,
        #[serde(default)]
        limit: Option<i64>,
        #[serde(default)]
        ascending: bool,
    },
    ListContracts,
    Database {
        method: DatabaseMethod,
        namespace: String,
        table: String,
        asset_id: String,
        #[serde(default)]
        object: Option<Value>,
    },
}

/// Operation a `database` step performs on the side-database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseMethod {
    Get,
    Put,
    Delete,
}

impl DatabaseMethod {
    fn as_str(self) -> &'static str {
        match self {
            DatabaseMethod::Get => "get",
            DatabaseMethod::Put => "put",
            DatabaseMethod::Delete => "delete",
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Step {
    pub fn command(&self) -> &'static str {
        match self {
            Step::Register { .. } => "register",
            Step::RegisterFunction { .. } => "register-function",
            Step::SetCertificate { .. } => "set-certificate",
            Step::Execute { .. } => "execute",
            Step::Get { .. } => "get",
            Step::Put { .. } => "put",
            Step::Scan { .. } => "scan",
            Step::ListContracts => "list-contracts",
            Step::Database { .. } => "database",
        }
    }

    /// Short human label, e.g. `register caller`
    pub fn label(&self) -> String {
        match self {
            Step::Register { id, .. }
            | Step::RegisterFunction { id, .. }
            | Step::Execute { id, .. } => format!("{} {}", self.command(), id),
            Step::SetCertificate { holder_id, version } => {
                format!("{} {}@{}", self.command(), holder_id, version)
            }
            Step::Get { asset_id } | Step::Put { asset_id, .. } | Step::Scan { asset_id, .. } => {
                format!("{} {}", self.command(), asset_id)
            }
            Step::ListContracts => self.command().to_string(),
            Step::Database {
                method,
                namespace,
                table,
                asset_id,
                ..
            } => format!(
                "{} {} {}/{}/{}",
                self.command(),
                method.as_str(),
                namespace,
                table,
                asset_id
            ),
        }
    }
}

/// Read and parse the script at `path`
pub fn load(path: &Path) -> Result<Vec<Step>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse script {}", path.display()))
}

/// Emulator plus the ledger and database every step shares
pub struct Session {
    emulator: Emulator,
    ledger: AssetLedger,
    database: MemoryDatabase,
    base_dir: PathBuf,
}

impl Session {
    /// Relative file paths in steps resolve against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Session {
            emulator: Emulator::with_builtins(),
            ledger: AssetLedger::new(),
            database: MemoryDatabase::new(),
            base_dir: base_dir.into(),
        }
    }

    pub fn run(&mut self, step: &Step) -> Result<Option<Value>> {
        match step {
            Step::Register {
                id,
                name,
                file,
                properties,
            } => {
                self.emulator
                    .register(id, name, self.base_dir.join(file), properties.clone())?;
                Ok(None)
            }
            Step::RegisterFunction { id, name, file } => {
                self.emulator
                    .register_function(id, name, self.base_dir.join(file))?;
                Ok(None)
            }
            Step::SetCertificate { holder_id, version } => {
                self.emulator.set_identity(holder_id, *version);
                Ok(Some(self.emulator.certificate().to_json()))
            }
            Step::Execute {
                id,
                argument,
                function_argument,
            } => self.execute(id, argument, function_argument.as_ref()),
            Step::Get { asset_id } => self.execute("get", &json!({ "asset_id": asset_id }), None),
            Step::Put { asset_id, data } => self.execute(
                "put",
                &json!({ "asset_id": asset_id, "data": data }),
                None,
            ),
            Step::Scan {
                asset_id,
                start,
                end,
                limit,
                ascending,
            } => {
                let mut argument = json!({ "asset_id": asset_id, "asc_order": ascending });
                for (key, bound) in [("start", start), ("end", end), ("limit", limit)] {
                    if let Some(bound) = bound {
                        argument[key] = json!(bound);
                    }
                }
                self.execute("scan", &argument, None)
            }
            Step::ListContracts => {
                let contracts: Vec<Value> = self
                    .emulator
                    .scan()
                    .iter()
                    .map(|artifact| {
                        json!({
                            "id": artifact.id,
                            "binary_name": artifact.binary_name,
                            "digest": artifact.code_digest(),
                            "properties": artifact.properties,
                        })
                    })
                    .collect();
                Ok(Some(Value::Array(contracts)))
            }
            Step::Database {
                method,
                namespace,
                table,
                asset_id,
                object,
            } => {
                let key = DatabaseKey::new(namespace, table, asset_id);
                match method {
                    DatabaseMethod::Get => Ok(self.database.get(&key)),
                    DatabaseMethod::Put => {
                        let object = object
                            .clone()
                            .ok_or_else(|| anyhow!("database put requires an object"))?;
                        self.database.put(key, object);
                        Ok(None)
                    }
                    DatabaseMethod::Delete => Ok(self.database.delete(&key)),
                }
            }
        }
    }

    fn execute(
        &mut self,
        id: &str,
        argument: &Value,
        function_argument: Option<&Value>,
    ) -> Result<Option<Value>> {
        let result = self
            .emulator
            .execute(id, &mut self.ledger, &mut self.database, argument, function_argument)
            .with_context(|| format!("contract '{}' failed", id))?;
        Ok(result)
    }
}
