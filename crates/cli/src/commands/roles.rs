use crate::host::Host;
use clap::Subcommand;
use serde_json::{json, Map, Value};
use tokenlease_backend::{Operation, Request, Response};
use tokenlease_core::{Error, Result};

#[derive(Subcommand)]
pub enum RoleCommands {
    /// List configured role names
    List,
    /// Show a role's policy document
    Read { name: String },
    /// Create a role or update its policy document
    Write {
        name: String,
        /// Policy document as JSON, or `@path` to read it from a file
        #[arg(long, value_name = "JSON|@FILE")]
        policy_document: Option<String>,
    },
    /// Delete a role; tokens already issued under it stay valid
    Delete { name: String },
}

impl RoleCommands {
    pub async fn execute(self, host: &Host) -> Result<Response> {
        let request = match self {
            RoleCommands::List => Request::new(Operation::List, "roles/"),
            RoleCommands::Read { name } => Request::new(Operation::Read, format!("roles/{name}")),
            RoleCommands::Write {
                name,
                policy_document,
            } => {
                let mut data = Map::new();
                if let Some(document) = policy_document {
                    data.insert(
                        "policy_document".to_string(),
                        json!(load_document(&document)?),
                    );
                }
                Request::new(Operation::Update, format!("roles/{name}"))
                    .with_data(Value::Object(data))
            }
            RoleCommands::Delete { name } => {
                Request::new(Operation::Delete, format!("roles/{name}"))
            }
        };
        host.request(request).await
    }
}

/// Inline JSON, or the contents of the file named after `@`
fn load_document(argument: &str) -> Result<String> {
    match argument.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("failed to read policy document '{path}': {e}"))
        }),
        None => Ok(argument.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_document_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"effect":"allow"}}]"#).unwrap();

        let argument = format!("@{}", file.path().display());
        assert_eq!(load_document(&argument).unwrap(), r#"[{"effect":"allow"}]"#);
        assert_eq!(load_document("[]").unwrap(), "[]");
        assert!(load_document("@/does/not/exist").is_err());
    }
}
