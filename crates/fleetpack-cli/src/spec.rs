//! `spec` subcommands

use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use fleetpack_api::{Spec, parse_labels};
use fleetpack_client::HttpClient;

use crate::{SpecCommand, print_yaml};

pub(crate) async fn run(client: &HttpClient, cmd: SpecCommand) -> Result<()> {
    match cmd {
        SpecCommand::List => print_yaml(&client.list_specs().await?),
        SpecCommand::Get { id } => print_yaml(&client.get_spec(&id).await?),
        SpecCommand::Create { file } => {
            let spec = read_spec(&file)?;
            print_yaml(&client.create_spec(&spec).await?)
        }
        SpecCommand::Update { id, file } => {
            let spec = read_spec(&file)?;
            print_yaml(&client.update_spec(&id, &spec).await?)
        }
        SpecCommand::Delete { id } => {
            client.delete_spec(&id).await?;
            println!("deleted {id}");
            Ok(())
        }
        SpecCommand::Compute { labels } => {
            print_yaml(&client.compute_spec(&parse_labels(&labels)?).await?)
        }
    }
}

/// Read a spec written as YAML (JSON parses too)
fn read_spec(path: &Path) -> Result<Spec> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).wrap_err_with(|| format!("invalid spec in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_yaml_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.yaml");
        std::fs::write(
            &path,
            "id: edge\ntarget:\n  site: lab\napps:\n  - name: web\n    labels:\n      tier: stable\n  - name: db\n",
        )
        .unwrap();

        let spec = read_spec(&path).unwrap();
        assert_eq!(spec.id, "edge");
        assert_eq!(spec.target["site"], "lab");
        assert_eq!(spec.apps.len(), 2);
        assert_eq!(spec.apps[0].labels["tier"], "stable");
        assert!(spec.apps[1].labels.is_empty());
    }

    #[test]
    fn test_read_json_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.json");
        std::fs::write(&path, r#"{"id":"edge","apps":[{"name":"web"}]}"#).unwrap();

        let spec = read_spec(&path).unwrap();
        assert_eq!(spec.apps[0].name, "web");
        assert!(spec.target.is_empty());
    }

    #[test]
    fn test_read_invalid_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "apps: 7\n").unwrap();
        assert!(read_spec(&path).is_err());
    }
}
