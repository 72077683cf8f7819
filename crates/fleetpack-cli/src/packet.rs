//! `packet` subcommands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use color_eyre::Result;
use color_eyre::eyre::{WrapErr, bail};
use fleetpack_api::{ControlInfo, parse_labels};
use fleetpack_client::HttpClient;
use fleetpack_exec::LocalExecutor;
use fleetpack_packet::{SealedPacket, build_from_directory, hash_bytes, init_directory};
use fleetpack_pkg::{FsInstaller, InstallReport, Installer};
use tracing::info;

use crate::{PacketCommand, print_yaml};

pub(crate) async fn run(client: &HttpClient, cmd: PacketCommand) -> Result<()> {
    match cmd {
        PacketCommand::List => print_yaml(&client.list_packets().await?),
        PacketCommand::Upload { file } => {
            let bytes = std::fs::read(&file)
                .wrap_err_with(|| format!("failed to read {}", file.display()))?;
            print_yaml(&client.upload_packet(bytes).await?)
        }
        PacketCommand::Build { dir, file } => {
            let sealed = SealedPacket::seal(build_from_directory(&dir)?)?;
            let file = file.unwrap_or_else(|| default_file_name(&sealed.control_info()));
            std::fs::write(&file, sealed.bytes())
                .wrap_err_with(|| format!("failed to write {}", file.display()))?;
            println!("{} {}", sealed.hash(), file.display());
            Ok(())
        }
        PacketCommand::Init { dir, name, labels } => {
            init_directory(&dir, &name, &parse_labels(&labels)?)?;
            println!("initialized packet {name} in {}", dir.display());
            Ok(())
        }
        PacketCommand::Info { hash } => print_yaml(&client.packet_info(&hash).await?),
        PacketCommand::Download { hash, file } => {
            let sealed = fetch(client, &hash).await?;
            let file = file.unwrap_or_else(|| default_file_name(&sealed.control_info()));
            std::fs::write(&file, sealed.bytes())
                .wrap_err_with(|| format!("failed to write {}", file.display()))?;
            println!("{}", file.display());
            Ok(())
        }
        PacketCommand::Delete { hash } => {
            client.delete_packet(&hash).await?;
            println!("deleted {hash}");
            Ok(())
        }
        PacketCommand::Install { packet, root } => {
            let sealed = resolve(client, &packet).await?;
            let report = installer().install(sealed.packet(), &root).await?;
            summarize("installed", &sealed, &report);
            Ok(())
        }
        PacketCommand::Uninstall { packet, root } => {
            let sealed = resolve(client, &packet).await?;
            let report = installer().uninstall(sealed.packet(), &root).await?;
            summarize("uninstalled", &sealed, &report);
            Ok(())
        }
        PacketCommand::Compute { labels } => {
            let state = client.compute_desired_state(&parse_labels(&labels)?).await?;
            print_yaml(&state)
        }
        PacketCommand::Hash { file } => {
            let bytes = std::fs::read(&file)
                .wrap_err_with(|| format!("failed to read {}", file.display()))?;
            println!("{}", SealedPacket::from_bytes(&bytes)?.hash());
            Ok(())
        }
    }
}

fn installer() -> FsInstaller {
    FsInstaller::new(Arc::new(LocalExecutor::new().inherit_stdio()))
}

fn summarize(verb: &str, sealed: &SealedPacket, report: &InstallReport) {
    println!(
        "{verb} {} ({}): {} files, {} directories, {} symlinks",
        sealed.packet().name,
        sealed.hash(),
        report.files,
        report.directories,
        report.symlinks
    );
}

/// `<name>[_<version>].jpk`
fn default_file_name(info: &ControlInfo) -> PathBuf {
    let mut name = info.name.clone();
    if let Some(version) = info.labels.get("version") {
        name.push('_');
        name.push_str(version);
    }
    PathBuf::from(format!("{name}.jpk"))
}

/// Download a packet and check it hashes to what was asked for
async fn fetch(client: &HttpClient, hash: &str) -> Result<SealedPacket> {
    let bytes = client.packet_data(hash).await?;
    let actual = hash_bytes(&bytes);
    if actual != hash {
        bail!("integrity error: asked for {hash}, server sent {actual}");
    }
    info!(hash, size = bytes.len(), "downloaded packet");
    Ok(SealedPacket::from_bytes(&bytes)?)
}

/// A local `.jpk` file if one exists at `reference`, otherwise a hash on the server
async fn resolve(client: &HttpClient, reference: &str) -> Result<SealedPacket> {
    let path = Path::new(reference);
    if path.is_file() {
        let bytes = std::fs::read(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        return Ok(SealedPacket::from_bytes(&bytes)?);
    }
    fetch(client, reference).await
}

#[cfg(test)]
mod tests {
    use fleetpack_api::Labels;
    use fleetpack_packet::Packet;

    use super::*;

    #[test]
    fn test_default_file_name() {
        let plain = ControlInfo::new("web", Labels::new());
        assert_eq!(default_file_name(&plain), PathBuf::from("web.jpk"));

        let versioned = ControlInfo::new(
            "web",
            [("version".to_string(), "1.2".to_string())].into(),
        );
        assert_eq!(default_file_name(&versioned), PathBuf::from("web_1.2.jpk"));
    }

    #[tokio::test]
    async fn test_resolve_prefers_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let sealed = SealedPacket::seal(Packet::new("local", Labels::new())).unwrap();
        let path = dir.path().join("local.jpk");
        std::fs::write(&path, sealed.bytes()).unwrap();

        // unroutable server; only the file may be used
        let client = HttpClient::new("http://127.0.0.1:9").unwrap();
        let resolved = resolve(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(resolved.hash(), sealed.hash());
    }
}
