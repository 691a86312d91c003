use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use color_eyre::Result;
use strongbox_crypto::{KeyManager, PublicKeyHandle};
use tracing::info;

use crate::{cli::KeysCommand, config, storage};

/// Execute a keys subcommand against the configured keypair.
pub async fn handle(cmd: KeysCommand, config: &config::Config) -> Result<()> {
    match cmd {
        KeysCommand::ImportPublic { path } => {
            let handle = import_public(&path)?;
            println!(
                "Imported {}-bit public key {}",
                handle.key_bytes() * 8,
                handle.fingerprint()?
            );
            println!("The vault keypair was not changed.");
        }
        KeysCommand::Info => {
            let keys = storage::load_keys(config).await?;
            for line in describe(&keys)? {
                println!("{line}");
            }
        }
        KeysCommand::ExportPublic { der } => {
            let keys = storage::load_keys(config).await?;
            println!("{}", export_public(&keys, der)?.trim_end());
        }
        KeysCommand::ExportPrivate { output } => {
            let keys = storage::load_keys(config).await?;
            write_private(&keys, &output)?;
            println!("Private key written to {}", output.display());
        }
    }
    Ok(())
}

fn describe(keys: &KeyManager) -> Result<Vec<String>> {
    Ok(vec![
        format!("bits: {}", keys.key_bytes() * 8),
        format!("max plaintext per block: {} bytes", keys.max_plain_block()),
        format!("fingerprint: {}", keys.fingerprint()?),
    ])
}

fn export_public(keys: &KeyManager, der: bool) -> Result<String> {
    if der {
        Ok(keys.export_public_der_base64()?)
    } else {
        Ok(keys.export_public()?)
    }
}

/// Refuses to overwrite an existing file.
fn write_private(keys: &KeyManager, output: &Path) -> Result<()> {
    let pem = keys.export_private()?;
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(output)?;
    file.write_all(pem.as_bytes())?;
    file.sync_all()?;
    info!(path = %output.display(), "exported private key");
    Ok(())
}

fn import_public(path: &Path) -> Result<PublicKeyHandle> {
    let encoded = fs::read_to_string(path)?;
    Ok(KeyManager::import_public(&encoded)?)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, OnceLock};

    use super::*;

    fn keys() -> Arc<KeyManager> {
        static KEYS: OnceLock<Arc<KeyManager>> = OnceLock::new();
        KEYS.get_or_init(|| Arc::new(KeyManager::generate().expect("keys")))
            .clone()
    }

    #[test]
    fn describe_reports_block_geometry() {
        let lines = describe(&keys()).expect("describe");
        assert_eq!(lines[0], "bits: 2048");
        assert_eq!(lines[1], "max plaintext per block: 245 bytes");
        assert!(lines[2].starts_with("fingerprint: "));
    }

    #[test]
    fn exported_public_key_imports_in_both_forms() {
        let keys = keys();
        let dir = tempfile::tempdir().expect("tempdir");
        for der in [false, true] {
            let path = dir.path().join(format!("pub-{der}.txt"));
            fs::write(&path, export_public(&keys, der).expect("export")).expect("write");
            let handle = import_public(&path).expect("import");
            assert_eq!(
                handle.fingerprint().expect("fp"),
                keys.fingerprint().expect("fp")
            );
        }
    }

    #[test]
    fn private_export_round_trips_and_never_overwrites() {
        let keys = keys();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vault.pem");

        write_private(&keys, &path).expect("first export");
        let restored =
            KeyManager::from_private_pem(&fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(
            restored.fingerprint().expect("fp"),
            keys.fingerprint().expect("fp")
        );

        assert!(write_private(&keys, &path).is_err());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).expect("meta").permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn import_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("junk.pem");
        fs::write(&path, "not a key").expect("write");
        assert!(import_public(&path).is_err());
    }
}
