use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "strongbox",
    about = "Per-user encrypted file vault",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand; prints help when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Account credentials. Prefer the environment over `--password` so the
/// secret stays out of shell history.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Login {
    /// Account name.
    #[arg(short, long, env = "STRONGBOX_USER")]
    pub user: String,
    /// Account password.
    #[arg(long, env = "STRONGBOX_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Round-trip a probe file through the configured vault.
    Health,
    /// Create a local account.
    Register {
        #[command(flatten)]
        login: Login,
    },
    /// Encrypt a file into the vault.
    Put {
        #[command(flatten)]
        login: Login,
        /// File to encrypt.
        path: PathBuf,
        /// Name to show in listings (defaults to the file name).
        #[arg(long)]
        name: Option<String>,
    },
    /// List your files, newest first.
    List {
        #[command(flatten)]
        login: Login,
    },
    /// Decrypt one of your files to a path.
    Get {
        #[command(flatten)]
        login: Login,
        /// Storage key shown by `list`.
        storage_key: String,
        /// Where to write the plaintext.
        output: PathBuf,
    },
    /// Delete one of your files.
    Rm {
        #[command(flatten)]
        login: Login,
        /// Storage key shown by `list`.
        storage_key: String,
    },
    /// Inspect and export the vault keypair.
    #[command(subcommand)]
    Keys(KeysCommand),
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Browse your files interactively (press q or Esc to exit).
    Tui {
        #[command(flatten)]
        login: Login,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum KeysCommand {
    /// Show key size and fingerprint.
    Info,
    /// Print the public key.
    ExportPublic {
        /// Emit bare base64 DER instead of PEM.
        #[arg(long)]
        der: bool,
    },
    /// Write the private key to a new file (owner-only permissions).
    ExportPrivate {
        /// Destination; must not exist yet.
        output: PathBuf,
    },
    /// Validate a foreign public key. The vault keypair is not changed.
    ImportPublic {
        /// PEM or base64 DER file.
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login() -> Login {
        Login {
            user: "alice".into(),
            password: "pw".into(),
        }
    }

    #[test]
    fn missing_subcommand_is_none() {
        let cli = Cli::try_parse_from(["strongbox"]).expect("parse should succeed");
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_health_subcommand() {
        let cli = Cli::try_parse_from(["strongbox", "health"]).expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Health));
    }

    #[test]
    fn parses_put_with_login() {
        let cli = Cli::try_parse_from([
            "strongbox",
            "put",
            "--user",
            "alice",
            "--password",
            "pw",
            "report.pdf",
            "--name",
            "Q3 report",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Some(Command::Put {
                login: login(),
                path: PathBuf::from("report.pdf"),
                name: Some("Q3 report".into()),
            })
        );
    }

    #[test]
    fn parses_get_positionals() {
        let cli = Cli::try_parse_from([
            "strongbox", "get", "-u", "alice", "--password", "pw", "abc.encrypted", "out.bin",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Some(Command::Get {
                login: login(),
                storage_key: "abc.encrypted".into(),
                output: PathBuf::from("out.bin"),
            })
        );
    }

    #[test]
    fn parses_keys_export_public_der() {
        let cli = Cli::try_parse_from(["strongbox", "keys", "export-public", "--der"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Some(Command::Keys(KeysCommand::ExportPublic { der: true }))
        );
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli =
            Cli::try_parse_from(["strongbox", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Config(ConfigCommand::Init)));
    }
}
