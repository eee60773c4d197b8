use clap::{ArgGroup, Parser};
use jwt_keygen::config::{ConfigResolver, DEFAULT_CONFIG_FILE};
use jwt_keygen::error::exit_code;
use jwt_keygen::prelude::*;
use log::{error, warn};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when keys were generated but some files could not be written
const PARTIAL_WRITE_EXIT: u8 = 5;

/// Generate JWT signing keys: HMAC secrets, RSA and EC key pairs, and an example token.
#[derive(Debug, Parser)]
#[command(name = "jwt-keygen", version)]
#[command(group(ArgGroup::new("family").args(["hmac_only", "rsa_only", "ec_only"])))]
struct KeygenCli {
    /// file name prefix for generated files
    #[arg(short = 'o', long = "output", value_name = "PREFIX")]
    prefix: Option<String>,
    /// only generate HMAC secrets
    #[arg(long)]
    hmac_only: bool,
    /// only generate an RSA key pair
    #[arg(long)]
    rsa_only: bool,
    /// only generate an EC P-256 key pair
    #[arg(long)]
    ec_only: bool,
    /// skip the example token
    #[arg(long)]
    no_examples: bool,
    /// path to the JSON configuration document
    #[arg(short = 'c', long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// directory for generated files
    #[arg(short = 'd', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// write the effective configuration back to the config path before generating
    #[arg(long)]
    save_config: bool,
}

impl KeygenCli {
    fn selection(&self) -> FamilySelection {
        if self.hmac_only {
            FamilySelection::Only(KeyFamily::Hmac)
        } else if self.rsa_only {
            FamilySelection::Only(KeyFamily::Rsa)
        } else if self.ec_only {
            FamilySelection::Only(KeyFamily::Ec)
        } else {
            FamilySelection::All
        }
    }

    /// The resolved configuration with command line overrides applied.
    fn configuration(&self) -> anyhow::Result<Configuration> {
        let resolver = ConfigResolver::new(Some(self.config.clone()));
        let mut builder = resolver.configuration().builder();
        if let Some(prefix) = &self.prefix {
            builder.prefix(prefix.as_str())?;
        }
        if let Some(output_dir) = &self.output_dir {
            builder.output_dir(output_dir)?;
        }
        if self.no_examples {
            builder.generate_examples(false);
        }
        Ok(builder.build())
    }

    fn execute(&self) -> anyhow::Result<RunOutcome> {
        self.execute_with(Capabilities::detect())
    }

    fn execute_with(&self, capabilities: Capabilities) -> anyhow::Result<RunOutcome> {
        let engine = Engine::with_capabilities(self.configuration()?, capabilities);
        engine.check(self.selection())?;
        if self.save_config {
            engine.config().save(&self.config)?;
        }
        engine.run(self.selection())
    }
}

fn main() -> ExitCode {
    let cli = KeygenCli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let outcome = match cli.execute() {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(u8::try_from(exit_code(&e)).unwrap_or(1));
        }
    };

    let report = outcome.report();
    for written in &report.written {
        println!("{}", written.path.display());
    }
    for family in &report.skipped {
        warn!("{} keys were not generated: unsupported by this build", family);
    }
    if report.example_verified == Some(false) {
        warn!("The example token did not verify; see the example file for details");
    }
    match outcome {
        RunOutcome::Success(_) => ExitCode::SUCCESS,
        RunOutcome::PartialFailure(report) => {
            for failure in &report.failures {
                error!("Not written: {}", failure);
            }
            ExitCode::from(PARTIAL_WRITE_EXIT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ASYMMETRIC: Capabilities = Capabilities { asymmetric: false };

    fn cli(dir: &tempfile::TempDir, args: &[&str]) -> KeygenCli {
        let config = dir.path().join("config.json");
        let output = dir.path().join("keys");
        let mut argv = vec![
            "jwt-keygen",
            "-c",
            config.to_str().unwrap(),
            "-d",
            output.to_str().unwrap(),
        ];
        argv.extend_from_slice(args);
        KeygenCli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn family_flags_are_exclusive() {
        assert!(KeygenCli::try_parse_from(["jwt-keygen", "--hmac-only", "--ec-only"]).is_err());
        let cli = KeygenCli::try_parse_from(["jwt-keygen", "--rsa-only"]).unwrap();
        assert_eq!(cli.selection(), FamilySelection::Only(KeyFamily::Rsa));
    }

    #[test]
    fn unavailable_family_leaves_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(&dir, &["--rsa-only", "--save-config"]);
        let err = cli.execute_with(NO_ASYMMETRIC).unwrap_err();
        assert_eq!(exit_code(&err), 3);
        assert!(!cli.config.exists());
        assert!(!dir.path().join("keys").exists());
    }

    #[test]
    fn config_is_saved_before_generating() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(&dir, &["--hmac-only", "--save-config", "-o", "svc"]);
        let outcome = cli.execute_with(NO_ASYMMETRIC).unwrap();
        assert!(outcome.is_success());
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&cli.config).unwrap()).unwrap();
        assert_eq!(saved["output_prefix"], "svc");
    }
}
