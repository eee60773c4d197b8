//! One generation run: produce key material, optionally an example token, and
//! write everything out under a single timestamp.

use log::{info, warn};

use crate::algorithms::{generate_ec, generate_rsa, generate_secret, HmacAlgorithm};
use crate::common::*;
use crate::config::Configuration;
use crate::error::*;
use crate::example::{ExampleToken, ExampleTokenBuilder};
use crate::material::*;
use crate::output::*;

/// What a run produced.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub timestamp: Timestamp,
    /// Families whose material was generated
    pub families: Vec<KeyFamily>,
    /// Families left out because this build cannot generate them
    pub skipped: Vec<KeyFamily>,
    pub written: Vec<WrittenArtifact>,
    pub failures: Vec<WriteFailure>,
    /// Outcome of the example round trip, if an example was built
    pub example_verified: Option<bool>,
}

/// Result of a run that did not hit a fatal condition.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Every artifact was written
    Success(GenerationReport),
    /// Generation succeeded but at least one artifact could not be written
    PartialFailure(GenerationReport),
}

impl RunOutcome {
    pub fn report(&self) -> &GenerationReport {
        match self {
            RunOutcome::Success(report) | RunOutcome::PartialFailure(report) => report,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: Configuration,
    capabilities: Capabilities,
    examples: ExampleTokenBuilder,
}

impl Engine {
    pub fn new(config: Configuration) -> Self {
        Engine::with_capabilities(config, Capabilities::detect())
    }

    /// Restrict the capabilities the engine uses. Support this build lacks cannot be added.
    pub fn with_capabilities(config: Configuration, capabilities: Capabilities) -> Self {
        Engine {
            config,
            capabilities: capabilities.intersection(Capabilities::detect()),
            examples: ExampleTokenBuilder::new(),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Families to generate for `selection`, and those to skip.
    ///
    /// An explicitly selected family that cannot be generated is an error.
    fn plan(&self, selection: FamilySelection) -> Result<(Vec<KeyFamily>, Vec<KeyFamily>), Error> {
        let mut planned = vec![];
        let mut skipped = vec![];
        for family in selection.families() {
            if self.capabilities.supports(family) {
                planned.push(family);
            } else if selection.is_explicit() {
                bail!(KeygenError::CapabilityUnavailable(family));
            } else {
                skipped.push(family);
            }
        }
        Ok((planned, skipped))
    }

    /// Fail if `selection` cannot be satisfied, without generating anything.
    pub fn check(&self, selection: FamilySelection) -> Result<(), Error> {
        self.plan(selection).map(|_| ())
    }

    /// Generate key material for `selection` without writing anything.
    pub fn generate(&self, selection: FamilySelection) -> Result<GeneratedKeys, Error> {
        let (planned, skipped) = self.plan(selection)?;
        for family in &skipped {
            warn!(
                "Skipping {} keys: {}",
                family,
                KeygenError::CapabilityUnavailable(*family)
            );
        }
        let mut keys = GeneratedKeys {
            materials: vec![],
            skipped,
        };
        for family in planned {
            match family {
                KeyFamily::Hmac => {
                    info!("Generating HMAC secrets");
                    for algorithm in HmacAlgorithm::ALL {
                        let secret = generate_secret(algorithm.bits())?;
                        keys.materials
                            .push(KeyMaterial::Hmac(HmacSecret { algorithm, secret }));
                    }
                }
                KeyFamily::Rsa => {
                    info!("Generating RSA-{} key pair", self.config.rsa_key_size());
                    let pair = generate_rsa(self.config.rsa_key_size())?;
                    keys.materials.push(KeyMaterial::Rsa(pair));
                }
                KeyFamily::Ec => {
                    info!("Generating EC P-256 key pair");
                    keys.materials.push(KeyMaterial::Ec(generate_ec()?));
                }
            }
        }
        Ok(keys)
    }

    /// Example token for the generated HMAC secrets, if examples are enabled.
    pub fn example(&self, keys: &GeneratedKeys) -> Result<Option<ExampleToken>, Error> {
        if !self.config.generate_examples() {
            return Ok(None);
        }
        let Some(secret) = keys.hmac_secret(self.config.example_algorithm()) else {
            return Ok(None);
        };
        info!("Creating example {} token", secret.algorithm);
        let example = self
            .examples
            .build(secret, self.config.token_expiry_hours())?;
        Ok(Some(example))
    }

    /// Serialize generated material into the files of one run.
    pub fn artifacts(
        &self,
        keys: &GeneratedKeys,
        example: Option<&ExampleToken>,
    ) -> Result<Vec<OutputArtifact>, Error> {
        let mut artifacts = vec![];
        let secrets = keys.hmac_secret_map();
        if !secrets.is_empty() {
            artifacts.push(OutputArtifact::json(ArtifactKind::Hmac, &secrets)?);
        }
        if let Some(pair) = keys.rsa() {
            artifacts.push(OutputArtifact::new(ArtifactKind::RsaPrivate, &pair.private_key));
            artifacts.push(OutputArtifact::new(ArtifactKind::RsaPublic, &pair.public_key));
        }
        if let Some(pair) = keys.ec() {
            artifacts.push(OutputArtifact::new(ArtifactKind::EcPrivate, &pair.private_key));
            artifacts.push(OutputArtifact::new(ArtifactKind::EcPublic, &pair.public_key));
        }
        if let Some(example) = example {
            artifacts.push(OutputArtifact::json(ArtifactKind::Example, example)?);
        }
        Ok(artifacts)
    }

    pub fn run(&self, selection: FamilySelection) -> Result<RunOutcome, Error> {
        self.run_at(selection, &Timestamp::now())
    }

    /// Run with an explicit timestamp for the file names.
    pub fn run_at(
        &self,
        selection: FamilySelection,
        timestamp: &Timestamp,
    ) -> Result<RunOutcome, Error> {
        let keys = self.generate(selection)?;
        let example = self.example(&keys)?;
        let artifacts = self.artifacts(&keys, example.as_ref())?;

        let writer = OutputWriter::new(self.config.output_dir(), self.config.prefix());
        let written = writer.write(&artifacts, timestamp);
        let report = GenerationReport {
            timestamp: timestamp.clone(),
            families: keys.families(),
            skipped: keys.skipped,
            written: written.written,
            failures: written.failures,
            example_verified: example.map(|e| e.verification_result),
        };
        if report.failures.is_empty() {
            info!(
                "Generated {} file(s) in {}",
                report.written.len(),
                writer.dir().display()
            );
            Ok(RunOutcome::Success(report))
        } else {
            warn!(
                "{} of {} file(s) could not be written",
                report.failures.len(),
                artifacts.len()
            );
            Ok(RunOutcome::PartialFailure(report))
        }
    }
}
