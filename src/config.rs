//! Generator configuration: built-in defaults, optionally overridden by a
//! persisted JSON document.
//!
//! A document only overrides the keys it names. Unknown keys are ignored, a
//! recognized key with an unusable value keeps its default, and a document that
//! cannot be read or is not a JSON object is replaced by the defaults. Loading a
//! configuration never fails.

use log::{debug, info, warn};
use once_cell::unsync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::algorithms::HmacAlgorithm;
use crate::error::*;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_OUTPUT_DIR: &str = "generated_keys";
pub const DEFAULT_PREFIX: &str = "jwt_keys";
pub const DEFAULT_RSA_KEY_SIZE: usize = 2048;
pub const DEFAULT_TOKEN_EXPIRY_HOURS: u64 = 24;
pub const DEFAULT_HMAC_BITS: usize = 256;

/// One year.
pub const MAX_TOKEN_EXPIRY_HOURS: u64 = 8760;

/// RSA modulus sizes, in bits, accepted by the generator.
pub const RSA_KEY_SIZES: [usize; 3] = [2048, 3072, 4096];

/// Resolved settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    output_dir: PathBuf,
    prefix: String,
    rsa_key_size: usize,
    token_expiry_hours: u64,
    generate_examples: bool,
    hmac_bits: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            prefix: DEFAULT_PREFIX.to_string(),
            rsa_key_size: DEFAULT_RSA_KEY_SIZE,
            token_expiry_hours: DEFAULT_TOKEN_EXPIRY_HOURS,
            generate_examples: true,
            hmac_bits: DEFAULT_HMAC_BITS,
        }
    }
}

impl Configuration {
    pub fn builder(&self) -> ConfigBuilder {
        ConfigBuilder {
            config: self.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn rsa_key_size(&self) -> usize {
        self.rsa_key_size
    }

    pub fn token_expiry_hours(&self) -> u64 {
        self.token_expiry_hours
    }

    pub fn generate_examples(&self) -> bool {
        self.generate_examples
    }

    pub fn hmac_bits(&self) -> usize {
        self.hmac_bits
    }

    /// The algorithm whose secret signs the example token
    pub fn example_algorithm(&self) -> HmacAlgorithm {
        HmacAlgorithm::from_bits(self.hmac_bits).unwrap_or(HmacAlgorithm::HS256)
    }

    /// Persist this configuration as a JSON document that [`resolve`] reads back.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let document = json!({
            "output_dir": self.output_dir,
            "output_prefix": self.prefix,
            "key_size": self.rsa_key_size,
            "token_expiry_hours": self.token_expiry_hours,
            "generate_examples": self.generate_examples,
            "hmac_bits": self.hmac_bits,
        });
        let mut json = serde_json::to_string_pretty(&document)?;
        json.push('\n');
        fs::write(path, json)?;
        info!("Generator config saved to {}", path.display());
        Ok(())
    }
}

/// Produces validated copies of a [`Configuration`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Configuration,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Configuration::default().builder()
    }
}

impl ConfigBuilder {
    pub fn output_dir(&mut self, output_dir: impl Into<PathBuf>) -> Result<&mut Self, Error> {
        let output_dir = output_dir.into();
        ensure!(
            !output_dir.as_os_str().is_empty(),
            KeygenError::InvalidSetting("output_dir", "must not be empty".to_string())
        );
        self.config.output_dir = output_dir;
        Ok(self)
    }

    pub fn prefix(&mut self, prefix: impl Into<String>) -> Result<&mut Self, Error> {
        let prefix = prefix.into();
        ensure!(
            !prefix.is_empty(),
            KeygenError::InvalidSetting("output_prefix", "must not be empty".to_string())
        );
        ensure!(
            !prefix.contains(['/', '\\']),
            KeygenError::InvalidSetting(
                "output_prefix",
                format!("{prefix:?} must not contain a path separator")
            )
        );
        self.config.prefix = prefix;
        Ok(self)
    }

    pub fn rsa_key_size(&mut self, bits: usize) -> Result<&mut Self, Error> {
        ensure!(
            RSA_KEY_SIZES.contains(&bits),
            KeygenError::UnsupportedRSAModulus(bits)
        );
        self.config.rsa_key_size = bits;
        Ok(self)
    }

    pub fn token_expiry_hours(&mut self, hours: u64) -> Result<&mut Self, Error> {
        ensure!(
            (1..=MAX_TOKEN_EXPIRY_HOURS).contains(&hours),
            KeygenError::InvalidTokenExpiry(hours)
        );
        self.config.token_expiry_hours = hours;
        Ok(self)
    }

    pub fn generate_examples(&mut self, enabled: bool) -> &mut Self {
        self.config.generate_examples = enabled;
        self
    }

    pub fn hmac_bits(&mut self, bits: usize) -> Result<&mut Self, Error> {
        HmacAlgorithm::from_bits(bits)?;
        self.config.hmac_bits = bits;
        Ok(self)
    }

    pub fn build(&self) -> Configuration {
        self.config.clone()
    }
}

/// A persisted document. Each recognized key is checked on its own.
#[derive(Debug)]
struct ConfigDocument(Map<String, Value>);

impl ConfigDocument {
    fn load(path: &Path) -> Result<Option<Self>, Error> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(Some(ConfigDocument(map))),
            _ => bail!(KeygenError::InvalidSetting(
                "configuration",
                "the document must be a JSON object".to_string()
            )),
        }
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, Error>> {
        self.0
            .get(key)
            .map(|value| Ok(serde_json::from_value(value.clone())?))
    }

    fn apply(self, defaults: Configuration) -> Configuration {
        fn keep_default<T>(key: &str, res: Result<T, Error>) {
            if let Err(e) = res {
                warn!("Ignoring {} from config: {}", key, e);
            }
        }

        let mut builder = defaults.builder();
        if let Some(res) = self.get::<PathBuf>("output_dir") {
            keep_default(
                "output_dir",
                res.and_then(|dir| builder.output_dir(dir).map(|_| ())),
            );
        }
        if let Some(res) = self.get::<String>("output_prefix") {
            keep_default(
                "output_prefix",
                res.and_then(|prefix| builder.prefix(prefix).map(|_| ())),
            );
        }
        if let Some(res) = self.get::<usize>("key_size") {
            keep_default(
                "key_size",
                res.and_then(|bits| builder.rsa_key_size(bits).map(|_| ())),
            );
        }
        if let Some(res) = self.get::<u64>("token_expiry_hours") {
            keep_default(
                "token_expiry_hours",
                res.and_then(|hours| builder.token_expiry_hours(hours).map(|_| ())),
            );
        }
        if let Some(res) = self.get::<bool>("generate_examples") {
            keep_default(
                "generate_examples",
                res.map(|enabled| {
                    builder.generate_examples(enabled);
                }),
            );
        }
        if let Some(res) = self.get::<usize>("hmac_bits") {
            keep_default(
                "hmac_bits",
                res.and_then(|bits| builder.hmac_bits(bits).map(|_| ())),
            );
        }
        builder.build()
    }
}

/// Merge `defaults` with the document at `path`, if any.
pub fn resolve(defaults: Configuration, path: Option<&Path>) -> Configuration {
    let Some(path) = path else {
        return defaults;
    };
    match ConfigDocument::load(path) {
        Ok(Some(document)) => {
            info!("Configuration loaded: {}", path.display());
            document.apply(defaults)
        }
        Ok(None) => {
            debug!("No configuration at {}, using defaults", path.display());
            defaults
        }
        Err(e) => {
            warn!(
                "Error loading config {}: {}; using defaults",
                path.display(),
                e
            );
            defaults
        }
    }
}

/// Resolves the configuration once and hands out the cached value afterwards.
#[derive(Debug)]
pub struct ConfigResolver {
    defaults: Configuration,
    path: Option<PathBuf>,
    resolved: OnceCell<Configuration>,
}

impl ConfigResolver {
    pub fn new(path: Option<PathBuf>) -> Self {
        ConfigResolver::with_defaults(Configuration::default(), path)
    }

    pub fn with_defaults(defaults: Configuration, path: Option<PathBuf>) -> Self {
        ConfigResolver {
            defaults,
            path,
            resolved: OnceCell::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn configuration(&self) -> &Configuration {
        self.resolved
            .get_or_init(|| resolve(self.defaults.clone(), self.path.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert_eq!(config.output_dir(), Path::new("generated_keys"));
        assert_eq!(config.prefix(), "jwt_keys");
        assert_eq!(config.rsa_key_size(), 2048);
        assert_eq!(config.token_expiry_hours(), 24);
        assert!(config.generate_examples());
        assert_eq!(config.example_algorithm(), HmacAlgorithm::HS256);
    }

    #[test]
    fn no_path_or_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve(Configuration::default(), None),
            Configuration::default()
        );
        let missing = dir.path().join("absent.json");
        assert_eq!(
            resolve(Configuration::default(), Some(&missing)),
            Configuration::default()
        );
    }

    #[test]
    fn partial_document_only_overrides_named_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"key_size": 4096}"#);
        let config = resolve(Configuration::default(), Some(&path));
        assert_eq!(config.rsa_key_size(), 4096);
        assert_eq!(
            config,
            Configuration::default()
                .builder()
                .rsa_key_size(4096)
                .unwrap()
                .build()
        );
    }

    #[test]
    fn resolving_twice_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"output_dir": "keys", "output_prefix": "svc", "generate_examples": false}"#,
        );
        let first = resolve(Configuration::default(), Some(&path));
        let second = resolve(Configuration::default(), Some(&path));
        assert_eq!(first, second);
        assert_eq!(first.output_dir(), Path::new("keys"));
        assert_eq!(first.prefix(), "svc");
        assert!(!first.generate_examples());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"token_expiry_hours": 48, "colour": "blue"}"#);
        let config = resolve(Configuration::default(), Some(&path));
        assert_eq!(config.token_expiry_hours(), 48);
    }

    #[test]
    fn malformed_document_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        for contents in ["{not json", "true", "[1, 2, 3]", r#""keys""#] {
            let path = write_config(&dir, contents);
            assert_eq!(
                resolve(Configuration::default(), Some(&path)),
                Configuration::default()
            );
        }
    }

    #[test]
    fn wrong_typed_key_keeps_valid_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"output_dir": "custom_keys", "output_prefix": "svc", "key_size": "4096", "generate_examples": null}"#,
        );
        let config = resolve(Configuration::default(), Some(&path));
        assert_eq!(config.output_dir(), Path::new("custom_keys"));
        assert_eq!(config.prefix(), "svc");
        assert_eq!(config.rsa_key_size(), DEFAULT_RSA_KEY_SIZE);
        assert!(config.generate_examples());
    }

    #[test]
    fn unreadable_document_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        // A directory exists but cannot be read as a file
        assert_eq!(
            resolve(Configuration::default(), Some(dir.path())),
            Configuration::default()
        );
    }

    #[test]
    fn out_of_range_values_keep_their_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"key_size": 1000, "token_expiry_hours": 0, "hmac_bits": 384, "output_prefix": ""}"#,
        );
        let config = resolve(Configuration::default(), Some(&path));
        assert_eq!(config.rsa_key_size(), DEFAULT_RSA_KEY_SIZE);
        assert_eq!(config.token_expiry_hours(), DEFAULT_TOKEN_EXPIRY_HOURS);
        assert_eq!(config.prefix(), DEFAULT_PREFIX);
        assert_eq!(config.example_algorithm(), HmacAlgorithm::HS384);
    }

    #[test]
    fn saved_configuration_resolves_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = ConfigBuilder::default()
            .prefix("api")
            .unwrap()
            .rsa_key_size(3072)
            .unwrap()
            .token_expiry_hours(8760)
            .unwrap()
            .generate_examples(false)
            .build();
        config.save(&path).unwrap();
        assert_eq!(resolve(Configuration::default(), Some(&path)), config);

        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document["key_size"], 3072);
        assert_eq!(document["output_prefix"], "api");
    }

    #[test]
    fn builder_rejects_invalid_values() {
        let mut builder = ConfigBuilder::default();
        assert!(builder.token_expiry_hours(0).is_err());
        assert!(builder.token_expiry_hours(MAX_TOKEN_EXPIRY_HOURS + 1).is_err());
        assert!(builder.rsa_key_size(1024).is_err());
        assert!(builder.hmac_bits(128).is_err());
        assert!(builder.prefix("a/b").is_err());
        assert!(builder.output_dir("").is_err());
        assert_eq!(builder.build(), Configuration::default());
    }

    #[test]
    fn resolver_caches_first_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"key_size": 3072}"#);
        let resolver = ConfigResolver::new(Some(path.clone()));
        assert_eq!(resolver.configuration().rsa_key_size(), 3072);

        fs::write(&path, r#"{"key_size": 4096}"#).unwrap();
        assert_eq!(resolver.configuration().rsa_key_size(), 3072);
        assert_eq!(resolver.path(), Some(path.as_path()));
    }
}
