//! Artifact naming and writing.
//!
//! Every file of one invocation is named `{prefix}_{kind}_{timestamp}.{ext}`
//! with the same timestamp. Files are only ever created, never overwritten.

use chrono::{Local, NaiveDateTime};
use log::{debug, error, info};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::*;

/// File-name timestamp layout, in local time.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Invocation timestamp shared by all artifacts of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Local::now().format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn from_naive(datetime: &NaiveDateTime) -> Self {
        Timestamp(datetime.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    Json,
    Pem,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Pem => "pem",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum ArtifactKind {
    Hmac,
    RsaPrivate,
    RsaPublic,
    EcPrivate,
    EcPublic,
    Example,
}

impl ArtifactKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Hmac => "hmac",
            ArtifactKind::RsaPrivate => "rsa_private",
            ArtifactKind::RsaPublic => "rsa_public",
            ArtifactKind::EcPrivate => "ec_private",
            ArtifactKind::EcPublic => "ec_public",
            ArtifactKind::Example => "example",
        }
    }

    pub fn format(&self) -> ArtifactFormat {
        match self {
            ArtifactKind::Hmac | ArtifactKind::Example => ArtifactFormat::Json,
            _ => ArtifactFormat::Pem,
        }
    }

    /// Whether the file holds material that must stay private.
    pub fn is_secret(&self) -> bool {
        !matches!(self, ArtifactKind::RsaPublic | ArtifactKind::EcPublic)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One file to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub kind: ArtifactKind,
    pub content: String,
}

impl OutputArtifact {
    pub fn new(kind: ArtifactKind, content: impl Into<String>) -> Self {
        OutputArtifact {
            kind,
            content: content.into(),
        }
    }

    /// Pretty-printed JSON artifact, newline terminated.
    pub fn json<T: serde::Serialize + ?Sized>(kind: ArtifactKind, value: &T) -> Result<Self, Error> {
        let mut content = serde_json::to_string_pretty(value)?;
        content.push('\n');
        Ok(OutputArtifact { kind, content })
    }

    pub fn file_name(&self, prefix: &str, timestamp: &Timestamp) -> String {
        format!(
            "{}_{}_{}.{}",
            prefix,
            self.kind.name(),
            timestamp,
            self.kind.format().extension()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub error: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    pub written: Vec<WrittenArtifact>,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes artifacts under one directory with one prefix.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    prefix: String,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        OutputWriter {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, artifact: &OutputArtifact, timestamp: &Timestamp) -> PathBuf {
        self.dir.join(artifact.file_name(&self.prefix, timestamp))
    }

    /// Write every artifact, continuing past individual failures.
    ///
    /// If the directory itself cannot be created, every artifact is reported as failed.
    pub fn write(&self, artifacts: &[OutputArtifact], timestamp: &Timestamp) -> WriteReport {
        let mut report = WriteReport::default();
        let dir_error = fs::create_dir_all(&self.dir).err().map(|e| {
            error!("Cannot create output directory {}: {}", self.dir.display(), e);
            e.to_string()
        });
        for artifact in artifacts {
            let path = self.path_for(artifact, timestamp);
            let res = match &dir_error {
                Some(e) => Err(e.clone()),
                None => write_new(&path, artifact).map_err(|e| e.to_string()),
            };
            match res {
                Ok(()) => {
                    info!("{} written to {}", artifact.kind, path.display());
                    report.written.push(WrittenArtifact {
                        kind: artifact.kind,
                        path,
                    });
                }
                Err(e) => {
                    error!("Failed to write {}: {}", path.display(), e);
                    report.failures.push(WriteFailure {
                        kind: artifact.kind,
                        path,
                        error: e,
                    });
                }
            }
        }
        debug!(
            "{} artifact(s) written, {} failed",
            report.written.len(),
            report.failures.len()
        );
        report
    }
}

fn write_new(path: &Path, artifact: &OutputArtifact) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if artifact.kind.is_secret() {
            options.mode(0o600);
        }
    }
    let mut file = options.open(path)?;
    file.write_all(artifact.content.as_bytes())?;
    file.sync_all()
}
