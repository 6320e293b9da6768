//! On-disk credential store.
//!
//! # File Format
//! ```text
//! ["<owner key>"]
//! account_id = "123456789012"
//! us-east-1_x_sts_gci_headers = "X-Amz-Algorithm=..."
//! us-east-1_expiry = "2026-10-16T12:15:00Z"
//! us-east-1_endpoint = "hlb.us-east-1.aws.zonehero.cloud"
//! ```
//!
//! # Design Decisions
//! - A missing, unreadable or corrupt file means "nothing cached"
//! - Values that are not strings are ignored on load and left untouched on save
//! - A file that is not TOML at all is moved to `<name>.corrupt` before the
//!   first save replaces it
//! - Writes go to a uniquely named sibling temp file and are renamed into place

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use tempfile::NamedTempFile;
use toml::{Table, Value};
use tracing::{debug, warn};

use crate::credentials::record::CredentialRecord;
use crate::error::{HlbError, HlbResult};

const ACCOUNT_ID_KEY: &str = "account_id";
const HEADER_SUFFIX: &str = "_x_sts_gci_headers";
const EXPIRY_SUFFIX: &str = "_expiry";
const ENDPOINT_SUFFIX: &str = "_endpoint";
const CORRUPT_SUFFIX: &str = ".corrupt";

/// Default location: `~/.hlb/credentials`.
pub fn default_store_path() -> HlbResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".hlb").join("credentials"))
        .ok_or_else(|| HlbError::Config("Cannot determine home directory".into()))
}

/// Why the store file could not be used.
enum ReadFailure {
    Io(io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadFailure::Io(e) => write!(f, "{}", e),
            ReadFailure::Parse(e) => write!(f, "{}", e),
        }
    }
}

/// Credential records persisted in a TOML file, one table per owner key.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    /// Store at `path`, or at the default location when `None`.
    pub fn open(path: Option<&str>) -> HlbResult<Self> {
        match path {
            Some(p) => Ok(Self::new(p)),
            None => Ok(Self::new(default_store_path()?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored record for (`owner_key`, `region`), if complete and parseable.
    pub fn load(&self, owner_key: &str, region: &str) -> Option<CredentialRecord> {
        let _guard = self.io_lock.lock().unwrap_or_else(|e| e.into_inner());

        let document = match self.read_document() {
            Ok(Some(doc)) => doc,
            Ok(None) => return None,
            Err(reason) => {
                warn!(path = %self.path.display(), reason = %reason, "Ignoring unreadable credential store");
                return None;
            }
        };

        let section = document.get(owner_key).and_then(Value::as_table)?;
        let record = parse_section(owner_key, region, section);
        if record.is_none() {
            debug!(region = %region, "Stored credentials incomplete, treating as absent");
        }
        record
    }

    /// Write `record` into its owner's table, keeping every other entry.
    pub fn save(&self, record: &CredentialRecord) -> HlbResult<()> {
        let _guard = self.io_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut document = match self.read_document() {
            Ok(doc) => doc.unwrap_or_default(),
            Err(ReadFailure::Parse(reason)) => {
                let aside = self.set_aside().map_err(|source| self.store_error(source))?;
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    reason = %reason,
                    "Credential store is not valid TOML, moved it aside"
                );
                Table::new()
            }
            Err(ReadFailure::Io(source)) => return Err(self.store_error(source)),
        };

        let region = &record.region;
        let mut section = match document.remove(&record.owner_key) {
            Some(Value::Table(section)) => section,
            _ => Table::new(),
        };

        section.insert(ACCOUNT_ID_KEY.to_string(), Value::String(record.account_id.clone()));
        section.insert(
            format!("{}{}", region, HEADER_SUFFIX),
            Value::String(record.header.clone()),
        );
        section.insert(
            format!("{}{}", region, EXPIRY_SUFFIX),
            Value::String(record.expiry.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        match &record.endpoint {
            Some(endpoint) => {
                section.insert(
                    format!("{}{}", region, ENDPOINT_SUFFIX),
                    Value::String(endpoint.clone()),
                );
            }
            None => {
                section.remove(&format!("{}{}", region, ENDPOINT_SUFFIX));
            }
        }

        document.insert(record.owner_key.clone(), Value::Table(section));

        let content = toml::to_string(&document)
            .map_err(|e| HlbError::Credentials(format!("failed to encode credential store: {}", e)))?;
        self.write_atomically(content.as_bytes())
            .map_err(|source| self.store_error(source))?;

        debug!(path = %self.path.display(), region = %region, "Persisted signed header");
        Ok(())
    }

    /// `Ok(None)` when the file does not exist.
    fn read_document(&self) -> Result<Option<Table>, ReadFailure> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReadFailure::Io(e)),
        };
        content.parse::<Table>().map(Some).map_err(ReadFailure::Parse)
    }

    fn set_aside(&self) -> io::Result<PathBuf> {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(CORRUPT_SUFFIX);
        let aside = self.path.with_file_name(name);
        fs::rename(&self.path, &aside)?;
        Ok(aside)
    }

    fn write_atomically(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = match self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => {
                create_private_dir(dir)?;
                dir
            }
            None => Path::new("."),
        };

        // Created with mode 0600 on unix.
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn store_error(&self, source: io::Error) -> HlbError {
        HlbError::Store {
            path: self.path.display().to_string(),
            source,
        }
    }
}

fn string_field<'a>(section: &'a Table, key: &str) -> Option<&'a str> {
    section.get(key).and_then(Value::as_str)
}

fn parse_section(owner_key: &str, region: &str, section: &Table) -> Option<CredentialRecord> {
    let account_id = string_field(section, ACCOUNT_ID_KEY).filter(|v| !v.is_empty())?;
    let header = string_field(section, &format!("{}{}", region, HEADER_SUFFIX))
        .filter(|v| !v.is_empty())?;
    let expiry = string_field(section, &format!("{}{}", region, EXPIRY_SUFFIX))?;
    let expiry = DateTime::parse_from_rfc3339(expiry).ok()?.with_timezone(&Utc);

    Some(CredentialRecord {
        owner_key: owner_key.to_string(),
        region: region.to_string(),
        header: header.to_string(),
        expiry,
        account_id: account_id.to_string(),
        endpoint: string_field(section, &format!("{}{}", region, ENDPOINT_SUFFIX)).map(str::to_string),
    })
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    if dir.exists() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}
