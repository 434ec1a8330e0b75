use crate::model::Schedule;
use anyhow::{bail, Context};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persistance d'un planning résolu (relecture, archivage).
pub trait Storage {
    fn load(&self) -> anyhow::Result<Schedule>;
    /// Sauvegarde atomique : jamais de planning à moitié écrit sur disque.
    fn save(&self, schedule: &Schedule) -> anyhow::Result<()>;
}

/// Un fichier JSON par bloc.
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> anyhow::Result<Schedule> {
        let data =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let schedule: Schedule = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        if schedule.rows.is_empty() {
            bail!("{} contains an empty schedule", self.path.display());
        }
        Ok(schedule)
    }

    fn save(&self, schedule: &Schedule) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut json = serde_json::to_vec_pretty(schedule)?;
        json.push(b'\n');

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
