use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::{error::RecordError, name::Domain};

/// Sink for names discovered while walking a zone.
pub trait ChainRecorder {
    fn record(&mut self, domain: &Domain, next: &str) -> Result<(), RecordError>;
}

impl<C: ChainRecorder + ?Sized> ChainRecorder for Box<C> {
    fn record(&mut self, domain: &Domain, next: &str) -> Result<(), RecordError> {
        (**self).record(domain, next)
    }
}

/// Appends every name to `<dir>/nsec-<domain>.txt`, one per line.
#[derive(Debug, Clone)]
pub struct FileRecorder {
    dir: PathBuf,
}

impl FileRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, domain: &Domain) -> PathBuf {
        self.dir.join(format!("nsec-{domain}.txt"))
    }
}

impl ChainRecorder for FileRecorder {
    fn record(&mut self, domain: &Domain, next: &str) -> Result<(), RecordError> {
        let path = self.path_for(domain);
        let append = || -> std::io::Result<()> {
            fs::create_dir_all(&self.dir)?;
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{next}")
        };
        append().map_err(|source| RecordError { path, source })
    }
}

/// Drops every name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardRecorder;

impl ChainRecorder for DiscardRecorder {
    fn record(&mut self, _domain: &Domain, _next: &str) -> Result<(), RecordError> {
        Ok(())
    }
}
