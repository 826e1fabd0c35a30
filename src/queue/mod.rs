//! The on-disk crawl workspace: lockfile, phase directories, and the
//! phase-complete latch (spec §3, §4.1).
//!
//! The lockfile is the only cross-process coordinator and is never
//! read-modify-written: it is created with `O_CREAT|O_EXCL` semantics
//! (`create_new`) or deleted outright.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{CrawlError, CrawlResult};
use crate::model::Document;

mod serialize;

pub use serialize::{read_document, write_document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Extract,
    Transform,
    Publish,
}

impl Phase {
    fn dirname(self) -> &'static str {
        match self {
            Phase::Extract => "extract",
            Phase::Transform => "transform",
            Phase::Publish => "publish",
        }
    }

    fn index(self) -> usize {
        match self {
            Phase::Extract => 0,
            Phase::Transform => 1,
            Phase::Publish => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlType {
    Full,
    Incremental,
}

impl CrawlType {
    pub fn as_str(self) -> &'static str {
        match self {
            CrawlType::Full => "full",
            CrawlType::Incremental => "incremental",
        }
    }
}

/// A sentinel marker, distinguishable from any document id on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Start,
    Finish,
    Abort,
}

/// The payload carried on a phase channel: either a document id (with
/// optional phase-timing metadata) or a terminal/start sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    DocId {
        id: String,
        phase_time: Option<DateTime<Utc>>,
    },
    Sentinel(Sentinel),
}

impl ChannelMessage {
    pub fn doc_id(id: impl Into<String>) -> Self {
        ChannelMessage::DocId {
            id: id.into(),
            phase_time: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChannelMessage::Sentinel(Sentinel::Finish) | ChannelMessage::Sentinel(Sentinel::Abort)
        )
    }
}

struct PhaseLatch {
    extract: AtomicBool,
    transform: AtomicBool,
    publish: AtomicBool,
}

impl PhaseLatch {
    fn new() -> Self {
        Self {
            extract: AtomicBool::new(false),
            transform: AtomicBool::new(false),
            publish: AtomicBool::new(false),
        }
    }

    fn flag(&self, phase: Phase) -> &AtomicBool {
        match phase {
            Phase::Extract => &self.extract,
            Phase::Transform => &self.transform,
            Phase::Publish => &self.publish,
        }
    }

    fn is_complete(&self, phase: Phase) -> bool {
        self.flag(phase).load(Ordering::SeqCst)
    }

    /// Idempotently marks the phase complete; returns whether this call was
    /// the one that latched it (false if already latched).
    fn latch(&self, phase: Phase) -> bool {
        self.flag(phase)
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn reset(&self) {
        self.extract.store(false, Ordering::SeqCst);
        self.transform.store(false, Ordering::SeqCst);
        self.publish.store(false, Ordering::SeqCst);
    }
}

/// Owns the on-disk workspace for one crawl. Only one crawl may be active
/// per `base_dir` at a time (spec §3 lockfile invariant).
pub struct CrawlQueue {
    base_dir: PathBuf,
    crawl_id: Mutex<u64>,
    crawl_type: Mutex<CrawlType>,
    since: Mutex<Option<DateTime<Utc>>>,
    phase_complete: PhaseLatch,
    shutting_down: AtomicBool,
}

impl CrawlQueue {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            crawl_id: Mutex::new(0),
            crawl_type: Mutex::new(CrawlType::Full),
            since: Mutex::new(None),
            phase_complete: PhaseLatch::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    fn lockfile_path(&self) -> PathBuf {
        self.base_dir.join("queue").join("lock.txt")
    }

    fn crawl_dir(&self, crawl_id: u64) -> PathBuf {
        self.base_dir.join("queue").join(crawl_id.to_string())
    }

    fn phase_dir(&self, crawl_id: u64, phase: Phase) -> PathBuf {
        self.crawl_dir(crawl_id).join(phase.dirname())
    }

    pub fn phase_path(&self, phase: Phase, doc_id: &str) -> CrawlResult<PathBuf> {
        let crawl_id = *self.crawl_id.lock().unwrap();
        Ok(self.phase_dir(crawl_id, phase).join(format!("{doc_id}.xml")))
    }

    fn lockfile_exists(&self) -> bool {
        self.lockfile_path().exists()
    }

    pub fn is_active(&self) -> bool {
        *self.crawl_id.lock().unwrap() != 0 && self.lockfile_exists()
    }

    pub fn crawl_id(&self) -> u64 {
        *self.crawl_id.lock().unwrap()
    }

    pub fn crawl_type(&self) -> CrawlType {
        *self.crawl_type.lock().unwrap()
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        *self.since.lock().unwrap()
    }

    /// Start a new crawl: fails with `CrawlAlreadyActive` if the lockfile is
    /// present; otherwise allocates a crawl id, creates the three phase
    /// directories, and writes the lockfile.
    pub fn start(&self, crawl_type: CrawlType, since: Option<DateTime<Utc>>) -> CrawlResult<u64> {
        fs::create_dir_all(self.base_dir.join("queue"))?;

        let lock_path = self.lockfile_path();
        if lock_path.exists() {
            return Err(CrawlError::CrawlAlreadyActive(self.base_dir.clone()));
        }

        let crawl_id = allocate_crawl_id();
        for phase in [Phase::Extract, Phase::Transform, Phase::Publish] {
            fs::create_dir_all(self.phase_dir(crawl_id, phase))?;
        }

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                use std::io::Write;
                write!(file, "{crawl_id}")?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CrawlError::CrawlAlreadyActive(self.base_dir.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        *self.crawl_id.lock().unwrap() = crawl_id;
        *self.crawl_type.lock().unwrap() = crawl_type;
        *self.since.lock().unwrap() = since;
        self.phase_complete.reset();
        self.shutting_down.store(false, Ordering::SeqCst);

        Ok(crawl_id)
    }

    /// Atomic rename handoff, used when the document is unchanged between
    /// phases.
    pub fn transition_rename(&self, src: Phase, dst: Phase, doc_id: &str) -> CrawlResult<()> {
        let crawl_id = self.crawl_id();
        let src_path = self.phase_dir(crawl_id, src).join(format!("{doc_id}.xml"));
        let dst_path = self.phase_dir(crawl_id, dst).join(format!("{doc_id}.xml"));
        if !src_path.exists() {
            return Err(CrawlError::TransitionFailed(format!(
                "source file missing for {doc_id}: {}",
                src_path.display()
            )));
        }
        fs::rename(&src_path, &dst_path)?;
        Ok(())
    }

    /// Write-then-delete handoff, used when the transform step mutated the
    /// document: a crash between the two leaves a transient duplicate,
    /// never a loss, recovered by idempotent re-processing on restart.
    pub fn transition_write(
        &self,
        src: Phase,
        dst: Phase,
        document: &Document,
        doc_id: &str,
    ) -> CrawlResult<()> {
        let crawl_id = self.crawl_id();
        let dst_path = self.phase_dir(crawl_id, dst).join(format!("{doc_id}.xml"));
        write_document(&dst_path, document)?;
        let src_path = self.phase_dir(crawl_id, src).join(format!("{doc_id}.xml"));
        fs::remove_file(&src_path)?;
        Ok(())
    }

    /// Write a document directly into a phase directory without deleting a
    /// source file — used by the extractor, which has no upstream phase.
    pub fn write_into(&self, phase: Phase, document: &Document, doc_id: &str) -> CrawlResult<()> {
        let crawl_id = self.crawl_id();
        let path = self.phase_dir(crawl_id, phase).join(format!("{doc_id}.xml"));
        write_document(&path, document)
    }

    pub fn read_from(&self, phase: Phase, doc_id: &str) -> CrawlResult<Document> {
        let crawl_id = self.crawl_id();
        let path = self.phase_dir(crawl_id, phase).join(format!("{doc_id}.xml"));
        read_document(&path)
    }

    pub fn delete_from(&self, phase: Phase, doc_id: &str) -> CrawlResult<()> {
        let crawl_id = self.crawl_id();
        let path = self.phase_dir(crawl_id, phase).join(format!("{doc_id}.xml"));
        fs::remove_file(&path)?;
        Ok(())
    }

    /// True iff the application is shutting down, the phase is already
    /// latched complete, or `payload` is a terminal sentinel — latching the
    /// phase as a side effect in the latter two cases.
    pub fn is_phase_complete(&self, phase: Phase, payload: &ChannelMessage) -> bool {
        if self.shutting_down.load(Ordering::SeqCst) {
            self.phase_complete.latch(phase);
            return true;
        }
        if self.phase_complete.is_complete(phase) {
            return true;
        }
        if payload.is_terminal() {
            self.phase_complete.latch(phase);
            return true;
        }
        false
    }

    pub fn request_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Release the lock and reset phase-complete flags, leaving per-crawl
    /// directories in place so undelivered publish-phase documents survive
    /// for the next crawl's retry.
    pub fn clear(&self) -> CrawlResult<()> {
        if !self.is_active() {
            return Ok(());
        }
        let lock_path = self.lockfile_path();
        if lock_path.exists() {
            fs::remove_file(&lock_path)?;
        }
        self.phase_complete.reset();
        *self.crawl_id.lock().unwrap() = 0;
        Ok(())
    }

    /// `clear()` plus a recursive delete of the per-crawl directory tree.
    pub fn reset(&self) -> CrawlResult<()> {
        let crawl_id = self.crawl_id();
        self.clear()?;
        if crawl_id != 0 {
            let dir = self.crawl_dir(crawl_id);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// `clear()` if `keep_queue`, else `reset()` (spec §4.1 `finish`).
    pub fn finish(&self, keep_queue: bool) -> CrawlResult<()> {
        if keep_queue {
            self.clear()
        } else {
            self.reset()
        }
    }
}

fn allocate_crawl_id() -> u64 {
    let uuid = uuid::Uuid::new_v4();
    let mut hasher = DefaultHasher::new();
    uuid.hash(&mut hasher);
    let id = hasher.finish();
    if id == 0 {
        1
    } else {
        id
    }
}

pub fn base_queue_dir(base_dir: &Path) -> PathBuf {
    base_dir.join("queue")
}
