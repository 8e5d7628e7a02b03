use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log size that triggers a trim
const ROTATE_AT: u64 = 5 * 1024 * 1024;
/// Tail retained by a trim
const RETAIN: u64 = 1024 * 1024;

/// Trim the log to its most recent `RETAIN` bytes once it grows past
/// `ROTATE_AT`
fn trim_log(log_path: &Path) -> io::Result<()> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if size <= ROTATE_AT {
        return Ok(());
    }

    let mut file = File::open(log_path)?;
    file.seek(SeekFrom::Start(size.saturating_sub(RETAIN)))?;
    let mut tail = Vec::with_capacity(RETAIN as usize);
    file.read_to_end(&mut tail)?;
    drop(file);

    // Drop the partial first line
    let start = tail.iter().position(|&b| b == b'\n').map_or(0, |i| i + 1);

    let mut out = File::create(log_path)?;
    out.write_all(b"--- glidepath log trimmed ---\n")?;
    out.write_all(&tail[start..])?;
    Ok(())
}

/// One log file behind a lock, shared by every writer the subscriber makes
#[derive(Clone)]
struct SharedLog {
    file: Arc<Mutex<File>>,
}

struct SharedLogHandle {
    file: Arc<Mutex<File>>,
}

fn poisoned() -> io::Error {
    io::Error::other("log file lock poisoned")
}

impl Write for SharedLogHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.lock().map_err(|_| poisoned())?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().map_err(|_| poisoned())?.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedLog {
    type Writer = SharedLogHandle;

    fn make_writer(&'a self) -> Self::Writer {
        SharedLogHandle {
            file: self.file.clone(),
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    let default_filter = format!("glidepath={level},glidepath_core=warn");
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialize logging.
///
/// Without a `log_file` events go to stderr, keeping stdout free for results.
/// With one, events are appended to that file with size-based rotation: past
/// 5MB only the last 1MB is kept. `RUST_LOG` overrides `level`.
pub fn init_logging(log_file: Option<&Path>, level: &str) -> color_eyre::Result<()> {
    let Some(log_path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter(level))
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .try_init()?;
        return Ok(());
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if let Err(e) = trim_log(log_path) {
        eprintln!("warning: could not trim {}: {e}", log_path.display());
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    let shared = SharedLog {
        file: Arc::new(Mutex::new(file)),
    };

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            fmt::layer()
                .with_writer(shared)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init()?;

    tracing::info!(log_path = %log_path.display(), "Logging initialized");
    Ok(())
}
