//! picbridge - command line front end for the shared upload channel
//!
//! Lets either side of the channel be played from a terminal: issue requests
//! as the app would, answer them as the uploader would, or just watch what
//! goes by.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use picbridge::ipc::{
    parse_host_list_result, parse_image, parse_upload_result, parse_version_result, respond,
    ChannelSnapshot, ChannelWatcher, FileChannel, ImageHost, ImageRequest, PasteboardType,
    RequestHandler, Responded, SharedChannel, UploadError, UploadResult, WatcherThread,
};
use picbridge::settings::BridgeSettings;

/// Upload error code for files the local responder can't read
const ERROR_FILE_UNREADABLE: i64 = 1;
/// Upload error code for requests carrying inline data only
const ERROR_DATA_UNSUPPORTED: i64 = 2;
/// Upload error code for an unknown host id
const ERROR_UNKNOWN_HOST: i64 = 3;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(name = "picbridge")]
#[command(about = "Exchange upload requests and results over the shared image channel", version)]
#[command(after_help = "Settings are read from the picbridge config directory (settings.json).
Set RUST_LOG=debug for detailed logging.")]
struct Cli {
    /// Channel name (defaults to the one in settings)
    #[arg(long, global = true)]
    channel: Option<String>,

    /// Directory holding channel files
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every change on the channel
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        secs: Option<u64>,
    },

    /// Ask the uploader for its version
    RequestVersion {
        /// Seconds to wait for an answer
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Ask the uploader for its image hosts
    RequestHosts {
        /// Seconds to wait for an answer
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Ask the uploader to upload an image
    Upload {
        /// Image file to upload
        path: PathBuf,

        /// Image host id to upload to
        #[arg(long)]
        host: Option<String>,

        /// Seconds to wait for an answer
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Answer requests as the uploader
    Respond {
        /// Stop after this many seconds
        #[arg(long)]
        secs: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = BridgeSettings::load();

    let name = cli
        .channel
        .clone()
        .unwrap_or_else(|| settings.channel_name.clone());
    let channel = match cli.dir.as_ref().or(settings.channel_dir.as_ref()) {
        Some(dir) => FileChannel::open_in(dir, &name),
        None => FileChannel::open(&name),
    }
    .with_context(|| format!("Failed to open channel '{}'", name))?;
    tracing::debug!("Using channel file {}", channel.path().display());

    match cli.command {
        Commands::Watch { secs } => watch(channel, &settings, secs.map(Duration::from_secs)),
        Commands::Respond { secs } => serve(channel, &settings, secs.map(Duration::from_secs)),
        Commands::RequestVersion { timeout } => {
            let timeout = Duration::from_secs(timeout);
            let version = request(channel, &settings, timeout, |w| w.write_version_request(), |s| {
                parse_version_result(s)
            })?;
            println!("Uploader version: {}", version);
            Ok(())
        }
        Commands::RequestHosts { timeout } => {
            let timeout = Duration::from_secs(timeout);
            let hosts = request(channel, &settings, timeout, |w| w.write_host_list_request(), |s| {
                s.contains(PasteboardType::ImageHostListResult)
                    .then(|| parse_host_list_result(s))
            })?;
            if hosts.is_empty() {
                println!("No image hosts configured");
            }
            for host in hosts {
                println!("{}\t{}", host.id, host.name);
            }
            Ok(())
        }
        Commands::Upload {
            path,
            host,
            timeout,
        } => {
            let timeout = Duration::from_secs(timeout);
            let mut image = ImageRequest::from_path(path);
            if let Some(host) = host {
                image = image.with_host(host);
            }
            let id = image.id.clone();
            let result = request(channel, &settings, timeout, |w| w.write_image(&image), |s| {
                parse_upload_result(s).filter(|r| r.id == id)
            })?;
            match (result.image_link, result.error) {
                (_, Some(error)) => bail!("Upload failed ({}): {}", error.code, error.message),
                (Some(link), None) => println!("{}", link),
                (None, None) => bail!("Uploader returned neither a link nor an error"),
            }
            Ok(())
        }
    }
}

/// Start a watcher on its own thread that forwards every change
fn spawn_forwarder(
    channel: FileChannel,
    settings: &BridgeSettings,
) -> Result<(WatcherThread<FileChannel>, Receiver<ChannelSnapshot>)> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = ChannelWatcher::new(channel);
    watcher.start_observing(settings.poll_interval(), move |snapshot| {
        let _ = tx.send(snapshot.clone());
    });
    let thread = WatcherThread::spawn(watcher).map_err(anyhow::Error::msg)?;
    Ok((thread, rx))
}

/// Receive forwarded snapshots until `deadline` (forever if None)
fn next_snapshot(
    rx: &Receiver<ChannelSnapshot>,
    deadline: Option<Instant>,
) -> Option<ChannelSnapshot> {
    match deadline {
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(snapshot) => Some(snapshot),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
            }
        }
        None => rx.recv().ok(),
    }
}

/// Write a request and wait for the first snapshot `parse` accepts
fn request<T>(
    channel: FileChannel,
    settings: &BridgeSettings,
    timeout: Duration,
    write: impl FnOnce(&ChannelWatcher<FileChannel>) -> bool,
    parse: impl Fn(&ChannelSnapshot) -> Option<T>,
) -> Result<T> {
    let writer = ChannelWatcher::new(channel.clone());
    let (thread, rx) = spawn_forwarder(channel, settings)?;

    // Whatever was on the channel before our request can't be its answer
    while rx.try_recv().is_ok() {}

    if !write(&writer) {
        bail!("Failed to write request to channel '{}'", writer.channel().name());
    }

    let deadline = Instant::now() + timeout;
    while let Some(snapshot) = next_snapshot(&rx, Some(deadline)) {
        if let Some(value) = parse(&snapshot) {
            thread.stop();
            return Ok(value);
        }
    }

    thread.stop();
    bail!("No answer from the uploader within {:?}", timeout)
}

fn watch(channel: FileChannel, settings: &BridgeSettings, run_for: Option<Duration>) -> Result<()> {
    let (thread, rx) = spawn_forwarder(channel, settings)?;
    let deadline = run_for.map(|d| Instant::now() + d);

    while let Some(snapshot) = next_snapshot(&rx, deadline) {
        println!("{}", describe(&snapshot));
    }

    thread.stop();
    Ok(())
}

fn describe(snapshot: &ChannelSnapshot) -> String {
    let tags: Vec<&str> = snapshot.items.iter().map(|i| i.type_tag.as_str()).collect();
    let mut line = format!("#{} [{}]", snapshot.change_count, tags.join(", "));

    if let Some(image) = parse_image(snapshot) {
        line.push_str(&format!(" image id={}", image.id));
    }
    if let Some(result) = parse_upload_result(snapshot) {
        line.push_str(&format!(" upload id={} success={}", result.id, result.is_success()));
    }
    if let Some(version) = parse_version_result(snapshot) {
        line.push_str(&format!(" version={}", version));
    }
    if snapshot.contains(PasteboardType::ImageHostListResult) {
        line.push_str(&format!(" hosts={}", parse_host_list_result(snapshot).len()));
    }
    line
}

/// Uploader that "hosts" images where they already are on disk
struct LocalUploader {
    version: i64,
    hosts: Vec<ImageHost>,
}

impl RequestHandler for LocalUploader {
    fn upload(&mut self, image: &ImageRequest) -> UploadResult {
        if let Some(host_id) = &image.image_host_id {
            if !self.hosts.iter().any(|h| &h.id == host_id) {
                return UploadResult::failure(
                    &image.id,
                    UploadError::new(ERROR_UNKNOWN_HOST, format!("Unknown image host {}", host_id)),
                );
            }
        }

        let Some(path) = &image.image_file_path else {
            return UploadResult::failure(
                &image.id,
                UploadError::new(ERROR_DATA_UNSUPPORTED, "Inline image data is not supported"),
            );
        };

        match std::fs::canonicalize(path) {
            Ok(full) => UploadResult::success(&image.id, format!("file://{}", full.display())),
            Err(e) => UploadResult::failure(
                &image.id,
                UploadError::new(
                    ERROR_FILE_UNREADABLE,
                    format!("Cannot read {}: {}", path.display(), e),
                ),
            ),
        }
    }

    fn uploader_version(&self) -> i64 {
        self.version
    }

    fn image_hosts(&self) -> Vec<ImageHost> {
        self.hosts.clone()
    }
}

fn serve(channel: FileChannel, settings: &BridgeSettings, run_for: Option<Duration>) -> Result<()> {
    let writer = ChannelWatcher::new(channel.clone());
    let (thread, rx) = spawn_forwarder(channel, settings)?;
    let deadline = run_for.map(|d| Instant::now() + d);

    let mut uploader = LocalUploader {
        version: settings.uploader_version,
        hosts: settings.image_hosts.clone(),
    };

    tracing::info!("Answering requests on '{}'", writer.channel().name());
    while let Some(snapshot) = next_snapshot(&rx, deadline) {
        match respond(&writer, &snapshot, &mut uploader) {
            Some(Responded {
                request,
                written: true,
            }) => tracing::info!("Answered {:?}", request),
            Some(Responded { request, .. }) => {
                tracing::error!("Could not write the answer to {:?}", request)
            }
            None => {}
        }
    }

    thread.stop();
    Ok(())
}
