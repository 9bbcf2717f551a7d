use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use taste_core::checkout::CheckOutReport;
use taste_core::{Photo, PhotoPatch};

#[zbus::proxy(
    interface = "org.getmeadate.Taste1",
    default_service = "org.getmeadate.Taste1",
    default_path = "/org/getmeadate/Taste1"
)]
trait Taste {
    fn check_photos_out(&self, channel: &str, photos: &str) -> zbus::Result<String>;
    fn acquire_taste(&self, photos: &str) -> zbus::Result<String>;
    fn mental_snapshot(&self, channel: &str, photo: &str) -> zbus::Result<String>;
    fn sync(&self) -> zbus::Result<String>;
    fn store_messages(&self, messages: &str) -> zbus::Result<u32>;
    fn status(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "taste", about = "Taste photo preference CLI")]
struct Cli {
    /// Talk to tasted on the system bus instead of the session bus
    #[arg(long, global = true)]
    system: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score candidate photos against the learned taste
    CheckOut {
        /// Channel the photos come from (e.g., "tinder")
        #[arg(short, long)]
        channel: String,
        /// JSON file holding an array of photos; rewritten with the check-out results
        file: PathBuf,
    },
    /// Learn from liked photos
    Acquire {
        /// JSON file holding an array of photos
        file: PathBuf,
    },
    /// Save an 84x84 thumbnail of a photo
    Snapshot {
        #[arg(short, long)]
        channel: String,
        /// Photo URL
        url: String,
    },
    /// Store chat messages
    Messages {
        /// JSON file holding an array of messages
        file: PathBuf,
    },
    /// Reconcile the face collection with the training images
    Sync,
    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let conn = if cli.system {
        zbus::Connection::system().await
    } else {
        zbus::Connection::session().await
    }
    .context("cannot connect to D-Bus")?;
    let proxy = TasteProxy::new(&conn)
        .await
        .context("tasted is not reachable")?;

    match cli.command {
        Commands::CheckOut { channel, file } => {
            let mut photos = read_photos(&file)?;
            let reply = proxy
                .check_photos_out(&channel, &serde_json::to_string(&photos)?)
                .await?;
            let report: CheckOutReport = serde_json::from_str(&reply)?;
            if apply_patches(&mut photos, &report.patches) > 0 {
                write_photos(&file, &photos)?;
            }
            println!(
                "{} photos, max {:.2}, min {:.2}, mean {:.2}",
                report.face_similarities.len(),
                report.face_similarity_max,
                report.face_similarity_min,
                report.face_similarity_mean
            );
            println!("{}", if report.like { "like" } else { "pass" });
        }
        Commands::Acquire { file } => {
            let photos = read_photos(&file)?;
            let reply = proxy.acquire_taste(&serde_json::to_string(&photos)?).await?;
            println!("{reply}");
        }
        Commands::Snapshot { channel, url } => {
            let photo = serde_json::to_string(&Photo::new(url))?;
            println!("{}", proxy.mental_snapshot(&channel, &photo).await?);
        }
        Commands::Messages { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let stored = proxy.store_messages(&json).await?;
            println!("{stored} messages stored");
        }
        Commands::Sync => {
            println!("{}", proxy.sync().await?);
        }
        Commands::Status => {
            println!("{}", proxy.status().await?);
        }
    }

    Ok(())
}

fn read_photos(path: &Path) -> Result<Vec<Photo>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("{} is not a JSON photo array", path.display()))
}

/// Merge index-aligned patches into `photos`; returns how many photos changed.
fn apply_patches(photos: &mut [Photo], patches: &[PhotoPatch]) -> usize {
    let mut changed = 0;
    for (photo, patch) in photos.iter_mut().zip(patches) {
        if !patch.is_empty() {
            photo.apply(patch);
            changed += 1;
        }
    }
    changed
}

fn write_photos(path: &Path, photos: &[Photo]) -> Result<()> {
    let json = serde_json::to_string_pretty(photos)?;
    std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_out_photos_are_written_back() {
        let path = std::env::temp_dir().join(format!("taste-cli-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"url": "https://cdn.example/a.jpg"}, {"url": "https://cdn.example/b.jpg"}]"#,
        )
        .unwrap();

        let mut photos = read_photos(&path).unwrap();
        let stored = "https://s3.us-east-1.amazonaws.com/get-me-a-date-x/photos/tinder/a.jpg";
        let patches = vec![
            PhotoPatch {
                url: Some(stored.into()),
                similarity: Some(88.5),
                similarity_date: Some(chrono::Utc::now()),
            },
            PhotoPatch::default(),
        ];
        assert_eq!(apply_patches(&mut photos, &patches), 1);
        write_photos(&path, &photos).unwrap();

        let reread = read_photos(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(reread[0].url, stored);
        assert_eq!(reread[0].similarity, Some(88.5));
        assert!(reread[0].is_checked_out());
        assert_eq!(reread[1], Photo::new("https://cdn.example/b.jpg"));
    }
}
