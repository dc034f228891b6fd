use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use image::GenericImageView;
use tracing::{debug, info};

#[derive(Clone)]
pub struct DecodedImageData {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

pub enum AvatarEvent {
    Decoded {
        url: String,
        image: Option<DecodedImageData>,
    },
    Finished {
        ok: usize,
        miss: usize,
    },
    Failed {
        message: String,
    },
}

pub fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn local_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

/// Downloads or reads each avatar and decodes it off the UI thread.
pub fn spawn_avatar_decode(urls: Vec<String>, max_dimension: u32) -> Receiver<AvatarEvent> {
    let (tx, rx) = mpsc::channel::<AvatarEvent>();

    thread::spawn(move || {
        let worker_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .clamp(1, 4);

        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(err) => {
                let _ = tx.send(AvatarEvent::Failed {
                    message: format!("failed to initialize avatar runtime: {err}"),
                });
                return;
            }
        };

        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                let _ = tx.send(AvatarEvent::Failed {
                    message: format!("failed to build avatar HTTP client: {err}"),
                });
                return;
            }
        };

        let tx_progress = tx.clone();
        let (ok, miss) = runtime.block_on(async move {
            let mut ok = 0usize;
            let mut miss = 0usize;
            for url in urls {
                let bytes = if is_remote(&url) {
                    download(&client, &url).await
                } else {
                    std::fs::read(local_path(&url)).ok()
                };
                let image = match bytes {
                    Some(bytes) => tokio::task::spawn_blocking(move || {
                        decode_image_bytes(&bytes, max_dimension)
                    })
                    .await
                    .unwrap_or(None),
                    None => None,
                };
                if image.is_some() {
                    ok += 1;
                } else {
                    debug!("Avatar {} unavailable, falling back to initials", url);
                    miss += 1;
                }
                let _ = tx_progress.send(AvatarEvent::Decoded { url, image });
            }
            (ok, miss)
        });

        info!("Avatar decode finished: ok={}, miss={}", ok, miss);
        let _ = tx.send(AvatarEvent::Finished { ok, miss });
    });

    rx
}

async fn download(client: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        debug!("Avatar {} returned {}", url, response.status());
        return None;
    }
    response.bytes().await.ok().map(|bytes| bytes.to_vec())
}

pub fn decode_image_bytes(bytes: &[u8], max_dimension: u32) -> Option<DecodedImageData> {
    let mut decoded = image::load_from_memory(bytes).ok()?;
    let (width, height) = decoded.dimensions();
    let max_side = width.max(height);
    if max_side > max_dimension {
        decoded = decoded.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        );
    }
    let rgba = decoded.to_rgba8();
    Some(DecodedImageData {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn large_images_are_scaled_down() {
        let decoded = decode_image_bytes(&png_bytes(600, 300), 256).unwrap();
        assert_eq!((decoded.width, decoded.height), (256, 128));
        assert_eq!(decoded.rgba.len(), 256 * 128 * 4);
    }

    #[test]
    fn small_images_keep_their_size() {
        let decoded = decode_image_bytes(&png_bytes(40, 30), 256).unwrap();
        assert_eq!((decoded.width, decoded.height), (40, 30));
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        assert!(decode_image_bytes(b"definitely not an image", 256).is_none());
    }

    #[test]
    fn url_classification() {
        assert!(is_remote("https://cdn.example/a.png"));
        assert!(!is_remote("/srv/avatars/a.png"));
        assert_eq!(local_path("file:///srv/a.png"), PathBuf::from("/srv/a.png"));
        assert_eq!(local_path("avatars/a.png"), PathBuf::from("avatars/a.png"));
    }

    #[test]
    fn local_avatars_decode_and_missing_ones_miss() {
        let path = std::env::temp_dir().join(format!(
            "admin-leaderboard-avatar-{}.png",
            std::process::id()
        ));
        std::fs::write(&path, png_bytes(20, 20)).unwrap();
        assert!(decode_image_bytes(&std::fs::read(&path).unwrap(), 256).is_some());

        let missing = std::env::temp_dir().join("admin-leaderboard-no-avatar.png");
        let _ = std::fs::remove_file(&missing);
        let rx = spawn_avatar_decode(
            vec![path.display().to_string(), missing.display().to_string()],
            64,
        );

        let mut decoded = Vec::new();
        loop {
            match rx.recv().unwrap() {
                AvatarEvent::Decoded { url, image } => decoded.push((url, image.is_some())),
                AvatarEvent::Finished { ok, miss } => {
                    assert_eq!((ok, miss), (1, 1));
                    break;
                }
                AvatarEvent::Failed { message } => panic!("{message}"),
            }
        }
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].1);
        assert!(!decoded[1].1);
        let _ = std::fs::remove_file(path);
    }
}
