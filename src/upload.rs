use anyhow::{bail, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Generation number handed out per upload request. Only the newest ticket
/// may replace the background.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UploadTicket(pub(crate) u64);

impl UploadTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug)]
enum SourceData {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// A file the user picked or dropped, already checked to claim an image type.
#[derive(Clone, Debug)]
pub struct UploadSource {
    pub name: String,
    data: SourceData,
}

impl UploadSource {
    /// Accepts a path only if its extension names an image format.
    pub fn from_path(path: &Path) -> Result<Self> {
        image::ImageFormat::from_path(path)
            .with_context(|| format!("{} is not an image file", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        Ok(Self {
            name,
            data: SourceData::Path(path.to_path_buf()),
        })
    }

    /// Accepts in-memory content if its media type is `image/*`.
    pub fn from_bytes(name: &str, mime: &str, bytes: Arc<[u8]>) -> Result<Self> {
        if !mime.is_empty() && !mime.starts_with("image/") {
            bail!("{name} has media type {mime}, expected an image");
        }
        Ok(Self {
            name: name.to_string(),
            data: SourceData::Bytes(bytes),
        })
    }
}

/// Decoded RGBA pixels ready to become a texture.
#[derive(Clone)]
pub struct DecodedImage {
    pub name: String,
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

pub fn decode(source: &UploadSource) -> Result<DecodedImage> {
    let bytes: Arc<[u8]> = match &source.data {
        SourceData::Path(path) => std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?
            .into(),
        SourceData::Bytes(bytes) => bytes.clone(),
    };
    let format = image::guess_format(&bytes)
        .with_context(|| format!("{} does not contain image data", source.name))?;
    let img = image::load_from_memory_with_format(&bytes, format)
        .with_context(|| format!("failed to decode {}", source.name))?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(DecodedImage {
        name: source.name.clone(),
        size,
        rgba: rgba.into_raw(),
    })
}

pub type DecodeResult = (UploadTicket, Result<DecodedImage>);

/// Decodes backgrounds off the UI thread. Results come back in completion
/// order; callers decide which ticket wins.
pub struct BackgroundLoader {
    tx: Sender<DecodeResult>,
    rx: Receiver<DecodeResult>,
    in_flight: usize,
}

impl BackgroundLoader {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn request(&mut self, ticket: UploadTicket, source: UploadSource) {
        let tx = self.tx.clone();
        log::debug!("decoding {} (generation {})", source.name, ticket.0);
        let spawned = std::thread::Builder::new()
            .name("background-decode".into())
            .spawn(move || {
                let result = decode(&source);
                let _ = tx.send((ticket, result));
            });
        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(e) => log::error!("failed to spawn decode thread: {e}"),
        }
    }

    pub fn poll(&mut self) -> Vec<DecodeResult> {
        let done: Vec<_> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}

impl Default for BackgroundLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn png_bytes(w: u32, h: u32) -> Arc<[u8]> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([0, 255, 255, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes.into()
    }

    #[test]
    fn rejects_non_image_extension() {
        assert!(UploadSource::from_path(Path::new("notes.txt")).is_err());
        assert!(UploadSource::from_path(Path::new("map.png")).is_ok());
        assert!(UploadSource::from_path(Path::new("MAP.JPG")).is_ok());
    }

    #[test]
    fn rejects_non_image_media_type() {
        let bytes: Arc<[u8]> = Arc::from(&b"hello"[..]);
        assert!(UploadSource::from_bytes("a.txt", "text/plain", bytes.clone()).is_err());
        assert!(UploadSource::from_bytes("a.png", "image/png", bytes).is_ok());
    }

    #[test]
    fn decodes_png_from_memory() {
        let source = UploadSource::from_bytes("tiny.png", "image/png", png_bytes(4, 3)).unwrap();
        let decoded = decode(&source).unwrap();
        assert_eq!(decoded.size, [4, 3]);
        assert_eq!(decoded.rgba.len(), 4 * 3 * 4);
        assert_eq!(&decoded.rgba[..4], &[0, 255, 255, 255]);
    }

    #[test]
    fn content_that_is_not_an_image_fails_to_decode() {
        let bytes: Arc<[u8]> = Arc::from(&b"definitely not a png"[..]);
        let source = UploadSource::from_bytes("fake.png", "image/png", bytes).unwrap();
        assert!(decode(&source).is_err());
    }

    #[test]
    fn missing_file_reports_read_error() {
        let source = UploadSource::from_path(Path::new("/nonexistent/dir/map.png")).unwrap();
        let err = decode(&source).unwrap_err();
        assert!(format!("{err}").contains("failed to read"));
    }

    #[test]
    fn loader_delivers_results_with_ticket() {
        let mut loader = BackgroundLoader::new();
        let source = UploadSource::from_bytes("tiny.png", "", png_bytes(2, 2)).unwrap();
        loader.request(UploadTicket(7), source);
        assert!(loader.is_busy());

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut done = Vec::new();
        while done.is_empty() && Instant::now() < deadline {
            done = loader.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(done.len(), 1);
        let (ticket, result) = done.pop().unwrap();
        assert_eq!(ticket.generation(), 7);
        assert_eq!(result.unwrap().size, [2, 2]);
        assert!(!loader.is_busy());
    }
}
