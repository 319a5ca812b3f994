use std::io::Cursor;

use base64::Engine;
use image::{ImageEncoder, RgbImage, RgbaImage};
use rayon::prelude::*;

use crate::error::SvgCanvasError;
use crate::scene::{SceneItem, images_mut};

#[derive(Debug, Clone)]
pub enum ImageSource {
    Url {
        href: String,
        width: u32,
        height: u32,
    },
    Encoded(Vec<u8>),
    Pixels(RgbaImage),
    VideoFrame(RgbImage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

const VIDEO_FRAME_QUALITY: u8 = 90;

impl ImageSource {
    pub fn url(href: impl Into<String>, width: u32, height: u32) -> Self {
        ImageSource::Url {
            href: href.into(),
            width,
            height,
        }
    }

    pub fn describe(&self) -> Result<ImageInfo, SvgCanvasError> {
        match self {
            ImageSource::Url {
                href,
                width,
                height,
            } => {
                if (*width == 0 || *height == 0) && href.starts_with("data:") {
                    let Some((_, bytes)) = parse_data_uri(href) else {
                        return Err(SvgCanvasError::Image(
                            "malformed data URI".to_string(),
                        ));
                    };
                    let (width, height) = encoded_dimensions(&bytes)?;
                    return Ok(ImageInfo {
                        src: href.clone(),
                        width,
                        height,
                    });
                }
                Ok(ImageInfo {
                    src: href.clone(),
                    width: *width,
                    height: *height,
                })
            }
            ImageSource::Encoded(bytes) => {
                let (width, height) = encoded_dimensions(bytes)?;
                Ok(ImageInfo {
                    src: data_uri(sniff_mime(bytes), bytes),
                    width,
                    height,
                })
            }
            ImageSource::Pixels(pixels) => {
                let (width, height) = pixels.dimensions();
                let mut png = Vec::new();
                image::codecs::png::PngEncoder::new(&mut png).write_image(
                    pixels.as_raw(),
                    width,
                    height,
                    image::ExtendedColorType::Rgba8,
                )?;
                Ok(ImageInfo {
                    src: data_uri("image/png", &png),
                    width,
                    height,
                })
            }
            ImageSource::VideoFrame(frame) => {
                let (width, height) = frame.dimensions();
                let mut jpeg = Vec::new();
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, VIDEO_FRAME_QUALITY)
                    .write_image(
                        frame.as_raw(),
                        width,
                        height,
                        image::ExtendedColorType::Rgb8,
                    )?;
                Ok(ImageInfo {
                    src: data_uri("image/jpeg", &jpeg),
                    width,
                    height,
                })
            }
        }
    }
}

fn encoded_dimensions(bytes: &[u8]) -> Result<(u32, u32), SvgCanvasError> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}

pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::WebP) => "image/webp",
        _ => "application/octet-stream",
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{payload}")
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, data_part) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|mime| !mime.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains("base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data_part)
            .ok()?
    } else {
        data_part.as_bytes().to_vec()
    };
    Some((mime, data))
}

pub fn is_remote_source(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

pub trait ImageLoader: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedImage, SvgCanvasError>;
}

#[derive(Debug, Clone)]
pub struct HttpImageLoader {
    timeout: std::time::Duration,
}

impl HttpImageLoader {
    pub fn new() -> Self {
        Self {
            timeout: std::time::Duration::from_secs(15),
        }
    }

    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for HttpImageLoader {
    #[cfg(feature = "remote")]
    fn fetch(&self, url: &str) -> Result<FetchedImage, SvgCanvasError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| SvgCanvasError::Fetch(err.to_string()))?;
        let response = client
            .get(url)
            .send()
            .map_err(|err| SvgCanvasError::Fetch(format!("{url}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SvgCanvasError::Fetch(format!("{url}: status {status}")));
        }
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
        let bytes = response
            .bytes()
            .map_err(|err| SvgCanvasError::Fetch(format!("{url}: {err}")))?;
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            mime,
        })
    }

    #[cfg(not(feature = "remote"))]
    fn fetch(&self, url: &str) -> Result<FetchedImage, SvgCanvasError> {
        let _ = self.timeout;
        Err(SvgCanvasError::Fetch(format!(
            "{url}: remote image loading requires the `remote` feature"
        )))
    }
}

#[derive(Debug)]
pub struct ImageLoadOutcome {
    pub url: String,
    pub error: Option<SvgCanvasError>,
}

pub(crate) fn resolve_remote_images(
    items: &mut [SceneItem],
    loader: &dyn ImageLoader,
) -> Vec<ImageLoadOutcome> {
    let mut pending: Vec<_> = images_mut(items)
        .filter(|image| is_remote_source(&image.src))
        .collect();
    pending
        .par_iter_mut()
        .map(|image| {
            let url = std::mem::take(&mut image.src);
            match loader.fetch(&url) {
                Ok(fetched) => {
                    let mime = fetched
                        .mime
                        .filter(|mime| !mime.is_empty())
                        .unwrap_or_else(|| sniff_mime(&fetched.bytes).to_string());
                    image.src = data_uri(&mime, &fetched.bytes);
                    ImageLoadOutcome { url, error: None }
                }
                Err(err) => ImageLoadOutcome {
                    url,
                    error: Some(err),
                },
            }
        })
        .collect()
}
