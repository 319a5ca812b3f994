use std::fmt;

#[derive(Debug)]
pub enum SvgCanvasError {
    InvalidConfiguration(String),
    Image(String),
    Fetch(String),
    Io(std::io::Error),
}

impl fmt::Display for SvgCanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgCanvasError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            SvgCanvasError::Image(message) => write!(f, "image error: {}", message),
            SvgCanvasError::Fetch(message) => write!(f, "fetch error: {}", message),
            SvgCanvasError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for SvgCanvasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SvgCanvasError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SvgCanvasError {
    fn from(value: std::io::Error) -> Self {
        SvgCanvasError::Io(value)
    }
}

impl From<image::ImageError> for SvgCanvasError {
    fn from(value: image::ImageError) -> Self {
        SvgCanvasError::Image(value.to_string())
    }
}
