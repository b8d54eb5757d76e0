use std::{fmt, io};

#[derive(Debug)]
pub enum SplatError {
    UnsupportedFormat,
    MalformedHeader,
    UnknownPropertyType(String),
    ShaderCompile(String),
    NoAdapter,
    DeviceRequest(String),
    SurfaceCreation(String),
    IoError(io::Error),
}

impl fmt::Display for SplatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplatError::UnsupportedFormat => {
                write!(
                    f,
                    "Unsupported PLY format (only binary_little_endian 1.0 is supported)."
                )
            }
            SplatError::MalformedHeader => {
                write!(f, "Malformed PLY header: no 'end_header' line found.")
            }
            SplatError::UnknownPropertyType(name) => {
                write!(
                    f,
                    "Vertex property '{}' has a type with no known byte width.",
                    name
                )
            }
            SplatError::ShaderCompile(e) => {
                write!(f, "Failed to compile the splat shader pipeline: {}", e)
            }
            SplatError::NoAdapter => {
                write!(f, "No compatible GPU adapter found.")
            }
            SplatError::DeviceRequest(e) => {
                write!(f, "Failed to acquire a GPU device: {}", e)
            }
            SplatError::SurfaceCreation(e) => {
                write!(f, "Failed to create the render surface: {}", e)
            }
            SplatError::IoError(e) => {
                write!(f, "An I/O error occurred: {}", e)
            }
        }
    }
}

impl std::error::Error for SplatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SplatError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SplatError {
    fn from(e: io::Error) -> Self {
        SplatError::IoError(e)
    }
}
