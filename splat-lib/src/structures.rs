/// Scalar type of a single vertex property, as declared in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Float32,
    UChar,
    Int32,
    Double,
    Unknown,
}

impl PropertyType {
    pub fn parse(token: &str) -> Self {
        match token {
            "float" | "float32" => PropertyType::Float32,
            "uchar" | "uint8" => PropertyType::UChar,
            "int" | "int32" => PropertyType::Int32,
            "double" => PropertyType::Double,
            _ => PropertyType::Unknown,
        }
    }

    /// Byte width of one value, or `None` for types we cannot decode.
    pub fn width(self) -> Option<usize> {
        match self {
            PropertyType::Float32 => Some(4),
            PropertyType::UChar => Some(1),
            PropertyType::Int32 => Some(4),
            PropertyType::Double => Some(8),
            PropertyType::Unknown => None,
        }
    }
}

/// One `property <type> <name>` declaration, in file order.
#[derive(Debug, Clone)]
pub struct VertexProperty {
    pub name: String,
    pub ty: PropertyType,
}

/// Result of the header scan: where the binary body starts and how to walk it.
#[derive(Debug, Clone)]
pub struct PlyHeader {
    /// Exact byte offset of the first vertex record.
    pub data_offset: usize,
    /// Declared vertex count, before the cap is applied.
    pub num_vertices: usize,
    /// Properties of the first `element vertex` block, in declaration order.
    pub schema: Vec<VertexProperty>,
}

/// Decoded splat attributes as parallel flat buffers, one slot per vertex.
///
/// `positions` and `scales` hold 3 components per point, `rotations` holds
/// the quaternion as w,x,y,z, `colors` holds linear RGB in [0, 1].
#[derive(Debug, Default, Clone)]
pub struct SplatCloud {
    pub num_points: usize,
    pub positions: Vec<f32>,
    pub scales: Vec<f32>,
    pub rotations: Vec<f32>,
    pub opacities: Vec<f32>,
    pub colors: Vec<f32>,
}
