//! Binary PLY decoding for Gaussian splat point clouds.
//!
//! The header is scanned line by line to build an ordered property schema,
//! then the binary body is walked in a single pass using that schema. The
//! byte offset of the first vertex record is taken directly from the scan
//! cursor after consuming `end_header\n`, so it is exact by construction.

use crate::common::{clamp01, sigmoid, HEADER_SCAN_LIMIT, SH_C0, VERTEX_CAP};
use crate::error::SplatError;
use crate::structures::{PlyHeader, PropertyType, SplatCloud, VertexProperty};

/// Decode a binary little-endian splat PLY buffer into flat attribute buffers.
///
/// Truncated vertex data is not an error: decoding keeps every record that is
/// fully present and drops the partial tail. Header problems and properties
/// with no known byte width abort the whole decode with no partial result.
pub fn decode(raw_data: &[u8]) -> Result<SplatCloud, SplatError> {
    let header = scan_header(raw_data)?;
    decode_vertices(raw_data, &header)
}

#[inline]
fn next_line<'b>(buffer: &'b [u8], offset: &mut usize) -> Option<&'b [u8]> {
    if *offset >= buffer.len() {
        return None;
    }
    let start = *offset;

    match memchr::memchr(b'\n', &buffer[*offset..]) {
        Some(pos) => {
            *offset = start + pos + 1;
            Some(&buffer[start..start + pos])
        }
        None => {
            *offset = buffer.len();
            Some(&buffer[start..])
        }
    }
}

#[inline]
fn trim_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

/// Scan the textual header and return the schema plus the exact body offset.
pub fn scan_header(raw_data: &[u8]) -> Result<PlyHeader, SplatError> {
    let prefix = &raw_data[..raw_data.len().min(HEADER_SCAN_LIMIT)];
    let mut offset = 0;

    let mut schema = Vec::new();
    let mut num_vertices = 0usize;
    let mut format_seen = false;
    let mut vertex_element_seen = false;
    let mut in_vertex_element = false;

    loop {
        let line = match next_line(prefix, &mut offset) {
            Some(l) => trim_cr(l),
            None => return Err(SplatError::MalformedHeader),
        };
        let line = std::str::from_utf8(line).map_err(|_| SplatError::MalformedHeader)?;

        if line == "end_header" {
            // A final unterminated "end_header" leaves no room for body bytes
            // anyway, so requiring the newline costs nothing and keeps the
            // offset well defined.
            if offset >= prefix.len() && prefix[offset - 1] != b'\n' {
                return Err(SplatError::MalformedHeader);
            }
            break;
        }

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("format") => {
                let encoding = tokens.next();
                let version = tokens.next();
                if encoding != Some("binary_little_endian") || version != Some("1.0") {
                    return Err(SplatError::UnsupportedFormat);
                }
                format_seen = true;
            }
            Some("element") => {
                if tokens.next() == Some("vertex") && !vertex_element_seen {
                    num_vertices = tokens
                        .next()
                        .and_then(|n| n.parse().ok())
                        .ok_or(SplatError::MalformedHeader)?;
                    vertex_element_seen = true;
                    in_vertex_element = true;
                } else {
                    // Any later element closes the vertex block; its
                    // properties do not contribute to the record stride.
                    in_vertex_element = false;
                }
            }
            Some("property") if in_vertex_element => {
                let ty = tokens.next().ok_or(SplatError::MalformedHeader)?;
                let name = tokens.next().ok_or(SplatError::MalformedHeader)?;
                schema.push(VertexProperty {
                    name: name.to_string(),
                    ty: PropertyType::parse(ty),
                });
            }
            // "ply", "comment", properties of other elements, and anything
            // unrecognized only contribute their byte length to the offset.
            _ => {}
        }
    }

    if !format_seen {
        return Err(SplatError::UnsupportedFormat);
    }

    Ok(PlyHeader {
        data_offset: offset,
        num_vertices,
        schema,
    })
}

/// Destination of one decoded property value. Only `float32` properties are
/// routed to an attribute; every other type just advances the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    PosX,
    PosY,
    PosZ,
    Scale(usize),
    Rot(usize),
    Opacity,
    ColorDc(usize),
    Ignored,
}

fn field_for_name(name: &str) -> Field {
    match name {
        "x" => Field::PosX,
        "y" => Field::PosY,
        "z" => Field::PosZ,
        "scale_0" => Field::Scale(0),
        "scale_1" => Field::Scale(1),
        "scale_2" => Field::Scale(2),
        "rot_0" => Field::Rot(0),
        "rot_1" => Field::Rot(1),
        "rot_2" => Field::Rot(2),
        "rot_3" => Field::Rot(3),
        "opacity" => Field::Opacity,
        "f_dc_0" => Field::ColorDc(0),
        "f_dc_1" => Field::ColorDc(1),
        "f_dc_2" => Field::ColorDc(2),
        _ => Field::Ignored,
    }
}

#[inline]
fn read_scalar(raw: &[u8], ty: PropertyType) -> f32 {
    match ty {
        PropertyType::Float32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        PropertyType::UChar => raw[0] as f32,
        PropertyType::Int32 => i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f32,
        PropertyType::Double => f64::from_le_bytes([
            raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
        ]) as f32,
        // Rejected before decoding starts.
        PropertyType::Unknown => 0.0,
    }
}

fn decode_vertices(raw_data: &[u8], header: &PlyHeader) -> Result<SplatCloud, SplatError> {
    // Resolve the schema into a decode plan once; the per-vertex loop is a
    // generic walk over this table.
    let mut plan = Vec::with_capacity(header.schema.len());
    let mut stride = 0usize;
    for prop in &header.schema {
        let width = prop
            .ty
            .width()
            .ok_or_else(|| SplatError::UnknownPropertyType(prop.name.clone()))?;
        let field = if prop.ty == PropertyType::Float32 {
            field_for_name(&prop.name)
        } else {
            Field::Ignored
        };
        plan.push((prop.ty, width, field));
        stride += width;
    }

    let declared = header.num_vertices.min(VERTEX_CAP);
    let body_len = raw_data.len().saturating_sub(header.data_offset);
    let num_points = if stride == 0 {
        declared
    } else {
        declared.min(body_len / stride)
    };
    if num_points < declared {
        log::warn!(
            "vertex data truncated: {} of {} declared records present",
            num_points,
            declared
        );
    }

    let mut cloud = SplatCloud {
        num_points,
        positions: vec![0.0; num_points * 3],
        scales: vec![0.1; num_points * 3],
        rotations: vec![0.0; num_points * 4],
        opacities: vec![1.0; num_points],
        colors: vec![0.5; num_points * 3],
    };
    for quat in cloud.rotations.chunks_exact_mut(4) {
        quat[0] = 1.0; // identity, w first
    }

    let mut cursor = header.data_offset;
    for i in 0..num_points {
        for &(ty, width, field) in &plan {
            let value = read_scalar(&raw_data[cursor..cursor + width], ty);
            cursor += width;
            match field {
                Field::PosX => cloud.positions[i * 3] = value,
                Field::PosY => cloud.positions[i * 3 + 1] = value,
                Field::PosZ => cloud.positions[i * 3 + 2] = value,
                Field::Scale(k) => cloud.scales[i * 3 + k] = value.exp(),
                Field::Rot(k) => cloud.rotations[i * 4 + k] = value,
                Field::Opacity => cloud.opacities[i] = sigmoid(value),
                Field::ColorDc(k) => cloud.colors[i * 3 + k] = 0.5 + SH_C0 * value,
                Field::Ignored => {}
            }
        }
        for channel in &mut cloud.colors[i * 3..i * 3 + 3] {
            *channel = clamp01(*channel);
        }
    }

    log::info!("decoded {} splats ({} byte stride)", num_points, stride);
    Ok(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(lines: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for line in lines {
            out.extend_from_slice(line.as_bytes());
            out.push(b'\n');
        }
        out
    }

    fn splat_header(num_vertices: usize) -> Vec<u8> {
        header(&[
            "ply",
            "format binary_little_endian 1.0",
            &format!("element vertex {}", num_vertices),
            "property float x",
            "property float y",
            "property float z",
            "property float scale_0",
            "property float scale_1",
            "property float scale_2",
            "property float rot_0",
            "property float rot_1",
            "property float rot_2",
            "property float rot_3",
            "property float opacity",
            "property float f_dc_0",
            "property float f_dc_1",
            "property float f_dc_2",
            "end_header",
        ])
    }

    fn push_f32s(buf: &mut Vec<u8>, values: &[f32]) {
        for v in values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }

    #[test]
    fn decodes_empty_cloud_without_vertex_element() {
        let data = header(&["ply", "format binary_little_endian 1.0", "end_header"]);
        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.num_points, 0);
        assert!(cloud.positions.is_empty());
    }

    #[test]
    fn decodes_zero_vertex_cloud() {
        let data = splat_header(0);
        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.num_points, 0);
    }

    #[test]
    fn rejects_ascii_format() {
        let data = header(&[
            "ply",
            "format ascii 1.0",
            "element vertex 1",
            "property float x",
            "end_header",
        ]);
        assert!(matches!(decode(&data), Err(SplatError::UnsupportedFormat)));
    }

    #[test]
    fn rejects_big_endian_format() {
        let data = header(&[
            "ply",
            "format binary_big_endian 1.0",
            "element vertex 1",
            "end_header",
        ]);
        assert!(matches!(decode(&data), Err(SplatError::UnsupportedFormat)));
    }

    #[test]
    fn rejects_missing_format_line() {
        let data = header(&["ply", "element vertex 0", "end_header"]);
        assert!(matches!(decode(&data), Err(SplatError::UnsupportedFormat)));
    }

    #[test]
    fn rejects_missing_end_header() {
        let data = header(&["ply", "format binary_little_endian 1.0", "element vertex 1"]);
        assert!(matches!(decode(&data), Err(SplatError::MalformedHeader)));
    }

    #[test]
    fn rejects_unknown_property_type() {
        let mut data = header(&[
            "ply",
            "format binary_little_endian 1.0",
            "element vertex 1",
            "property float x",
            "property short flags",
            "end_header",
        ]);
        push_f32s(&mut data, &[1.0, 2.0]);
        assert!(matches!(
            decode(&data),
            Err(SplatError::UnknownPropertyType(name)) if name == "flags"
        ));
    }

    #[test]
    fn applies_all_name_keyed_transforms() {
        let mut data = splat_header(1);
        #[rustfmt::skip]
        push_f32s(&mut data, &[
            // x, y, z
            1.5, -2.0, 3.25,
            // scale_0..2 (stored as log-scale)
            -1.0, 0.0, 1.0,
            // rot_0..3 (w, x, y, z)
            0.9, 0.1, 0.2, 0.3,
            // opacity (logit)
            2.0,
            // f_dc_0..2
            0.5, -4.0, 4.0,
        ]);

        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.num_points, 1);
        assert_eq!(cloud.positions, vec![1.5, -2.0, 3.25]);

        assert!((cloud.scales[0] - (-1.0f32).exp()).abs() < 1e-6);
        assert!((cloud.scales[1] - 1.0).abs() < 1e-6);
        assert!((cloud.scales[2] - 1.0f32.exp()).abs() < 1e-6);

        assert_eq!(cloud.rotations, vec![0.9, 0.1, 0.2, 0.3]);

        let expected_opacity = 1.0 / (1.0 + (-2.0f32).exp());
        assert!((cloud.opacities[0] - expected_opacity).abs() < 1e-6);

        assert!((cloud.colors[0] - (0.5 + SH_C0 * 0.5)).abs() < 1e-6);
        assert_eq!(cloud.colors[1], 0.0); // clamped from below
        assert_eq!(cloud.colors[2], 1.0); // clamped from above
    }

    #[test]
    fn minimal_vertex_uses_defaults_for_missing_attributes() {
        let mut data = header(&[
            "ply",
            "format binary_little_endian 1.0",
            "element vertex 1",
            "property float x",
            "property float y",
            "property float z",
            "property float opacity",
            "property float f_dc_0",
            "end_header",
        ]);
        push_f32s(&mut data, &[1.0, 2.0, 3.0, 0.0, 0.0]);

        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(cloud.opacities, vec![0.5]); // logistic(0)
        assert_eq!(cloud.colors, vec![0.5, 0.5, 0.5]);
        assert_eq!(cloud.scales, vec![0.1, 0.1, 0.1]);
        assert_eq!(cloud.rotations, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn truncated_body_drops_partial_tail_record() {
        let mut data = header(&[
            "ply",
            "format binary_little_endian 1.0",
            "element vertex 3",
            "property float x",
            "property float y",
            "end_header",
        ]);
        // Two full records plus half of a third.
        push_f32s(&mut data, &[1.0, 2.0, 3.0, 4.0, 5.0]);

        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.num_points, 2);
        assert_eq!(cloud.positions, vec![1.0, 2.0, 0.0, 3.0, 4.0, 0.0]);
    }

    #[test]
    fn declared_count_is_capped() {
        let mut data = header(&[
            "ply",
            "format binary_little_endian 1.0",
            &format!("element vertex {}", VERTEX_CAP + 5),
            "property float x",
            "end_header",
        ]);
        data.resize(data.len() + (VERTEX_CAP + 5) * 4, 0);

        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.num_points, VERTEX_CAP);
    }

    #[test]
    fn non_float_properties_consume_their_declared_width() {
        let mut data = header(&[
            "ply",
            "format binary_little_endian 1.0",
            "element vertex 2",
            "property uchar red",
            "property int label",
            "property double weight",
            "property float x",
            "end_header",
        ]);
        for x in [7.5f32, -7.5] {
            data.push(0xAB);
            data.extend_from_slice(&123i32.to_le_bytes());
            data.extend_from_slice(&1.25f64.to_le_bytes());
            data.extend_from_slice(&x.to_le_bytes());
        }

        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.num_points, 2);
        assert_eq!(cloud.positions[0], 7.5);
        assert_eq!(cloud.positions[3], -7.5);
    }

    #[test]
    fn uchar_opacity_is_skipped_not_transformed() {
        // Transforms are keyed on name but only applied to float32 values.
        let mut data = header(&[
            "ply",
            "format binary_little_endian 1.0",
            "element vertex 1",
            "property uchar opacity",
            "property float x",
            "end_header",
        ]);
        data.push(200);
        push_f32s(&mut data, &[4.0]);

        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.opacities, vec![1.0]); // default kept
        assert_eq!(cloud.positions[0], 4.0);
    }

    #[test]
    fn properties_after_second_element_are_excluded_from_schema() {
        let mut data = header(&[
            "ply",
            "format binary_little_endian 1.0",
            "element vertex 1",
            "property float x",
            "element face 4",
            "property uchar count",
            "end_header",
        ]);
        push_f32s(&mut data, &[9.0]);

        let ply = scan_header(&data).unwrap();
        assert_eq!(ply.schema.len(), 1);
        assert_eq!(ply.schema[0].name, "x");

        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.positions, vec![9.0]);
    }

    #[test]
    fn body_offset_is_exact_with_irregular_header_lines() {
        let mut data = header(&[
            "ply",
            "comment w",
            "format binary_little_endian 1.0",
            "comment an oddly sized line to shift every subsequent byte offset",
            "element vertex 1",
            "property float x",
            "comment x",
            "end_header",
        ]);
        let expected_offset = data.len();
        push_f32s(&mut data, &[42.0]);

        let ply = scan_header(&data).unwrap();
        assert_eq!(ply.data_offset, expected_offset);

        let cloud = decode(&data).unwrap();
        assert_eq!(cloud.positions, vec![42.0]);
    }

    #[test]
    fn crlf_line_endings_keep_the_offset_exact() {
        let mut data = Vec::new();
        for line in [
            "ply",
            "format binary_little_endian 1.0",
            "element vertex 1",
            "property float x",
            "end_header",
        ] {
            data.extend_from_slice(line.as_bytes());
            data.extend_from_slice(b"\r\n");
        }
        let expected_offset = data.len();
        push_f32s(&mut data, &[5.0]);

        let ply = scan_header(&data).unwrap();
        assert_eq!(ply.data_offset, expected_offset);
        assert_eq!(decode(&data).unwrap().positions, vec![5.0]);
    }
}
