//! Texture set output
//!
//! Writes the generated maps as PNGs with the
//! `<prefix>_<kind>_<W>x<H>.png` naming layout, 8-bit throughout except
//! for an optional 16-bit height map, plus a 2x2 tiled diffuse preview
//! for visual seam inspection.

use crate::buffer;
use crate::types::{Error, MapKind, PipelineResult, Plane, Result, RgbPlanes};
use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use std::path::{Path, PathBuf};

/// Where and how the writer lays files down.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub directory: PathBuf,
    pub prefix: String,
    pub create_preview: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            prefix: "texture".to_string(),
            create_preview: false,
        }
    }
}

/// Write every present map; returns the written paths in canonical order.
pub fn write_texture_set(
    result: &PipelineResult,
    height_bit_depth: u32,
    options: &OutputOptions,
) -> Result<Vec<(MapKind, PathBuf)>> {
    std::fs::create_dir_all(&options.directory)?;
    let (rows, cols, _) = result.diffuse.dim();
    let (width, height) = (cols as u32, rows as u32);

    let mut written = Vec::new();

    let diffuse_path = map_path(options, MapKind::Diffuse, width, height);
    save_rgb(&result.diffuse, &diffuse_path)?;
    written.push((MapKind::Diffuse, diffuse_path));

    if let Some(normal) = &result.normal {
        let path = map_path(options, MapKind::Normal, width, height);
        save_rgb(normal, &path)?;
        written.push((MapKind::Normal, path));
    }
    if let Some(roughness) = &result.roughness {
        let path = map_path(options, MapKind::Roughness, width, height);
        save_gray8(roughness, &path)?;
        written.push((MapKind::Roughness, path));
    }
    if let Some(metallic) = &result.metallic {
        let path = map_path(options, MapKind::Metallic, width, height);
        save_gray8(metallic, &path)?;
        written.push((MapKind::Metallic, path));
    }
    if let Some(ao) = &result.ao {
        let path = map_path(options, MapKind::Ao, width, height);
        save_gray8(ao, &path)?;
        written.push((MapKind::Ao, path));
    }
    if let Some(height_map) = &result.height {
        let path = map_path(options, MapKind::Height, width, height);
        if height_bit_depth == 16 {
            save_gray16(height_map, &path)?;
        } else {
            save_gray8(height_map, &path)?;
        }
        written.push((MapKind::Height, path));
    }

    if options.create_preview {
        let path = options
            .directory
            .join(format!("{}_preview.png", options.prefix));
        save_preview(&result.diffuse, &path)?;
    }

    Ok(written)
}

fn map_path(options: &OutputOptions, kind: MapKind, width: u32, height: u32) -> PathBuf {
    options
        .directory
        .join(format!("{}_{}_{}x{}.png", options.prefix, kind, width, height))
}

fn save_rgb(rgb: &RgbPlanes, path: &Path) -> Result<()> {
    let img = buffer::f32_to_rgb8(rgb)?;
    img.save(path)?;
    Ok(())
}

fn save_gray8(plane: &Plane, path: &Path) -> Result<()> {
    let (rows, cols) = plane.dim();
    let quantized = buffer::quantize_u8(plane);
    let raw = if let Some(slice) = quantized.as_slice() {
        slice.to_vec()
    } else {
        quantized.iter().copied().collect()
    };
    let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(cols as u32, rows as u32, raw)
        .ok_or_else(|| Error::InvalidShape("grayscale buffer length mismatch".to_string()))?;
    DynamicImage::ImageLuma8(img).save(path)?;
    Ok(())
}

fn save_gray16(plane: &Plane, path: &Path) -> Result<()> {
    let (rows, cols) = plane.dim();
    let quantized = buffer::quantize_u16(plane);
    let raw = if let Some(slice) = quantized.as_slice() {
        slice.to_vec()
    } else {
        quantized.iter().copied().collect()
    };
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(cols as u32, rows as u32, raw)
        .ok_or_else(|| Error::InvalidShape("grayscale buffer length mismatch".to_string()))?;
    DynamicImage::ImageLuma16(img).save(path)?;
    Ok(())
}

/// 2x2 tiling of the diffuse: any residual seam shows as a cross
/// through the middle.
fn save_preview(diffuse: &RgbPlanes, path: &Path) -> Result<()> {
    let tile = buffer::f32_to_rgb8(diffuse)?;
    let (width, height) = tile.dimensions();
    let mut preview = ImageBuffer::<Rgb<u8>, Vec<u8>>::new(width * 2, height * 2);
    for y in 0..height * 2 {
        for x in 0..width * 2 {
            preview.put_pixel(x, y, *tile.get_pixel(x % width, y % height));
        }
    }
    DynamicImage::ImageRgb8(preview).save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PipelineStatus;
    use ndarray::{Array2, Array3};

    fn result_with_all_maps(size: usize) -> PipelineResult {
        PipelineResult {
            status: PipelineStatus::Complete,
            diffuse: Array3::from_elem((size, size, 3), 0.5f32),
            normal: Some(Array3::from_elem((size, size, 3), 0.5f32)),
            roughness: Some(Array2::from_elem((size, size), 0.8f32)),
            metallic: Some(Array2::zeros((size, size))),
            ao: Some(Array2::from_elem((size, size), 0.9f32)),
            height: Some(Array2::from_elem((size, size), 0.5f32)),
            tiling_delta: None,
            warnings: Vec::new(),
        }
    }

    fn temp_options(tag: &str) -> OutputOptions {
        OutputOptions {
            directory: std::env::temp_dir().join(format!("pbr_forge_output_test_{}", tag)),
            prefix: "mat".to_string(),
            create_preview: false,
        }
    }

    #[test]
    fn test_naming_layout() {
        let options = temp_options("naming");
        let result = result_with_all_maps(16);
        let written = write_texture_set(&result, 8, &options).unwrap();
        assert_eq!(written.len(), 6);
        let names: Vec<String> = written
            .iter()
            .map(|(_, p)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"mat_diffuse_16x16.png".to_string()));
        assert!(names.contains(&"mat_normal_16x16.png".to_string()));
        assert!(names.contains(&"mat_height_16x16.png".to_string()));
        for (_, path) in &written {
            assert!(path.exists());
        }
        std::fs::remove_dir_all(&options.directory).ok();
    }

    #[test]
    fn test_height_16_bit_depth() {
        let options = temp_options("depth16");
        let result = result_with_all_maps(16);
        let written = write_texture_set(&result, 16, &options).unwrap();
        let height_path = &written
            .iter()
            .find(|(kind, _)| *kind == MapKind::Height)
            .unwrap()
            .1;
        let decoded = image::open(height_path).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma16(_)));
        std::fs::remove_dir_all(&options.directory).ok();
    }

    #[test]
    fn test_preview_is_double_size() {
        let mut options = temp_options("preview");
        options.create_preview = true;
        let result = result_with_all_maps(16);
        write_texture_set(&result, 8, &options).unwrap();
        let preview = image::open(options.directory.join("mat_preview.png")).unwrap();
        assert_eq!(preview.width(), 32);
        assert_eq!(preview.height(), 32);
        std::fs::remove_dir_all(&options.directory).ok();
    }

    #[test]
    fn test_absent_maps_skipped() {
        let options = temp_options("partial");
        let mut result = result_with_all_maps(16);
        result.normal = None;
        result.ao = None;
        let written = write_texture_set(&result, 8, &options).unwrap();
        assert_eq!(written.len(), 4);
        assert!(!written.iter().any(|(kind, _)| *kind == MapKind::Normal));
        std::fs::remove_dir_all(&options.directory).ok();
    }
}
