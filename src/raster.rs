use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use image::{
    ImageFormat, Rgba, RgbaImage,
    imageops::{self, FilterType},
};
use kurbo::{BezPath, Circle, Point, Rect, Shape as _};
use rand::Rng as _;

use crate::{
    engine::DrawingEngine,
    foundation::error::{RunesError, RunesResult},
};

const MAX_CANVAS_SIZE: u32 = 4096;
const PATH_TOLERANCE: f64 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Pink,
    Purple,
    Indigo,
    Blue,
    Green,
    Yellow,
    Orange,
    Brown,
    Black,
    White,
}

impl Color {
    /// Colors `random_color` chooses from.
    pub const PALETTE: [Color; 11] = [
        Color::Red,
        Color::Pink,
        Color::Purple,
        Color::Indigo,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Orange,
        Color::Brown,
        Color::Black,
        Color::White,
    ];

    pub fn rgb(self) -> [u8; 3] {
        match self {
            Self::Red => [0xF4, 0x43, 0x36],
            Self::Pink => [0xE9, 0x1E, 0x63],
            Self::Purple => [0xAA, 0x00, 0xFF],
            Self::Indigo => [0x3F, 0x51, 0xB5],
            Self::Blue => [0x21, 0x96, 0xF3],
            Self::Green => [0x4C, 0xAF, 0x50],
            Self::Yellow => [0xFF, 0xEB, 0x3B],
            Self::Orange => [0xFF, 0x98, 0x00],
            Self::Brown => [0x79, 0x55, 0x48],
            Self::Black => [0x00, 0x00, 0x00],
            Self::White => [0xFF, 0xFF, 0xFF],
        }
    }
}

/// Basic shapes a base canvas can start from, laid out in the unit square (y down).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Heart,
    Circle,
    Square,
    Sail,
    Blank,
}

impl Primitive {
    fn outline(self) -> Option<BezPath> {
        match self {
            Self::Heart => {
                let mut p = BezPath::new();
                p.move_to((0.5, 0.25));
                p.curve_to((0.5, 0.05), (0.05, 0.05), (0.05, 0.35));
                p.curve_to((0.05, 0.6), (0.35, 0.75), (0.5, 0.95));
                p.curve_to((0.65, 0.75), (0.95, 0.6), (0.95, 0.35));
                p.curve_to((0.95, 0.05), (0.5, 0.05), (0.5, 0.25));
                p.close_path();
                Some(p)
            }
            Self::Circle => Some(Circle::new((0.5, 0.5), 0.5).to_path(PATH_TOLERANCE)),
            Self::Square => Some(Rect::new(0.0, 0.0, 1.0, 1.0).to_path(PATH_TOLERANCE)),
            Self::Sail => {
                let mut p = BezPath::new();
                p.move_to((0.5, 0.0));
                p.line_to((1.0, 1.0));
                p.line_to((0.5, 1.0));
                p.close_path();
                Some(p)
            }
            Self::Blank => None,
        }
    }
}

/// Immutable straight-alpha RGBA8 canvas. Clones share pixels.
#[derive(Clone, Debug)]
pub struct RasterCanvas {
    image: Arc<RgbaImage>,
}

impl RasterCanvas {
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Pixels with non-zero alpha.
    pub fn covered_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[3] > 0).count()
    }

    /// Whether both handles share the same pixel storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl PartialEq for RasterCanvas {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.image.dimensions() == other.image.dimensions()
                && self.image.as_raw() == other.image.as_raw())
    }
}

/// CPU drawing engine over square [`RasterCanvas`]es.
#[derive(Clone, Debug)]
pub struct RasterEngine {
    size: u32,
    output: Option<PathBuf>,
}

impl RasterEngine {
    pub fn new(size: u32) -> RunesResult<Self> {
        if size == 0 || size > MAX_CANVAS_SIZE {
            return Err(RunesError::validation(format!(
                "canvas size must be in 1..={MAX_CANVAS_SIZE}"
            )));
        }
        Ok(Self { size, output: None })
    }

    /// Make [`DrawingEngine::show`] write a PNG to `path`.
    pub fn with_png_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn primitive(&self, shape: Primitive, color: Color) -> RasterCanvas {
        let [r, g, b] = color.rgb();
        let mut img = RgbaImage::new(self.size, self.size);
        if let Some(path) = shape.outline() {
            let scale = f64::from(self.size);
            for (x, y, px) in img.enumerate_pixels_mut() {
                let pt = Point::new(
                    (f64::from(x) + 0.5) / scale,
                    (f64::from(y) + 0.5) / scale,
                );
                if path.contains(pt) {
                    *px = Rgba([r, g, b, 255]);
                }
            }
        }
        RasterCanvas::from_image(img)
    }

    /// Repaint every covered pixel with `color`, keeping alpha.
    pub fn tint(&self, color: Color, canvas: &RasterCanvas) -> RasterCanvas {
        let [r, g, b] = color.rgb();
        let mut img = canvas.image().clone();
        for px in img.pixels_mut() {
            if px.0[3] > 0 {
                px.0 = [r, g, b, px.0[3]];
            }
        }
        RasterCanvas::from_image(img)
    }

    fn write_png(path: &Path, canvas: &RasterCanvas) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        canvas
            .image()
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

fn resized(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    imageops::resize(src, width, height, FilterType::Nearest)
}

impl DrawingEngine for RasterEngine {
    type Canvas = RasterCanvas;

    fn random_color(&self, canvas: &RasterCanvas) -> RasterCanvas {
        let idx = rand::thread_rng().gen_range(0..Color::PALETTE.len());
        self.tint(Color::PALETTE[idx], canvas)
    }

    fn stack_n(&self, count: u32, canvas: &RasterCanvas) -> RasterCanvas {
        if count <= 1 {
            return canvas.clone();
        }
        let (w, h) = canvas.image().dimensions();
        let mut out = RgbaImage::new(w, h);
        for i in 0..count {
            let y0 = (u64::from(i) * u64::from(h) / u64::from(count)) as u32;
            let y1 = (u64::from(i + 1) * u64::from(h) / u64::from(count)) as u32;
            if y1 <= y0 {
                continue;
            }
            let band = resized(canvas.image(), w, y1 - y0);
            imageops::replace(&mut out, &band, 0, i64::from(y0));
        }
        RasterCanvas::from_image(out)
    }

    fn beside_frac(&self, frac: f64, left: &RasterCanvas, right: &RasterCanvas) -> RasterCanvas {
        let frac = if frac.is_finite() {
            frac.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let (w, h) = left.image().dimensions();
        let split = ((frac * f64::from(w)).round() as u32).min(w);

        let mut out = RgbaImage::new(w, h);
        if split > 0 {
            imageops::replace(&mut out, &resized(left.image(), split, h), 0, 0);
        }
        if split < w {
            let part = resized(right.image(), w - split, h);
            imageops::replace(&mut out, &part, i64::from(split), 0);
        }
        RasterCanvas::from_image(out)
    }

    fn show(&self, canvas: &RasterCanvas) -> RunesResult<()> {
        match &self.output {
            Some(path) => {
                Self::write_png(path, canvas)?;
                tracing::info!(path = %path.display(), "wrote canvas");
            }
            None => {
                tracing::info!(
                    width = canvas.width(),
                    height = canvas.height(),
                    covered = canvas.covered_pixels(),
                    "canvas ready"
                );
            }
        }
        Ok(())
    }
}
