//! In-memory images and PNG I/O

use crate::tile::{Palette, Rgb, TILE_SIZE, Tile};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Image made of 2-bit palette indices, the natural output of tile composition
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IndexedImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl IndexedImage {
    /// New image filled with palette index 0
    pub fn new(width: usize, height: usize) -> IndexedImage {
        IndexedImage {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Draw `tile` in tile cell (`col`, `row`). Cells outside of the image are ignored.
    pub fn blit_tile(&mut self, col: usize, row: usize, tile: &Tile) {
        let x0 = col * TILE_SIZE;
        let y0 = row * TILE_SIZE;

        if x0 + TILE_SIZE > self.width || y0 + TILE_SIZE > self.height {
            return;
        }

        for (ty, line) in tile.rows().iter().enumerate() {
            let start = (y0 + ty) * self.width + x0;

            self.pixels[start..start + TILE_SIZE].copy_from_slice(line);
        }
    }

    pub fn to_rgb(&self, palette: &Palette) -> RgbImage {
        RgbImage {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&p| palette.color(p)).collect(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RgbImage {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize, fill: Rgb) -> RgbImage {
        RgbImage {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, c: Rgb) {
        self.pixels[y * self.width + x] = c;
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Copy `src` with its top-left corner at (`x`, `y`), clipped to our bounds
    pub fn paste(&mut self, x: usize, y: usize, src: &RgbImage) {
        for sy in 0..src.height {
            let dy = y + sy;

            if dy >= self.height {
                break;
            }

            for sx in 0..src.width {
                let dx = x + sx;

                if dx >= self.width {
                    break;
                }

                self.set_pixel(dx, dy, src.pixel(sx, sy));
            }
        }
    }

    /// Integer upscale, every pixel becomes a `factor` x `factor` block
    pub fn scale(&self, factor: usize) -> RgbImage {
        if factor <= 1 {
            return self.clone();
        }

        self.resize_nearest(self.width * factor, self.height * factor)
    }

    /// Nearest neighbour resampling, sampling the source at the centre of each destination pixel
    pub fn resize_nearest(&self, width: usize, height: usize) -> RgbImage {
        let mut out = RgbImage::new(width, height, [0; 3]);

        if self.width == 0 || self.height == 0 {
            return out;
        }

        let sample = |dst: usize, dst_len: usize, src_len: usize| -> usize {
            (((2 * dst + 1) * src_len) / (2 * dst_len)).min(src_len - 1)
        };

        for y in 0..height {
            let sy = sample(y, height, self.height);

            for x in 0..width {
                let sx = sample(x, width, self.width);

                out.set_pixel(x, y, self.pixel(sx, sy));
            }
        }

        out
    }

    /// Copy of the `width` x `height` area at (`x`, `y`). The area must be within the image.
    pub fn region(&self, x: usize, y: usize, width: usize, height: usize) -> RgbImage {
        let mut out = RgbImage::new(width, height, [0; 3]);

        for ry in 0..height {
            for rx in 0..width {
                out.set_pixel(rx, ry, self.pixel(x + rx, y + ry));
            }
        }

        out
    }

    pub fn dump_png<W: Write>(&self, w: W) -> Result<()> {
        let mut encoder = png::Encoder::new(w, self.width as u32, self.height as u32);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);

        let data: Vec<u8> = self.pixels.iter().flatten().copied().collect();

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
        writer.finish()?;

        Ok(())
    }

    pub fn write_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let f = File::create(path).with_context(|| format!("Can't create `{}`", path.display()))?;

        self.dump_png(BufWriter::new(f))
            .with_context(|| format!("Can't encode `{}`", path.display()))
    }

    /// Decode any 8 or 16 bit PNG to RGB, dropping alpha
    pub fn load_png<R: Read>(r: R) -> Result<RgbImage> {
        let mut decoder = png::Decoder::new(r);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

        let mut reader = decoder.read_info()?;

        let mut buf = vec![0u8; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buf)?;
        let buf = &buf[..frame.buffer_size()];

        let width = frame.width as usize;
        let height = frame.height as usize;

        let pixels: Vec<Rgb> = match frame.color_type {
            png::ColorType::Rgb => buf.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
            png::ColorType::Rgba => buf.chunks_exact(4).map(|c| [c[0], c[1], c[2]]).collect(),
            png::ColorType::Grayscale => buf.iter().map(|&v| [v, v, v]).collect(),
            png::ColorType::GrayscaleAlpha => buf.chunks_exact(2).map(|c| [c[0]; 3]).collect(),
            ct => bail!("Unsupported PNG colour type {:?}", ct),
        };

        if pixels.len() != width * height {
            bail!(
                "PNG frame holds {} pixels, expected {}x{}",
                pixels.len(),
                width,
                height
            );
        }

        Ok(RgbImage {
            width,
            height,
            pixels,
        })
    }

    pub fn read_png<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        let path = path.as_ref();

        let f = File::open(path).with_context(|| format!("Can't open `{}`", path.display()))?;

        RgbImage::load_png(BufReader::new(f))
            .with_context(|| format!("Can't decode `{}`", path.display()))
    }
}

/// Grid of equally sized cells separated by a margin
#[derive(Copy, Clone, Debug)]
pub struct Atlas {
    pub cols: usize,
    pub rows: usize,
    pub cell_width: usize,
    pub cell_height: usize,
    pub margin: usize,
    pub background: Rgb,
}

impl Atlas {
    /// Atlas of square cells with just enough rows to hold `count` of them
    pub fn for_count(count: usize, cols: usize, cell: usize, margin: usize, background: Rgb) -> Atlas {
        Atlas {
            cols,
            rows: count.div_ceil(cols.max(1)),
            cell_width: cell,
            cell_height: cell,
            margin,
            background,
        }
    }

    pub fn width(&self) -> usize {
        self.cols * (self.cell_width + self.margin) + self.margin
    }

    pub fn height(&self) -> usize {
        self.rows * (self.cell_height + self.margin) + self.margin
    }

    /// Top-left pixel of cell `index`, filled left to right then top to bottom
    pub fn cell_origin(&self, index: usize) -> (usize, usize) {
        let col = index % self.cols;
        let row = index / self.cols;

        (
            self.margin + col * (self.cell_width + self.margin),
            self.margin + row * (self.cell_height + self.margin),
        )
    }

    /// Lay out `cells` in order. Cells past the last row are dropped.
    pub fn render<'a, I>(&self, cells: I) -> RgbImage
    where
        I: IntoIterator<Item = &'a RgbImage>,
    {
        let mut out = RgbImage::new(self.width(), self.height(), self.background);

        for (i, cell) in cells.into_iter().enumerate() {
            if i >= self.cols * self.rows {
                warn!("Atlas is full, dropping {} cell(s)", i);
                break;
            }

            let (x, y) = self.cell_origin(i);

            out.paste(x, y, cell);
        }

        out
    }
}

#[test]
fn test_indexed_blit() {
    let mut data = [0u8; 16];
    data[0] = 0xff;

    let tile = Tile::decode(&data);

    let mut img = IndexedImage::new(16, 8);

    img.blit_tile(1, 0, &tile);
    // Out of bounds, ignored
    img.blit_tile(2, 0, &tile);
    img.blit_tile(0, 1, &tile);

    assert_eq!(img.pixel(7, 0), 0);
    assert_eq!(img.pixel(8, 0), 1);
    assert_eq!(img.pixel(15, 0), 1);
    assert_eq!(img.pixel(8, 1), 0);

    let rgb = img.to_rgb(&crate::tile::GRAYSCALE);

    assert_eq!(rgb.pixel(0, 0), [255, 255, 255]);
    assert_eq!(rgb.pixel(8, 0), [170, 170, 170]);
}

#[test]
fn test_scale_and_resize() {
    let mut img = RgbImage::new(2, 2, [0; 3]);
    img.set_pixel(1, 0, [1, 1, 1]);
    img.set_pixel(0, 1, [2, 2, 2]);
    img.set_pixel(1, 1, [3, 3, 3]);

    let big = img.scale(3);

    assert_eq!((big.width(), big.height()), (6, 6));
    assert_eq!(big.pixel(2, 2), [0; 3]);
    assert_eq!(big.pixel(3, 0), [1; 3]);
    assert_eq!(big.pixel(0, 3), [2; 3]);
    assert_eq!(big.pixel(5, 5), [3; 3]);

    // Downscaling samples the pixel centres
    let back = big.resize_nearest(2, 2);

    assert_eq!(back, img);

    let small = RgbImage::new(96, 96, [9; 3]).resize_nearest(48, 48);

    assert_eq!((small.width(), small.height()), (48, 48));
}

#[test]
fn test_paste_region() {
    let mut img = RgbImage::new(4, 4, [0; 3]);
    let src = RgbImage::new(3, 3, [7; 3]);

    img.paste(2, 2, &src);

    assert_eq!(img.pixel(1, 1), [0; 3]);
    assert_eq!(img.pixel(2, 2), [7; 3]);
    assert_eq!(img.pixel(3, 3), [7; 3]);

    let r = img.region(1, 1, 2, 2);

    assert_eq!(r.pixels(), &[[0; 3], [0; 3], [0; 3], [7; 3]]);
}

#[test]
fn test_png_round_trip() {
    let mut img = RgbImage::new(5, 3, [10, 20, 30]);
    img.set_pixel(4, 2, [255, 0, 128]);

    let mut buf = Vec::new();
    img.dump_png(&mut buf).unwrap();

    assert_eq!(&buf[1..4], b"PNG");

    let back = RgbImage::load_png(buf.as_slice()).unwrap();

    assert_eq!(back, img);
}

#[test]
fn test_atlas_geometry() {
    // Portrait atlas: 81 48x48 portraits at scale 2
    let atlas = Atlas::for_count(81, 9, 96, 2, [128; 3]);

    assert_eq!(atlas.rows, 9);
    assert_eq!(atlas.width(), 9 * 98 + 2);
    assert_eq!(atlas.cell_origin(0), (2, 2));
    assert_eq!(atlas.cell_origin(10), (2 + 98, 2 + 98));

    // Mob atlas: 174 portraits, 15 per row
    let atlas = Atlas::for_count(174, 15, 96, 2, [128; 3]);

    assert_eq!(atlas.rows, 12);

    let cells = vec![RgbImage::new(96, 96, [1; 3]); 3];
    let img = Atlas::for_count(3, 2, 96, 2, [128; 3]).render(&cells);

    assert_eq!((img.width(), img.height()), (198, 198));
    assert_eq!(img.pixel(0, 0), [128; 3]);
    assert_eq!(img.pixel(2, 2), [1; 3]);
    assert_eq!(img.pixel(100, 100), [128; 3]);
}
