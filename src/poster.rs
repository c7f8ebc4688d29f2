use image::imageops;
use image::{DynamicImage, Rgba, RgbaImage};
use md5::{Digest, Md5};
use qrcodegen::{QrCode, QrCodeEcc};
use std::fs;
use std::path::PathBuf;

use crate::config::{AppConfig, Point, Rect};

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A poster persisted under the qrcode directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Poster {
    pub filename: String,
    pub path: PathBuf,
}

/// `poster-<md5(url)>[-<article id>].jpg`
pub fn poster_filename(url: &str, article_id: Option<i64>) -> String {
    let digest = hex::encode(Md5::digest(url.as_bytes()));
    match article_id {
        Some(id) => format!("poster-{}-{}.jpg", digest, id),
        None => format!("poster-{}.jpg", digest),
    }
}

/// Render the configured QR code onto the configured background and save it.
/// A poster that already exists under the generated name is reused.
/// Any failure removes whatever was written.
pub fn generate(config: &AppConfig, article_id: Option<i64>) -> Result<Poster, String> {
    let settings = &config.poster;
    let filename = poster_filename(&settings.qr_url, article_id);
    let dir = config.qrcode_dir();
    let path = dir.join(&filename);

    if path.is_file() {
        return Ok(Poster { filename, path });
    }

    fs::create_dir_all(&dir).map_err(|e| e.to_string())?;

    let qr = render_qr(&settings.qr_url, settings.qr_size)?;
    let background = image::open(config.poster_background())
        .map_err(|e| format!("background {}: {}", config.poster_background().display(), e))?;
    let canvas = compose(&background, &qr, settings.rect, settings.anchor)?;

    // JPEG carries no alpha channel
    if let Err(e) = DynamicImage::ImageRgba8(canvas).to_rgb8().save(&path) {
        let _ = fs::remove_file(&path);
        return Err(e.to_string());
    }

    log::info!("Generated poster {}", filename);
    Ok(Poster { filename, path })
}

/// Encode `text` at medium error correction (automatic version and mask)
/// and scale the modules to a `size` x `size` bitmap without quiet zone.
pub fn render_qr(text: &str, size: u32) -> Result<RgbaImage, String> {
    let qr = QrCode::encode_text(text, QrCodeEcc::Medium).map_err(|e| e.to_string())?;
    let modules = qr.size() as u32;
    if size < modules {
        return Err(format!("QR size {} is smaller than its {} modules", size, modules));
    }

    Ok(RgbaImage::from_fn(size, size, |x, y| {
        let mx = (x * modules / size) as i32;
        let my = (y * modules / size) as i32;
        if qr.get_module(mx, my) {
            DARK
        } else {
            LIGHT
        }
    }))
}

/// Cut `rect` out of the background as the canvas and draw the QR bitmap
/// with its top-left corner at `anchor`.
pub fn compose(background: &DynamicImage, qr: &RgbaImage, rect: Rect, anchor: Point) -> Result<RgbaImage, String> {
    if rect.width() == 0 || rect.height() == 0 {
        return Err(format!("empty poster rectangle {:?}", rect));
    }

    let mut canvas = RgbaImage::from_pixel(rect.width(), rect.height(), LIGHT);
    let region = imageops::crop_imm(background, rect.x0, rect.y0, rect.width(), rect.height()).to_image();
    imageops::overlay(&mut canvas, &region, 0, 0);
    imageops::overlay(&mut canvas, qr, anchor.x as i64, anchor.y as i64);
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn config_with_background(dir: &std::path::Path) -> AppConfig {
        let cfg = AppConfig {
            runtime_root_path: format!("{}/", dir.display()),
            ..AppConfig::default()
        };
        fs::create_dir_all(cfg.qrcode_dir()).unwrap();
        RgbImage::from_pixel(600, 800, Rgb([200, 30, 30]))
            .save(cfg.poster_background())
            .unwrap();
        cfg
    }

    fn luma(p: Rgba<u8>) -> u32 {
        (p[0] as u32 + p[1] as u32 + p[2] as u32) / 3
    }

    #[test]
    fn filename_is_stable_per_url_and_article() {
        let a = poster_filename("https://example.com", None);
        assert_eq!(a, poster_filename("https://example.com", None));
        assert!(a.starts_with("poster-") && a.ends_with(".jpg"));
        assert_eq!(a.len(), "poster-".len() + 32 + ".jpg".len());
        assert_ne!(a, poster_filename("https://example.org", None));
        assert!(poster_filename("https://example.com", Some(7)).ends_with("-7.jpg"));
    }

    #[test]
    fn qr_bitmap_has_requested_size_and_finder_corner() {
        let qr = render_qr("https://example.com", 300).unwrap();
        assert_eq!(qr.dimensions(), (300, 300));
        // finder pattern: top-left module is dark
        assert_eq!(*qr.get_pixel(0, 0), DARK);
    }

    #[test]
    fn qr_too_small_is_an_error() {
        assert!(render_qr("https://example.com", 5).is_err());
    }

    #[test]
    fn compose_places_qr_at_anchor() {
        let bg = DynamicImage::ImageRgb8(RgbImage::from_pixel(600, 800, Rgb([200, 30, 30])));
        let qr = render_qr("x", 100).unwrap();
        let rect = Rect { x0: 0, y0: 0, x1: 550, y1: 700 };
        let canvas = compose(&bg, &qr, rect, Point { x: 125, y: 298 }).unwrap();

        assert_eq!(canvas.dimensions(), (550, 700));
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([200, 30, 30, 255]));
        assert_eq!(*canvas.get_pixel(125, 298), DARK);
    }

    #[test]
    fn compose_rejects_empty_rect() {
        let bg = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let qr = render_qr("x", 50).unwrap();
        let rect = Rect { x0: 5, y0: 5, x1: 5, y1: 9 };
        assert!(compose(&bg, &qr, rect, Point { x: 0, y: 0 }).is_err());
    }

    #[test]
    fn generate_writes_poster_once() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config_with_background(tmp.path());

        let poster = generate(&cfg, None).unwrap();
        assert!(poster.path.is_file());
        assert_eq!(poster.path, cfg.qrcode_dir().join(&poster.filename));

        let img = image::open(&poster.path).unwrap();
        assert_eq!(img.dimensions(), (550, 700));
        // jpeg is lossy, compare brightness instead of exact pixels;
        // (153, 326) sits inside the centre of the top-left finder pattern
        assert!(luma(img.get_pixel(153, 326)) < 80);
        assert!(luma(img.get_pixel(10, 10)) > 60);

        let modified = fs::metadata(&poster.path).unwrap().modified().unwrap();
        let again = generate(&cfg, None).unwrap();
        assert_eq!(again, poster);
        assert_eq!(fs::metadata(&again.path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn generate_without_background_leaves_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig {
            runtime_root_path: format!("{}/", tmp.path().display()),
            ..AppConfig::default()
        };

        assert!(generate(&cfg, Some(3)).is_err());
        let name = poster_filename(&cfg.poster.qr_url, Some(3));
        assert!(!cfg.qrcode_dir().join(name).exists());
    }
}
