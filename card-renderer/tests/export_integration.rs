//! Integration tests for card rasterization (card-renderer).

use card_core::{
    CardSnapshot, CardStyle, CustomBackground, DailyLogData, GestureController, ImageOrigin,
};
use card_renderer::{
    AssetStatus, CardScene, PreparedAsset, PreparedAssets, RasterProfile, RenderError, Rasterizer,
    SvgRasterizer,
};
use chrono::NaiveDate;

fn snapshot(style: CardStyle) -> CardSnapshot {
    let date = NaiveDate::from_ymd_opt(2024, 11, 12).expect("date");
    CardSnapshot {
        data: DailyLogData::sample(date),
        style,
        transform: GestureController::default().transform(),
    }
}

fn tiny_png_data_uri() -> String {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 40, 40, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).expect("encode");
    card_renderer::image::to_data_uri("image/png", &buf.into_inner())
}

fn scene_with_background(origin: ImageOrigin) -> CardScene {
    let mut style = CardStyle::default();
    style.custom_background = Some(CustomBackground::from_url("https://cdn.example/bg.png"));
    let assets = PreparedAssets {
        background: AssetStatus::Ready(PreparedAsset {
            href: tiny_png_data_uri(),
            origin,
            width: 4,
            height: 4,
        }),
    };
    CardScene::build(&snapshot(style), &assets)
}

#[test]
fn test_png_export_at_pixel_ratio() {
    let scene = CardScene::build(&snapshot(CardStyle::default()), &PreparedAssets::none());
    let png = SvgRasterizer::new()
        .rasterize(&scene, RasterProfile::strict(), 2.0)
        .expect("png");

    assert_eq!(&png[0..4], &[137, 80, 78, 71]);
    let decoded = image::load_from_memory(&png).expect("decode");
    assert_eq!((decoded.width(), decoded.height()), (750, 1280));
}

#[test]
fn test_preset_background_fills_corners() {
    let scene = CardScene::build(&snapshot(CardStyle::default()), &PreparedAssets::none());
    let pixmap = SvgRasterizer::new()
        .render_pixmap(&scene, RasterProfile::strict(), 1.0)
        .expect("pixmap");

    // Bottom-left corner is far from the glow: plain dark preset.
    let pixel = pixmap.pixel(0, 639).expect("pixel");
    assert_eq!(pixel.alpha(), 255);
    assert!(pixel.red() < 20 && pixel.green() < 20 && pixel.blue() < 20);
}

#[test]
fn test_strict_profile_rejects_cross_origin_image() {
    let scene =
        scene_with_background(ImageOrigin::CrossOrigin("https://cdn.example".to_string()));
    let rasterizer = SvgRasterizer::new();

    let err = rasterizer
        .rasterize(&scene, RasterProfile::strict(), 1.0)
        .expect_err("tainted");
    assert!(matches!(err, RenderError::Tainted { ref origin } if origin == "https://cdn.example"));

    let png = rasterizer
        .rasterize(&scene, RasterProfile::permissive(), 1.0)
        .expect("permissive");
    assert_eq!(&png[0..4], &[137, 80, 78, 71]);
}

#[test]
fn test_same_origin_image_passes_strict_profile() {
    let scene = scene_with_background(ImageOrigin::SameOrigin);
    let pixmap = SvgRasterizer::new()
        .render_pixmap(&scene, RasterProfile::strict(), 1.0)
        .expect("pixmap");

    // Red image under a 70% black overlay.
    let pixel = pixmap.pixel(0, 639).expect("pixel");
    assert!(pixel.red() > pixel.green());
    assert!(pixel.red() < 200);
}

#[test]
fn test_light_background_export() {
    let mut style = CardStyle::default();
    assert!(style.cycle_background());
    let scene = CardScene::build(&snapshot(style), &PreparedAssets::none());
    let pixmap = SvgRasterizer::new()
        .render_pixmap(&scene, RasterProfile::strict(), 1.0)
        .expect("pixmap");

    let pixel = pixmap.pixel(0, 639).expect("pixel");
    assert!(pixel.red() > 240 && pixel.green() > 240 && pixel.blue() > 240);
}

#[test]
fn test_invalid_pixel_ratio_uses_default() {
    let scene = CardScene::build(&snapshot(CardStyle::default()), &PreparedAssets::none());
    let pixmap = SvgRasterizer::new()
        .render_pixmap(&scene, RasterProfile::strict(), f32::NAN)
        .expect("pixmap");
    assert_eq!((pixmap.width(), pixmap.height()), (750, 1280));
}
