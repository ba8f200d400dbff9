//! End-to-end tests driving the public API the way a bot front-end would.

use image::{Rgba, RgbaImage};
use itemforge::atlas::{SpriteAtlas, SpriteRect};
use itemforge::generator::{
    FeedbackSink, GenerationContext, Generator, GeneratorError, GeneratorResources,
};
use itemforge::glint::{self, GlintEngine};
use itemforge::markup::{self, MarkupError};
use itemforge::overlay::OverlayRegistry;
use itemforge::request::{ItemSpriteRequest, RecipeRequest, TooltipRequest};
use itemforge::skin::{SkinError, SkinSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct CollectingSink {
    messages: Mutex<Vec<String>>,
}

impl FeedbackSink for CollectingSink {
    fn send_message(&self, text: &str, _is_user_error: bool) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

struct FixedSkins;

impl SkinSource for FixedSkins {
    fn resolve_texture_id(&self, input: &str) -> Result<String, SkinError> {
        Ok(input.to_string())
    }

    fn fetch_skin(&self, _texture_id: &str) -> Result<RgbaImage, SkinError> {
        Ok(RgbaImage::from_pixel(64, 64, Rgba([80, 60, 40, 255])))
    }
}

const BASE_COLOR: Rgba<u8> = Rgba([200, 50, 50, 255]);

fn generator() -> Generator {
    let atlas = SpriteAtlas::from_parts(
        RgbaImage::from_pixel(16, 16, BASE_COLOR),
        HashMap::from([
            ("diamond".to_string(), SpriteRect { x: 0, y: 0, w: 16, h: 16 }),
            ("emerald".to_string(), SpriteRect { x: 0, y: 0, w: 16, h: 16 }),
        ]),
    );
    Generator::new(GeneratorResources {
        atlas: Some(Arc::new(atlas)),
        overlays: Arc::new(OverlayRegistry::new()),
        glint: Some(Arc::new(GlintEngine::new(RgbaImage::from_pixel(
            8,
            8,
            Rgba([255, 255, 255, 255]),
        )))),
        skins: Arc::new(FixedSkins),
    })
    .unwrap()
}

fn ctx() -> (GenerationContext, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink { messages: Mutex::new(Vec::new()) });
    (GenerationContext::new("integration", sink.clone()), sink)
}

#[test]
fn plain_text_parses_to_one_run_with_normalized_apostrophes() {
    let lines = markup::parse("Don't stop", 38).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].runs.len(), 1);
    assert_eq!(lines[0].runs[0].text, "Don’t stop");
}

#[test]
fn reparsing_plain_output_is_stable() {
    let first = markup::parse("Hello world", 38).unwrap();
    let text: String = first[0].runs.iter().map(|r| r.text.as_str()).collect();
    let second = markup::parse(&text, 38).unwrap();
    assert_eq!(first, second);
}

#[test]
fn wrapped_lines_never_exceed_the_clamped_maximum() {
    let text = "a long description that keeps going with many short words in it \
                plus %%GREEN%%a color tag%%GRAY%% and more trailing words";
    for max in [1usize, 10, 38, 500] {
        let clamped = markup::clamp_line_length(max);
        let lines = markup::parse(text, max).unwrap();
        assert!(!lines.is_empty());
        for line in &lines {
            assert!(line.visible_len() <= clamped, "line over {clamped} at max {max}");
        }
    }
}

#[test]
fn unknown_tag_fails_the_whole_parse() {
    assert!(matches!(
        markup::parse("%%NOT_A_REAL_TAG%%", 38),
        Err(MarkupError::UnknownTag { .. })
    ));
}

#[test]
fn unknown_tag_surfaces_through_the_generator() {
    let generator = generator();
    let (ctx, sink) = ctx();
    let err = generator
        .build_tooltip(&TooltipRequest::new("%%NOT_A_REAL_TAG%%"), &ctx)
        .unwrap_err();
    assert!(err.is_user_error());
    assert_eq!(sink.messages.lock().unwrap().len(), 1);
}

#[test]
fn concurrent_identical_requests_render_once() {
    let generator = Arc::new(generator());
    let (ctx, _) = ctx();
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            generator.spawn_tooltip(TooltipRequest::new("%%AQUA%%Shared render"), ctx.clone())
        })
        .collect();
    let results: Vec<_> = tasks.into_iter().map(|t| t.wait().unwrap()).collect();
    for result in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], result));
    }
}

#[test]
fn glint_frame_count_matches_duration_and_alpha_is_preserved() {
    let engine = GlintEngine::new(RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])));
    let mut base = RgbaImage::from_pixel(4, 4, Rgba([100, 100, 100, 200]));
    base.put_pixel(0, 0, Rgba([0, 0, 0, 0]));

    let (frames, delay_ms) = engine.animate(&base);
    assert_eq!(frames.len(), glint::frame_count());
    assert_eq!(frames.len(), (6000u32).div_ceil(delay_ms) as usize);
    for frame in &frames {
        assert_eq!(frame.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        for (x, y, px) in frame.enumerate_pixels() {
            if (x, y) != (0, 0) {
                assert_eq!(px.0[3], 200);
            }
        }
    }
}

#[test]
fn enchanted_sprite_comes_back_as_a_gif() {
    let generator = generator();
    let (ctx, _) = ctx();
    let mut request = ItemSpriteRequest::new("diamond");
    request.enchanted = true;
    let out = generator.build_item_sprite(&request, &ctx).unwrap();
    assert!(out.frames.is_animated());
    assert_eq!(out.encoded.extension, "gif");
    assert_eq!(out.frames.frame_count(), glint::frame_count());
}

#[test]
fn durability_bar_boundaries() {
    let generator = generator();
    let (ctx, _) = ctx();

    // full durability suppresses the bar entirely
    let mut request = ItemSpriteRequest::new("diamond");
    request.durability = Some(100);
    let out = generator.build_item_sprite(&request, &ctx).unwrap();
    assert_eq!(out.frames.first().get_pixel(2, 13), &BASE_COLOR);

    // half durability paints pure yellow over a black track
    request.durability = Some(50);
    let out = generator.build_item_sprite(&request, &ctx).unwrap();
    let img = out.frames.first();
    assert_eq!(img.get_pixel(2, 13), &Rgba([255, 255, 0, 255]));
    assert_eq!(img.get_pixel(2, 14), &Rgba([0, 0, 0, 255]));

    // zero durability draws an empty black track with no colored fill
    request.durability = Some(0);
    let out = generator.build_item_sprite(&request, &ctx).unwrap();
    let img = out.frames.first();
    assert_eq!(img.get_pixel(2, 13), &Rgba([0, 0, 0, 255]));
    assert_eq!(img.get_pixel(2, 14), &Rgba([0, 0, 0, 255]));
}

#[test]
fn recipe_grammar_accepts_valid_and_rejects_out_of_range() {
    let generator = generator();
    let (ctx, _) = ctx();

    let ok = generator
        .build_recipe_grid(&RecipeRequest::new("1,5,diamond%%2,64,emerald"), &ctx)
        .unwrap();
    assert_eq!(ok.encoded.extension, "png");

    let err = generator
        .build_recipe_grid(&RecipeRequest::new("1,65,diamond"), &ctx)
        .unwrap_err();
    assert!(err.is_user_error());

    let err = generator
        .build_recipe_grid(&RecipeRequest::new("3,1,diamond%%3,1,emerald"), &ctx)
        .unwrap_err();
    assert!(matches!(
        err,
        GeneratorError::Recipe(itemforge::recipe::RecipeError::DuplicateSlot(3))
    ));
}

#[test]
fn animated_tooltip_forces_an_opaque_background() {
    let generator = generator();
    let (ctx, _) = ctx();
    let mut request = TooltipRequest::new("&kZZ");
    request.settings = request.settings.with_alpha(40);
    let out = generator.build_tooltip(&request, &ctx).unwrap();
    assert!(out.frames.is_animated());
    // sample inside the panel, away from the border ring
    let frame = out.frames.first();
    let (w, h) = frame.dimensions();
    assert_eq!(frame.get_pixel(w / 2, h / 2).0[3], 255);
}
