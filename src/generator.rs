//! The generation facade
//!
//! One `Generator` owns the loaded resources, the effect pipeline, the
//! render cache and a worker pool. Callers hand it a request plus a
//! `GenerationContext` and get back an encoded image; every failure is
//! reported to the context's feedback sink exactly once, sanitized.
//!
//! Resources are optional per product. A product whose resource failed to
//! load at startup stays disabled: its requests fail fast with the same
//! message instead of panicking deep in a render.

use crate::atlas::{upscale, AtlasError, SpriteAtlas};
use crate::cache::{RenderCache, CACHE_CAPACITY};
use crate::effect::{
    EffectContext, EffectError, EffectPipeline, FrameSet, OverlayRequest,
};
use crate::gif::{encode, EncodeError, EncodedImage};
use crate::glint::GlintEngine;
use crate::markup::{self, MarkupError};
use crate::overlay::{OverlayColorMode, OverlayError, OverlayRegistry};
use crate::recipe::{self, RecipeError, RecipeItem};
use crate::request::{
    ItemSpriteRequest, PlayerHeadRequest, RecipeRequest, TooltipRequest,
};
use crate::skin::{render_head, SkinError, SkinSource};
use crate::tooltip::Tooltip;
use image::RgbaImage;
use regex::Regex;
use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error(transparent)]
    Effect(#[from] EffectError),
    #[error(transparent)]
    Atlas(#[from] AtlasError),
    #[error(transparent)]
    Recipe(#[from] RecipeError),
    #[error(transparent)]
    Skin(#[from] SkinError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The resource backing this product failed to load at startup.
    #[error("{0} are unavailable right now, try again later")]
    ResourceNotLoaded(&'static str),
    #[error("there is nothing to render")]
    EmptyInput,
    #[error("worker pool failed to start: {0}")]
    Pool(String),
}

impl GeneratorError {
    /// Whether the requester caused this, as opposed to the service being
    /// broken. Drives feedback phrasing and log level.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Markup(_) | Self::Recipe(_) | Self::EmptyInput => true,
            Self::Atlas(AtlasError::UnknownItem(_)) => true,
            Self::Skin(err) => matches!(
                err,
                SkinError::UnknownPlayer(_) | SkinError::UnrecognizedInput(_)
            ),
            Self::Effect(EffectError::Overlay(err)) => matches!(
                err,
                OverlayError::UnknownOverlay(_) | OverlayError::InvalidHexColor(_)
            ),
            _ => false,
        }
    }
}

/// A finished render: the frames plus their encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedObject {
    pub frames: FrameSet,
    pub encoded: EncodedImage,
}

/// Receives failure notices for one generation. Implementations forward to
/// wherever the requester is listening.
pub trait FeedbackSink: Send + Sync {
    fn send_message(&self, text: &str, is_user_error: bool);
}

/// Who asked and where their feedback goes.
#[derive(Clone)]
pub struct GenerationContext {
    pub requester: String,
    pub sink: Arc<dyn FeedbackSink>,
    /// Suppress feedback entirely. Errors still return and still log.
    pub silent: bool,
}

impl GenerationContext {
    pub fn new(requester: impl Into<String>, sink: Arc<dyn FeedbackSink>) -> Self {
        Self { requester: requester.into(), sink, silent: false }
    }
}

/// Everything the generator renders from. `None` marks a product whose
/// resource failed to load; its requests are refused, not attempted.
pub struct GeneratorResources {
    pub atlas: Option<Arc<SpriteAtlas>>,
    pub overlays: Arc<OverlayRegistry>,
    pub glint: Option<Arc<GlintEngine>>,
    pub skins: Arc<dyn SkinSource + Send + Sync>,
}

/// Strip anything a feedback channel could interpret: inline code fences,
/// mention sigils, url schemes.
pub fn sanitize_feedback(text: &str) -> String {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    let scheme = SCHEME
        .get_or_init(|| Regex::new(r"(?i)[a-z][a-z0-9+.-]*://").expect("scheme pattern is valid"));
    scheme.replace_all(text, "").replace(['`', '@'], "")
}

pub struct Generator {
    resources: GeneratorResources,
    pipeline: EffectPipeline,
    cache: RenderCache<GeneratedObject>,
    pool: rayon::ThreadPool,
    /// Stands in for the glint engine on non-enchanted renders when the
    /// real texture never loaded. The glint stage is gated off before it
    /// can sample this.
    glint_stub: GlintEngine,
}

/// Handle to a render running on the worker pool.
pub struct RenderTask<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> RenderTask<T> {
    /// Block until the render finishes.
    pub fn wait(self) -> T {
        self.rx.recv().expect("render worker dropped its result")
    }
}

pub type RenderResult = Result<Arc<GeneratedObject>, GeneratorError>;

impl Generator {
    pub fn new(resources: GeneratorResources) -> Result<Self, GeneratorError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("render-{i}"))
            .build()
            .map_err(|e| GeneratorError::Pool(e.to_string()))?;
        Ok(Self {
            resources,
            pipeline: EffectPipeline::standard(),
            cache: RenderCache::new(CACHE_CAPACITY),
            pool,
            glint_stub: GlintEngine::new(RgbaImage::new(1, 1)),
        })
    }

    pub fn build_tooltip(&self, request: &TooltipRequest, ctx: &GenerationContext) -> RenderResult {
        self.run(ctx, &request.fingerprint(), || self.render_tooltip(request))
    }

    pub fn build_item_sprite(
        &self,
        request: &ItemSpriteRequest,
        ctx: &GenerationContext,
    ) -> RenderResult {
        self.run(ctx, &request.fingerprint(), || self.render_item_sprite(request))
    }

    pub fn build_recipe_grid(
        &self,
        request: &RecipeRequest,
        ctx: &GenerationContext,
    ) -> RenderResult {
        self.run(ctx, &request.fingerprint(), || self.render_recipe_grid(request))
    }

    pub fn build_player_head(
        &self,
        request: &PlayerHeadRequest,
        ctx: &GenerationContext,
    ) -> RenderResult {
        self.run(ctx, &request.fingerprint(), || self.render_player_head(request))
    }

    pub fn spawn_tooltip(
        self: &Arc<Self>,
        request: TooltipRequest,
        ctx: GenerationContext,
    ) -> RenderTask<RenderResult> {
        let this = Arc::clone(self);
        self.spawn(move || this.build_tooltip(&request, &ctx))
    }

    pub fn spawn_item_sprite(
        self: &Arc<Self>,
        request: ItemSpriteRequest,
        ctx: GenerationContext,
    ) -> RenderTask<RenderResult> {
        let this = Arc::clone(self);
        self.spawn(move || this.build_item_sprite(&request, &ctx))
    }

    pub fn spawn_recipe_grid(
        self: &Arc<Self>,
        request: RecipeRequest,
        ctx: GenerationContext,
    ) -> RenderTask<RenderResult> {
        let this = Arc::clone(self);
        self.spawn(move || this.build_recipe_grid(&request, &ctx))
    }

    pub fn spawn_player_head(
        self: &Arc<Self>,
        request: PlayerHeadRequest,
        ctx: GenerationContext,
    ) -> RenderTask<RenderResult> {
        let this = Arc::clone(self);
        self.spawn(move || this.build_player_head(&request, &ctx))
    }

    fn spawn<T: Send + 'static>(
        &self,
        job: impl FnOnce() -> T + Send + 'static,
    ) -> RenderTask<T> {
        let (tx, rx) = mpsc::channel();
        self.pool.spawn(move || {
            let _ = tx.send(job());
        });
        RenderTask { rx }
    }

    /// Cache wrapper shared by every product. Failures skip the cache and
    /// notify the requester once.
    fn run(
        &self,
        ctx: &GenerationContext,
        key: &str,
        render: impl FnOnce() -> Result<GeneratedObject, GeneratorError>,
    ) -> RenderResult {
        let result = self.cache.get_or_render(key, render);
        if let Err(err) = &result {
            self.report(ctx, err);
        }
        result
    }

    fn report(&self, ctx: &GenerationContext, err: &GeneratorError) {
        if err.is_user_error() {
            log::debug!("request from {} rejected: {err}", ctx.requester);
        } else {
            log::error!("render for {} failed: {err}", ctx.requester);
        }
        if !ctx.silent {
            ctx.sink.send_message(&sanitize_feedback(&err.to_string()), err.is_user_error());
        }
    }

    fn render_tooltip(&self, request: &TooltipRequest) -> Result<GeneratedObject, GeneratorError> {
        let lines = markup::parse(&request.text, request.settings.max_line_length)?;
        if lines.iter().all(|l| l.is_empty()) {
            return Err(GeneratorError::EmptyInput);
        }
        let frames = Tooltip::new(lines, request.settings).render();
        let encoded = encode(&frames)?;
        Ok(GeneratedObject { frames, encoded })
    }

    fn render_item_sprite(
        &self,
        request: &ItemSpriteRequest,
    ) -> Result<GeneratedObject, GeneratorError> {
        let atlas = self.require_atlas("item sprites")?;
        let glint = match (&self.resources.glint, request.enchanted) {
            (Some(engine), _) => engine.as_ref(),
            (None, true) => return Err(GeneratorError::ResourceNotLoaded("enchantment glints")),
            (None, false) => &self.glint_stub,
        };

        let sprite = upscale(&atlas.sprite(&request.item)?, request.scale.max(1));
        let overlay = self
            .resources
            .overlays
            .get(&request.item)
            .ok()
            .map(|_| OverlayRequest {
                names: vec![request.item.clone()],
                color_option: request.color_option.clone(),
                mode: OverlayColorMode::Base,
            });

        let mut ctx = EffectContext {
            frames: FrameSet::Single(sprite),
            overlay,
            enchanted: request.enchanted,
            hovered: request.hovered,
            durability: request.durability,
            registry: &self.resources.overlays,
            glint,
        };
        self.pipeline.run(&mut ctx)?;

        let encoded = encode(&ctx.frames)?;
        Ok(GeneratedObject { frames: ctx.frames, encoded })
    }

    fn render_recipe_grid(
        &self,
        request: &RecipeRequest,
    ) -> Result<GeneratedObject, GeneratorError> {
        let atlas = self.require_atlas("recipe images")?;
        let items = recipe::parse_recipe(&request.recipe)?;
        let grid = recipe::render_grid_titled(
            &items,
            request.scale.max(1),
            request.title.as_deref(),
            |item| self.resolve_recipe_sprite(atlas, item),
        )?;
        let frames = FrameSet::Single(grid);
        let encoded = encode(&frames)?;
        Ok(GeneratedObject { frames, encoded })
    }

    fn render_player_head(
        &self,
        request: &PlayerHeadRequest,
    ) -> Result<GeneratedObject, GeneratorError> {
        let texture_id = self.resources.skins.resolve_texture_id(&request.texture)?;
        let skin = self.resources.skins.fetch_skin(&texture_id)?;
        let frames = FrameSet::Single(render_head(&skin, request.scale.max(1)));
        let encoded = encode(&frames)?;
        Ok(GeneratedObject { frames, encoded })
    }

    /// Ingredient sprites come from the atlas, except heads carrying a
    /// skull texture in their data field.
    fn resolve_recipe_sprite(
        &self,
        atlas: &SpriteAtlas,
        item: &RecipeItem,
    ) -> Result<RgbaImage, GeneratorError> {
        if let Some(data) = &item.data {
            if item.material.eq_ignore_ascii_case("player_head")
                || item.material.eq_ignore_ascii_case("skull")
            {
                let texture_id = self.resources.skins.resolve_texture_id(data)?;
                let skin = self.resources.skins.fetch_skin(&texture_id)?;
                return Ok(render_head(&skin, 2));
            }
        }
        Ok(atlas.sprite(&item.material)?)
    }

    fn require_atlas(&self, product: &'static str) -> Result<&SpriteAtlas, GeneratorError> {
        self.resources
            .atlas
            .as_deref()
            .ok_or(GeneratorError::ResourceNotLoaded(product))
    }
}
