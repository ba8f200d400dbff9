//! itemforge - Library for rendering Minecraft-style item images
//!
//! This library provides functionality to:
//! - Parse `%%TAG%%` and `&`-code markup into styled, wrapped lines
//! - Render tooltip panels, item sprites, recipe grids and player heads
//! - Apply overlay recoloring, enchantment glint, hover and durability effects
//! - Cache finished renders with single-flight deduplication

pub mod atlas;
pub mod cache;
pub mod chat;
pub mod cli;
pub mod effect;
pub mod font;
pub mod generator;
pub mod gif;
pub mod glint;
pub mod markup;
pub mod overlay;
pub mod recipe;
pub mod request;
pub mod settings;
pub mod skin;
pub mod tags;
pub mod tooltip;
