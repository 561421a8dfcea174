//! Scripted "Will you be my Valentine?" experience.
//!
//! `story` and `timeline` hold the scene logic and run on any target;
//! `components` renders it with Yew.

pub mod components;
pub mod config;
pub mod error;
pub mod story;
pub mod timeline;
